use std::fmt::Display;

use packed_struct::{prelude::*, PackedStructInfo};
use thiserror::Error;

/// Smallest packet that can be decoded. This is the size of the packet
/// header; finger records follow it.
pub const MIN_PACKET_SIZE: usize = 46;
/// Size of a single finger record in an SPI trackpad packet
pub const FINGER_SIZE: usize = 30;
/// Maximum number of contacts a Precision Touchpad report can carry
pub const MAX_CONTACTS: usize = 5;
/// Report ID of the multi-touch input report
pub const REPORTID_MULTITOUCH: u8 = 0x05;
/// Size of the packed multi-touch input report
pub const PTP_REPORT_SIZE: usize = 30;

/// Possible errors decoding an SPI trackpad packet
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("input too small: {0} < {MIN_PACKET_SIZE}")]
    ShortPacket(usize),
    #[error("failed to unpack packet: {0}")]
    Malformed(#[from] PackingError),
}

// Header of a trackpad packet as delivered by the SPI transport.
// 02 01 00 00 00 00 00 01 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
// 1e 00 00 00 00 00 01 01 00 00 00 00 00 00 00 00 00 00 00 00 00 00
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "46")]
pub struct PacketHeader {
    #[packed_field(bytes = "0")]
    pub packet_type: u8,
    #[packed_field(bytes = "1")]
    pub click_occurred: u8,
    #[packed_field(bytes = "2..=6")]
    pub _reserved0: [u8; 5],
    #[packed_field(bytes = "7")]
    pub is_finger: u8,
    #[packed_field(bytes = "8..=23")]
    pub _reserved1: [u8; 16],
    #[packed_field(bytes = "24")]
    pub finger_data_length: u8,
    #[packed_field(bytes = "25..=29")]
    pub _reserved2: [u8; 5],
    #[packed_field(bytes = "30")]
    pub finger_count: u8,
    #[packed_field(bytes = "31")]
    pub click_occurred2: u8,
    #[packed_field(bytes = "32")]
    pub state1: u8,
    #[packed_field(bytes = "33")]
    pub state2: u8,
    #[packed_field(bytes = "34")]
    pub state3: u8,
    #[packed_field(bytes = "35")]
    pub _padding: u8,
    #[packed_field(bytes = "36..=45")]
    pub _reserved3: [u8; 10],
}

impl Default for PacketHeader {
    fn default() -> Self {
        Self {
            packet_type: 0x02,
            click_occurred: 0,
            _reserved0: [0; 5],
            is_finger: 0,
            _reserved1: [0; 16],
            finger_data_length: 0,
            _reserved2: [0; 5],
            finger_count: 0,
            click_occurred2: 0,
            state1: 0,
            state2: 0,
            state3: 0,
            _padding: 0,
            _reserved3: [0; 10],
        }
    }
}

/// Per-finger record. All values are signed little endian.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "30")]
pub struct FingerData {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub original_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub original_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub horizontal_accel: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub vertical_accel: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "12..=13", endian = "lsb")]
    pub tool_major: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "14..=15", endian = "lsb")]
    pub tool_minor: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "16..=17", endian = "lsb")]
    pub orientation: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "18..=19", endian = "lsb")]
    pub touch_major: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "20..=21", endian = "lsb")]
    pub touch_minor: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "22..=25")]
    pub _reserved0: [u8; 4],
    #[packed_field(bytes = "26..=27", endian = "lsb")]
    pub pressure: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "28..=29")]
    pub _reserved1: [u8; 2],
}

impl Default for FingerData {
    fn default() -> Self {
        Self {
            original_x: Integer::from_primitive(0),
            original_y: Integer::from_primitive(0),
            x: Integer::from_primitive(0),
            y: Integer::from_primitive(0),
            horizontal_accel: Integer::from_primitive(0),
            vertical_accel: Integer::from_primitive(0),
            tool_major: Integer::from_primitive(0),
            tool_minor: Integer::from_primitive(0),
            orientation: Integer::from_primitive(0),
            touch_major: Integer::from_primitive(0),
            touch_minor: Integer::from_primitive(0),
            _reserved0: [0; 4],
            pressure: Integer::from_primitive(0),
            _reserved1: [0; 2],
        }
    }
}

impl FingerData {
    pub fn get_x(&self) -> i16 {
        self.x.to_primitive()
    }

    pub fn set_x(&mut self, value: i16) {
        self.x = Integer::from_primitive(value);
    }

    pub fn get_y(&self) -> i16 {
        self.y.to_primitive()
    }

    pub fn set_y(&mut self, value: i16) {
        self.y = Integer::from_primitive(value);
    }

    pub fn get_original_x(&self) -> i16 {
        self.original_x.to_primitive()
    }

    pub fn get_original_y(&self) -> i16 {
        self.original_y.to_primitive()
    }

    pub fn set_original(&mut self, x: i16, y: i16) {
        self.original_x = Integer::from_primitive(x);
        self.original_y = Integer::from_primitive(y);
    }

    pub fn get_pressure(&self) -> i16 {
        self.pressure.to_primitive()
    }

    pub fn set_pressure(&mut self, value: i16) {
        self.pressure = Integer::from_primitive(value);
    }

    pub fn get_touch_major(&self) -> i16 {
        self.touch_major.to_primitive()
    }

    pub fn get_touch_minor(&self) -> i16 {
        self.touch_minor.to_primitive()
    }

    pub fn set_touch(&mut self, major: i16, minor: i16) {
        self.touch_major = Integer::from_primitive(major);
        self.touch_minor = Integer::from_primitive(minor);
    }
}

/// A decoded SPI trackpad packet. Only finger records that were fully
/// delivered by the transport are present in `fingers`, so it may hold fewer
/// entries than `header.finger_count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackpadPacket {
    pub header: PacketHeader,
    pub fingers: Vec<FingerData>,
}

impl TrackpadPacket {
    /// Number of fingers the hardware claims are on the pad
    pub fn finger_count(&self) -> usize {
        self.header.finger_count as usize
    }

    pub fn is_clicked(&self) -> bool {
        self.header.click_occurred != 0
    }

    /// Appends a finger record and updates the header counters to match
    pub fn push_finger(&mut self, finger: FingerData) {
        self.fingers.push(finger);
        self.header.finger_count = self.fingers.len().min(u8::MAX as usize) as u8;
        self.header.finger_data_length =
            (self.fingers.len() * FINGER_SIZE).min(u8::MAX as usize) as u8;
        self.header.is_finger = 1;
    }

    /// Unpacks the first `length` bytes of the given buffer. Any access past
    /// `length` is refused; a length larger than the buffer is clamped to it.
    pub fn unpack(src: &[u8], length: usize) -> Result<Self, ReportError> {
        let length = length.min(src.len());
        if length < MIN_PACKET_SIZE {
            return Err(ReportError::ShortPacket(length));
        }
        let src = &src[..length];

        let header_size_bytes = PacketHeader::packed_bits() / 8;
        let buffer = src[..header_size_bytes]
            .try_into()
            .map_err(|_err| PackingError::BufferTooSmall)?;
        let header = PacketHeader::unpack(buffer)?;

        // Only decode the records that actually fit in the delivered bytes
        let available = (length - header_size_bytes) / FINGER_SIZE;
        let num_fingers = (header.finger_count as usize).min(available);
        if num_fingers < header.finger_count as usize {
            log::warn!(
                "Packet reports {} fingers but only {num_fingers} records fit in {length} bytes",
                header.finger_count
            );
        }

        let mut fingers = Vec::with_capacity(num_fingers);
        let mut byte_start = header_size_bytes;
        for _ in 0..num_fingers {
            let byte_end = byte_start + FINGER_SIZE;
            let buffer = src[byte_start..byte_end]
                .try_into()
                .map_err(|_err| PackingError::BufferTooSmall)?;
            fingers.push(FingerData::unpack(buffer)?);
            byte_start = byte_end;
        }

        Ok(Self { header, fingers })
    }

    /// Packs the packet into the wire layout
    pub fn pack_to_vec(&self) -> Result<Vec<u8>, PackingError> {
        let mut data = Vec::with_capacity(MIN_PACKET_SIZE + self.fingers.len() * FINGER_SIZE);
        data.extend_from_slice(&self.header.pack()?);
        for finger in self.fingers.iter() {
            data.extend_from_slice(&finger.pack()?);
        }

        Ok(data)
    }
}

// Contact bits are laid out LSB first: confidence, tip switch, 3-bit contact id
// 03 64 00 64 00
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "5")]
pub struct PtpContact {
    #[packed_field(bits = "0..=2")]
    pub _padding: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "3..=5")]
    pub contact_id: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "6")]
    pub tip_switch: bool,
    #[packed_field(bits = "7")]
    pub confidence: bool,
    #[packed_field(bytes = "1..=2", endian = "lsb")]
    pub x: Integer<u16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "3..=4", endian = "lsb")]
    pub y: Integer<u16, packed_bits::Bits<16>>,
}

impl Default for PtpContact {
    fn default() -> Self {
        Self {
            _padding: Integer::from_primitive(0),
            contact_id: Integer::from_primitive(0),
            tip_switch: false,
            confidence: false,
            x: Integer::from_primitive(0),
            y: Integer::from_primitive(0),
        }
    }
}

impl PtpContact {
    pub fn get_contact_id(&self) -> u8 {
        self.contact_id.to_primitive()
    }

    pub fn set_contact_id(&mut self, value: u8) {
        self.contact_id = Integer::from_primitive(value & 0x07);
    }

    pub fn get_x(&self) -> u16 {
        self.x.to_primitive()
    }

    pub fn set_x(&mut self, value: u16) {
        self.x = Integer::from_primitive(value);
    }

    pub fn get_y(&self) -> u16 {
        self.y.to_primitive()
    }

    pub fn set_y(&mut self, value: u16) {
        self.y = Integer::from_primitive(value);
    }
}

/// Precision Touchpad multi-touch input report
// 05 03 64 00 64 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 0a 00 01 00
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "30")]
pub struct PtpReport {
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    #[packed_field(element_size_bytes = "5")]
    pub contacts: [PtpContact; 5],
    #[packed_field(bytes = "26..=27", endian = "lsb")]
    pub scan_time: Integer<u16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "28")]
    pub contact_count: u8,
    #[packed_field(bytes = "29")]
    pub is_button_clicked: u8,
}

impl Default for PtpReport {
    fn default() -> Self {
        Self {
            report_id: REPORTID_MULTITOUCH,
            contacts: [PtpContact::default(); MAX_CONTACTS],
            scan_time: Integer::from_primitive(0),
            contact_count: 0,
            is_button_clicked: 0,
        }
    }
}

impl PtpReport {
    pub fn get_scan_time(&self) -> u16 {
        self.scan_time.to_primitive()
    }

    pub fn set_scan_time(&mut self, value: u16) {
        self.scan_time = Integer::from_primitive(value);
    }

    pub fn is_clicked(&self) -> bool {
        self.is_button_clicked != 0
    }

    /// Contacts that are part of this report
    pub fn active_contacts(&self) -> &[PtpContact] {
        let count = (self.contact_count as usize).min(MAX_CONTACTS);
        &self.contacts[..count]
    }
}

/// Single line summary of a report, used when printing replayed captures
pub struct ReportSummary<'a>(pub &'a PtpReport);

impl Display for ReportSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let report = self.0;
        write!(
            f,
            "contacts={} clicked={} scan_time={}",
            report.contact_count,
            report.is_clicked(),
            report.get_scan_time()
        )?;
        for contact in report.active_contacts() {
            write!(
                f,
                " [{}: x={} y={} tip={} conf={}]",
                contact.get_contact_id(),
                contact.get_x(),
                contact.get_y(),
                contact.tip_switch,
                contact.confidence
            )?;
        }
        Ok(())
    }
}
