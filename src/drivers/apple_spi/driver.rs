use serde::{Deserialize, Serialize};

use super::{
    hid_report::{PtpReport, ReportError, TrackpadPacket, MAX_CONTACTS, REPORTID_MULTITOUCH},
    session::SessionState,
};

/// Divisor converting performance counter ticks into report scan time units
pub const TICKS_PER_UNIT: u64 = 100;
/// Largest scan time value a report will carry
pub const SCAN_TIME_MAX: u64 = 0xFF;
/// Contacts with a touch ellipse axis at or above this size are reported
/// without confidence (palm rejection)
pub const CONFIDENCE_TOUCH_MAX: i16 = 2500;

/// Sensor coordinate range of a trackpad model
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TrackpadInfo {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl Default for TrackpadInfo {
    fn default() -> Self {
        Self {
            x_min: -6243,
            x_max: 6749,
            y_min: -170,
            y_max: 7685,
        }
    }
}

/// Transforms raw SPI trackpad packets into Precision Touchpad reports.
/// The synthesizer itself holds only immutable device parameters; all state
/// that carries over between packets lives in the [SessionState] passed to
/// [ReportSynthesizer::synthesize].
#[derive(Debug, Clone)]
pub struct ReportSynthesizer {
    info: TrackpadInfo,
    ticks_per_unit: u64,
}

impl Default for ReportSynthesizer {
    fn default() -> Self {
        Self::new(TrackpadInfo::default(), TICKS_PER_UNIT)
    }
}

impl ReportSynthesizer {
    pub fn new(info: TrackpadInfo, ticks_per_unit: u64) -> Self {
        Self {
            info,
            ticks_per_unit: ticks_per_unit.max(1),
        }
    }

    pub fn info(&self) -> &TrackpadInfo {
        &self.info
    }

    /// Build a report from the first `length` bytes of `buf`.
    ///
    /// The session timestamp is always advanced to `now_ticks`, even when the
    /// packet fails validation.
    pub fn synthesize(
        &self,
        buf: &[u8],
        length: usize,
        now_ticks: u64,
        session: &mut SessionState,
    ) -> Result<PtpReport, ReportError> {
        let delta = now_ticks.saturating_sub(session.last_report_ticks) / self.ticks_per_unit;
        session.last_report_ticks = now_ticks;

        let packet = TrackpadPacket::unpack(buf, length).inspect_err(|e| {
            log::error!("Failed to decode trackpad packet: {e}");
        })?;

        let report = self.translate(&packet, delta, session);
        Ok(report)
    }

    /// Translate a decoded packet into a report and update the contact slots
    fn translate(
        &self,
        packet: &TrackpadPacket,
        delta: u64,
        session: &mut SessionState,
    ) -> PtpReport {
        let mut report = PtpReport {
            report_id: REPORTID_MULTITOUCH,
            is_button_clicked: packet.is_clicked() as u8,
            ..Default::default()
        };
        report.set_scan_time(delta.min(SCAN_TIME_MAX) as u16);

        let count = packet
            .finger_count()
            .min(MAX_CONTACTS)
            .min(packet.fingers.len());
        report.contact_count = count as u8;

        let mut session_ended = true;
        for (index, finger) in packet.fingers.iter().take(count).enumerate() {
            let contact = &mut report.contacts[index];
            contact.set_contact_id(index as u8);
            contact.set_x(self.normalize_x(finger.get_x()));
            contact.set_y(self.normalize_y(finger.get_y()));
            contact.tip_switch = finger.get_pressure() > 0;
            contact.confidence = finger.get_touch_major() < CONFIDENCE_TOUCH_MAX
                && finger.get_touch_minor() < CONFIDENCE_TOUCH_MAX;

            if contact.tip_switch {
                session_ended = false;
                session.track(index, finger.get_original_x(), finger.get_original_y());
            }

            log::trace!(
                "PTP Contact {index} OX {}, OY {}, X {}, Y {}",
                finger.get_original_x(),
                finger.get_original_y(),
                finger.get_x(),
                finger.get_y()
            );
        }

        if session_ended {
            if !session.is_idle() {
                log::debug!("Touch session ended, releasing contact slots");
            }
            session.reset_contacts();
        }

        report
    }

    /// X grows from the left edge of the sensor
    fn normalize_x(&self, raw_x: i16) -> u16 {
        clamp_u16(i32::from(raw_x).saturating_sub(self.info.x_min))
    }

    /// The sensor's Y axis grows upwards, reports grow downwards
    fn normalize_y(&self, raw_y: i16) -> u16 {
        clamp_u16(self.info.y_max.saturating_sub(i32::from(raw_y)))
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, u16::MAX as i32) as u16
}
