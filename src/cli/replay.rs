use std::{collections::VecDeque, error::Error, path::PathBuf, time::Duration};

use packed_struct::PackedStruct;
use thiserror::Error;

use crate::{
    config::TrackpadConfig,
    drivers::apple_spi::hid_report::{PtpReport, ReportSummary, PTP_REPORT_SIZE},
    ptp::{
        clock::MonotonicClock,
        device::PtpDevice,
        power::{DeviceReadiness, PowerError, PowerManager},
        transport::{CompletionSink, HardwareRead, Transport, TransportError},
    },
};

/// Possible errors parsing a packet capture
#[derive(Error, Debug, PartialEq)]
pub enum CaptureError {
    #[error("line {line}: invalid hex byte '{token}'")]
    InvalidHex { line: usize, token: String },
    #[error("line {line}: odd number of hex digits")]
    OddLength { line: usize },
}

/// Parse a packet capture. Each non-empty line holds one packet as hex
/// bytes, optionally separated by whitespace. Lines starting with `#` are
/// comments.
pub fn parse_capture(content: &str) -> Result<Vec<Vec<u8>>, CaptureError> {
    let mut packets = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let digits: String = line.split_whitespace().collect();
        if digits.len() % 2 != 0 {
            return Err(CaptureError::OddLength { line: line_number });
        }

        let mut packet = Vec::with_capacity(digits.len() / 2);
        let bytes = digits.as_bytes();
        for pair in bytes.chunks(2) {
            let token = String::from_utf8_lossy(pair).to_string();
            let value = u8::from_str_radix(&token, 16).map_err(|_| CaptureError::InvalidHex {
                line: line_number,
                token: token.clone(),
            })?;
            packet.push(value);
        }
        packets.push(packet);
    }

    Ok(packets)
}

/// Transport that answers each hardware read with the next packet from a
/// capture after a fixed delay
#[derive(Debug)]
pub struct ReplayTransport {
    packets: VecDeque<Vec<u8>>,
    interval: Duration,
}

impl ReplayTransport {
    pub fn new(packets: Vec<Vec<u8>>, interval: Duration) -> Self {
        Self {
            packets: packets.into(),
            interval,
        }
    }
}

impl Transport for ReplayTransport {
    fn issue_read(
        &mut self,
        mut read: HardwareRead,
        sink: CompletionSink,
    ) -> Result<(), TransportError> {
        let Some(packet) = self.packets.pop_front() else {
            return Err(TransportError::Rejected("capture exhausted".to_string()));
        };

        let interval = self.interval;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let length = packet.len().min(read.buffer.len());
            if length < packet.len() {
                log::warn!(
                    "Packet of {} bytes truncated to read buffer of {length} bytes",
                    packet.len()
                );
            }
            read.buffer[..length].copy_from_slice(&packet[..length]);
            if let Err(e) = sink.complete(read, length, Ok(())).await {
                log::error!("Failed to deliver replayed packet: {e}");
            }
        });

        Ok(())
    }
}

/// A replayed device never leaves the working power state
#[derive(Debug, Default)]
pub struct ReplayPower;

impl PowerManager for ReplayPower {
    fn current_state(&self) -> DeviceReadiness {
        DeviceReadiness::ActiveConfigured
    }

    fn reconfigure(&mut self) -> Result<(), PowerError> {
        Ok(())
    }
}

/// Replay every packet of the capture and return the completed reports in
/// order. Packets that fail validation are reported as errors.
pub async fn replay_packets(
    config: &TrackpadConfig,
    packets: Vec<Vec<u8>>,
    interval: Duration,
) -> Result<Vec<Result<PtpReport, String>>, Box<dyn Error>> {
    let count = packets.len();
    let transport = ReplayTransport::new(packets, interval);
    let device = PtpDevice::new(
        config,
        Box::new(transport),
        Box::new(ReplayPower),
        Box::new(MonotonicClock::new()),
    );
    let client = device.client();
    let task = tokio::spawn(device.run());

    let mut reports = Vec::with_capacity(count);
    for _ in 0..count {
        let read = client.submit_read(PTP_REPORT_SIZE).await?;
        let result = match read.wait().await {
            Ok(data) => {
                let buffer: &[u8; PTP_REPORT_SIZE] = data.as_slice().try_into()?;
                Ok(PtpReport::unpack(buffer)?)
            }
            Err(e) => Err(e.to_string()),
        };
        reports.push(result);
    }

    client.stop().await?;
    if let Err(e) = task.await? {
        log::error!("Device task exited with error: {e}");
    }

    Ok(reports)
}

pub async fn handle_replay(
    capture: PathBuf,
    config: Option<PathBuf>,
    interval: u64,
) -> Result<(), Box<dyn Error>> {
    let config = match config {
        Some(path) => TrackpadConfig::from_yaml_file(path)?,
        None => TrackpadConfig::default(),
    };
    let content = tokio::fs::read_to_string(&capture).await?;
    let packets = parse_capture(&content)?;
    log::info!(
        "Replaying {} packets from {} on {}",
        packets.len(),
        capture.display(),
        config.name
    );

    let reports = replay_packets(&config, packets, Duration::from_millis(interval)).await?;
    for (index, result) in reports.iter().enumerate() {
        match result {
            Ok(report) => println!("{index}: {}", ReportSummary(report)),
            Err(e) => println!("{index}: error: {e}"),
        }
    }

    Ok(())
}
