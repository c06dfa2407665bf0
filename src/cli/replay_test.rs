use std::{error::Error, time::Duration};

use crate::{
    cli::replay::{parse_capture, replay_packets, CaptureError},
    config::TrackpadConfig,
    drivers::apple_spi::hid_report::{FingerData, TrackpadPacket, REPORTID_MULTITOUCH},
};

fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<String>>()
        .join(" ")
}

#[test]
fn test_parse_capture() -> Result<(), Box<dyn Error>> {
    let content = "# captured on resume\n\n02 01 ff\n  0a0B0c  \n# trailing\n";
    let packets = parse_capture(content)?;
    assert_eq!(packets, vec![vec![0x02, 0x01, 0xff], vec![0x0a, 0x0b, 0x0c]]);

    Ok(())
}

#[test]
fn test_parse_capture_errors() {
    assert_eq!(
        parse_capture("02 01\n0"),
        Err(CaptureError::OddLength { line: 2 })
    );
    assert_eq!(
        parse_capture("# header\nzz"),
        Err(CaptureError::InvalidHex {
            line: 2,
            token: "zz".to_string()
        })
    );
}

#[tokio::test]
async fn test_replay_packets() -> Result<(), Box<dyn Error>> {
    let mut packet = TrackpadPacket::default();
    let mut finger = FingerData::default();
    finger.set_original(100, 200);
    finger.set_x(1000);
    finger.set_y(2000);
    finger.set_touch(300, 200);
    finger.set_pressure(10);
    packet.push_finger(finger);
    packet.header.click_occurred = 1;

    let content = format!(
        "# one finger\n{}\n# too short\n02 01 00\n",
        to_hex(&packet.pack_to_vec()?)
    );
    let packets = parse_capture(&content)?;

    let config = TrackpadConfig::default();
    let reports = replay_packets(&config, packets, Duration::ZERO).await?;
    assert_eq!(reports.len(), 2);

    let Ok(report) = &reports[0] else {
        panic!("expected first packet to produce a report");
    };
    assert_eq!(report.report_id, REPORTID_MULTITOUCH);
    assert_eq!(report.contact_count, 1);
    assert!(report.is_clicked());
    let contact = report.contacts[0];
    assert!(contact.tip_switch);
    assert!(contact.confidence);
    assert_eq!(contact.get_contact_id(), 0);

    let info = config.dimensions;
    assert_eq!(contact.get_x() as i32, 1000 - info.x_min);
    assert_eq!(contact.get_y() as i32, info.y_max - 2000);

    let Err(error) = &reports[1] else {
        panic!("expected short packet to fail");
    };
    assert!(error.contains("3 < 46"), "unexpected error: {error}");

    Ok(())
}
