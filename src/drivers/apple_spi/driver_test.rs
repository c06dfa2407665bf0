use std::error::Error;

use crate::drivers::apple_spi::{
    driver::{ReportSynthesizer, TrackpadInfo, TICKS_PER_UNIT},
    hid_report::{FingerData, ReportError, TrackpadPacket, MIN_PACKET_SIZE},
    session::{ContactMapping, SessionState},
};

fn synthesizer() -> ReportSynthesizer {
    let info = TrackpadInfo {
        x_min: 0,
        x_max: 1000,
        y_min: 0,
        y_max: 1000,
    };
    ReportSynthesizer::new(info, TICKS_PER_UNIT)
}

fn finger(x: i16, y: i16, pressure: i16) -> FingerData {
    let mut finger = FingerData::default();
    finger.set_x(x);
    finger.set_y(y);
    finger.set_original(x / 2, y / 2);
    finger.set_pressure(pressure);
    finger.set_touch(100, 100);
    finger
}

fn packet(fingers: &[FingerData]) -> Vec<u8> {
    let mut packet = TrackpadPacket::default();
    for finger in fingers {
        packet.push_finger(*finger);
    }
    packet.pack_to_vec().unwrap()
}

#[tokio::test]
async fn test_contact_truncation() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    let mut session = SessionState::default();

    let mut fingers = vec![finger(100, 900, 10)];
    for _ in 1..7 {
        fingers.push(finger(500, 500, 0));
    }
    let data = packet(&fingers);

    let report = synth.synthesize(&data, data.len(), 0, &mut session)?;
    println!("Report: {}", report);
    assert_eq!(report.contact_count, 5);
    let contact = report.contacts[0];
    assert_eq!(contact.get_contact_id(), 0);
    assert_eq!(contact.get_x(), 100);
    assert_eq!(contact.get_y(), 100);
    assert!(contact.tip_switch);
    assert!(contact.confidence);
    for (index, contact) in report.active_contacts().iter().enumerate() {
        assert_eq!(contact.get_contact_id() as usize, index);
    }

    // Contact 0 is still touching so the session continues
    assert_eq!(
        session.contacts[0],
        ContactMapping {
            contact_id: 0,
            original_x: 50,
            original_y: 450,
        }
    );
    assert!(session.contacts[1..].iter().all(ContactMapping::is_unused));

    Ok(())
}

#[tokio::test]
async fn test_finger_counts() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    for count in 0..=8usize {
        let mut session = SessionState::default();
        let fingers = vec![finger(10, 10, 1); count];
        let data = packet(&fingers);
        let report = synth.synthesize(&data, data.len(), 0, &mut session)?;
        assert_eq!(report.contact_count as usize, count.min(5));
    }

    Ok(())
}

#[tokio::test]
async fn test_session_end_resets_slots() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    let mut session = SessionState::default();
    session.contacts[0] = ContactMapping {
        contact_id: 0,
        original_x: 5,
        original_y: 5,
    };

    let data = packet(&[]);
    let report = synth.synthesize(&data, data.len(), 0, &mut session)?;
    assert_eq!(report.contact_count, 0);
    assert!(session.is_idle());
    assert_eq!(session.contacts, [ContactMapping::UNUSED; 5]);

    Ok(())
}

#[tokio::test]
async fn test_lifted_fingers_end_session() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    let mut session = SessionState::default();

    let data = packet(&[finger(10, 10, 3), finger(20, 20, 3)]);
    synth.synthesize(&data, data.len(), 0, &mut session)?;
    assert!(!session.contacts[0].is_unused());
    assert!(!session.contacts[1].is_unused());

    // Both fingers still reported but without pressure
    let data = packet(&[finger(10, 10, 0), finger(20, 20, 0)]);
    let report = synth.synthesize(&data, data.len(), 100, &mut session)?;
    assert_eq!(report.contact_count, 2);
    assert!(report.active_contacts().iter().all(|c| !c.tip_switch));
    assert!(session.is_idle());

    Ok(())
}

#[tokio::test]
async fn test_coordinates_never_underflow() -> Result<(), Box<dyn Error>> {
    let info = TrackpadInfo {
        x_min: -200,
        x_max: 6000,
        y_min: -100,
        y_max: 5000,
    };
    let synth = ReportSynthesizer::new(info, TICKS_PER_UNIT);
    let mut session = SessionState::default();

    let data = packet(&[
        finger(-300, 6000, 1),
        finger(-200, 5000, 1),
        finger(1000, -100, 1),
        finger(i16::MAX, i16::MIN, 1),
    ]);
    let report = synth.synthesize(&data, data.len(), 0, &mut session)?;
    let contacts = report.active_contacts();
    assert_eq!((contacts[0].get_x(), contacts[0].get_y()), (0, 0));
    assert_eq!((contacts[1].get_x(), contacts[1].get_y()), (0, 0));
    assert_eq!((contacts[2].get_x(), contacts[2].get_y()), (1200, 5100));
    assert_eq!(contacts[3].get_x(), (i16::MAX as u16) + 200);
    assert_eq!(contacts[3].get_y(), 5000 + 32768);

    Ok(())
}

#[tokio::test]
async fn test_confidence() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    let cases = [
        (0, 0, true),
        (2499, 2499, true),
        (2500, 100, false),
        (100, 2500, false),
        (3000, 3000, false),
    ];
    for (major, minor, expected) in cases {
        let mut session = SessionState::default();
        let mut f = finger(10, 10, 1);
        f.set_touch(major, minor);
        let data = packet(&[f]);
        let report = synth.synthesize(&data, data.len(), 0, &mut session)?;
        assert_eq!(
            report.contacts[0].confidence, expected,
            "major {major}, minor {minor}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_scan_time_saturates() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    let data = packet(&[finger(10, 10, 1)]);
    let cases = [
        (0, 0),
        (99, 0),
        (100, 1),
        (25_400, 254),
        (25_499, 254),
        (25_500, 255),
        (1_000_000, 255),
        (u64::MAX, 255),
    ];
    for (delta, expected) in cases {
        let mut session = SessionState::new(0);
        let report = synth.synthesize(&data, data.len(), delta, &mut session)?;
        assert_eq!(report.get_scan_time(), expected, "delta {delta}");
        assert_eq!(session.last_report_ticks, delta);
    }

    // A counter that appears to run backwards yields zero
    let mut session = SessionState::new(5_000);
    let report = synth.synthesize(&data, data.len(), 1_000, &mut session)?;
    assert_eq!(report.get_scan_time(), 0);

    Ok(())
}

#[tokio::test]
async fn test_short_packet_updates_timestamp() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    let mut session = SessionState::new(1_000);
    session.track(0, 5, 5);

    let data = [0u8; MIN_PACKET_SIZE];
    for length in [0, 10, MIN_PACKET_SIZE - 1] {
        let now = 2_000 + length as u64;
        let result = synth.synthesize(&data, length, now, &mut session);
        assert_eq!(result, Err(ReportError::ShortPacket(length)));
        assert_eq!(session.last_report_ticks, now);
    }

    // Slots are untouched by a rejected packet
    assert!(!session.contacts[0].is_unused());

    Ok(())
}

#[tokio::test]
async fn test_button_click() -> Result<(), Box<dyn Error>> {
    let synth = synthesizer();
    let mut session = SessionState::default();

    let mut packet = TrackpadPacket::default();
    packet.push_finger(finger(10, 10, 1));
    packet.header.click_occurred = 1;
    let data = packet.pack_to_vec()?;
    let report = synth.synthesize(&data, data.len(), 0, &mut session)?;
    assert!(report.is_clicked());

    packet.header.click_occurred = 0;
    let data = packet.pack_to_vec()?;
    let report = synth.synthesize(&data, data.len(), 0, &mut session)?;
    assert!(!report.is_clicked());

    Ok(())
}
