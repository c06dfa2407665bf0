use super::hid_report::MAX_CONTACTS;

/// Marker stored in every field of an unused contact slot
pub const UNUSED_SLOT: i32 = -1;

/// Association between a report contact and the hardware's original
/// coordinates for that finger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ContactMapping {
    pub contact_id: i32,
    pub original_x: i32,
    pub original_y: i32,
}

impl ContactMapping {
    pub const UNUSED: ContactMapping = ContactMapping {
        contact_id: UNUSED_SLOT,
        original_x: UNUSED_SLOT,
        original_y: UNUSED_SLOT,
    };

    pub fn is_unused(&self) -> bool {
        *self == Self::UNUSED
    }
}

impl Default for ContactMapping {
    fn default() -> Self {
        Self::UNUSED
    }
}

/// Long lived per-device state carried between reports. It is owned by the
/// device dispatch loop and only mutated while a hardware completion is being
/// synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Counter value when the last report was produced
    pub last_report_ticks: u64,
    /// Contact slots, indexed by contact id
    pub contacts: [ContactMapping; MAX_CONTACTS],
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            last_report_ticks: 0,
            contacts: [ContactMapping::UNUSED; MAX_CONTACTS],
        }
    }
}

impl SessionState {
    pub fn new(now_ticks: u64) -> Self {
        Self {
            last_report_ticks: now_ticks,
            ..Default::default()
        }
    }

    /// Record the original coordinates of the contact in the given slot
    pub fn track(&mut self, slot: usize, original_x: i16, original_y: i16) {
        let Some(mapping) = self.contacts.get_mut(slot) else {
            return;
        };
        *mapping = ContactMapping {
            contact_id: slot as i32,
            original_x: original_x.into(),
            original_y: original_y.into(),
        };
    }

    /// Release every contact slot. Called when all fingers have lifted so
    /// coordinates from a finished session are never carried into the next.
    pub fn reset_contacts(&mut self) {
        self.contacts = [ContactMapping::UNUSED; MAX_CONTACTS];
    }

    /// Returns true if no contact slot is in use
    pub fn is_idle(&self) -> bool {
        self.contacts.iter().all(ContactMapping::is_unused)
    }
}
