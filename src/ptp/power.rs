use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowerError {
    #[error("failed to reconfigure device: {0}")]
    ReconfigureFailed(String),
}

/// Power state of the trackpad as reported by the power management layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceReadiness {
    /// Device is in D3 and cannot service reads
    Off,
    /// Device entered D0 but the trackpad has not been configured yet, which
    /// happens when resuming from sleep
    ActiveUnconfigured,
    ActiveConfigured,
}

/// How a host read should be handled in the current power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Reject,
    ReconfigureThenAdmit,
    Admit,
}

impl DeviceReadiness {
    pub fn admission(&self) -> Admission {
        match self {
            DeviceReadiness::Off => Admission::Reject,
            DeviceReadiness::ActiveUnconfigured => Admission::ReconfigureThenAdmit,
            DeviceReadiness::ActiveConfigured => Admission::Admit,
        }
    }
}

/// Power management collaborator. The report pipeline only queries the
/// current state and asks for a late re-configuration; state transitions are
/// owned by the implementor.
pub trait PowerManager: Send {
    fn current_state(&self) -> DeviceReadiness;
    fn reconfigure(&mut self) -> Result<(), PowerError>;
}
