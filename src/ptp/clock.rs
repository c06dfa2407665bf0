use std::time::Instant;

/// Source of monotonic performance counter ticks
pub trait Clock: Send {
    fn now_ticks(&self) -> u64;
}

/// [Clock] backed by [Instant] that counts 100ns ticks since creation
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub const TICKS_PER_SECOND: u64 = 10_000_000;

    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ticks(&self) -> u64 {
        let ticks = self.start.elapsed().as_nanos() / 100;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}
