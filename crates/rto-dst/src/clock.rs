//! Simulated tick clock.
//!
//! Experiments advance in whole ticks starting at 1; tick 0 is "before the
//! first send".

/// Discrete simulation clock.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: u64,
}

impl SimClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Advance one tick and return the new time.
    pub fn tick(&mut self) -> u64 {
        self.now += 1;
        self.now
    }

    pub fn advance(&mut self, ticks: u64) {
        self.now += ticks;
    }

    pub fn reset(&mut self) {
        self.now = 0;
    }
}
