use std::time::{Duration, Instant};

/// A lap timer, each call returns the time elapsed since the previous one.
#[derive(Debug, Clone, Copy)]
pub struct QClock {
    last: Instant,
}

impl Default for QClock {
    fn default() -> Self {
        Self::new()
    }
}

impl QClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Returns the time elapsed since the last lap, or since the clock was created.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed
    }
}
