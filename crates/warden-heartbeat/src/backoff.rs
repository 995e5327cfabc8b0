use std::time::Duration;

/// Doubling retry delay with a ceiling.
///
/// [`advance`](Self::advance) hands out the delay for the current failure
/// and doubles the next one. With the defaults the sequence is
/// 30, 60, 120, 240, 300, 300, ... seconds until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// The delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the delay for this failure and doubles the next one.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Back to `base`. Called only on success.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}
