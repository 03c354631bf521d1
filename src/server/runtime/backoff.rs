//! Retry pacing for failed `accept()` calls.

use std::time::Duration;

/// Exponential back-off applied when the listener fails to accept.
///
/// The first retry waits `initial_delay`; each further consecutive failure
/// doubles the wait up to `max_delay`. A successful accept resets the delay.
/// Defaults are 10 milliseconds and 1 second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the delay.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Clamp both delays to at least one millisecond and order them.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use h1recv::server::BackoffConfig;
    ///
    /// let cfg = BackoffConfig {
    ///     initial_delay: Duration::from_millis(5),
    ///     max_delay: Duration::ZERO,
    /// }
    /// .normalized();
    /// assert_eq!(cfg.initial_delay, Duration::from_millis(1));
    /// assert_eq!(cfg.max_delay, Duration::from_millis(5));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial_delay = self.initial_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.initial_delay > self.max_delay {
            std::mem::swap(&mut self.initial_delay, &mut self.max_delay);
        }
        self
    }

    /// Delay to use after another failure following a wait of `delay`.
    #[must_use]
    pub fn next_delay(&self, delay: Duration) -> Duration { delay.saturating_mul(2).min(self.max_delay) }
}
