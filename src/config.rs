//! Receive configuration.
//!
//! [`ReceiveConfig`] bounds every receive cycle: the buffer capacity doubles
//! as the maximum message size, and the two [`Timeout`]s pick the time budget
//! a cycle starts with.

use std::time::Duration;

use crate::deadline::Budget;

/// Default buffer capacity and maximum message size.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;
/// Default budget for a message following an earlier one on the connection.
pub const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default budget for the first message on a connection.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Time limit for receiving a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// The message must arrive within this duration.
    Finite(Duration),
    /// Only cancellation ends the wait.
    Unbounded,
}

impl Timeout {
    #[must_use]
    pub const fn is_unbounded(self) -> bool { matches!(self, Self::Unbounded) }

    /// Budget a receive cycle starts with under this limit.
    #[must_use]
    pub const fn budget(self) -> Budget {
        match self {
            Self::Finite(limit) => Budget::Remaining(limit),
            Self::Unbounded => Budget::Unbounded,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(limit: Duration) -> Self { Self::Finite(limit) }
}

impl From<Option<Duration>> for Timeout {
    fn from(limit: Option<Duration>) -> Self { limit.map_or(Self::Unbounded, Self::Finite) }
}

/// Limits applied to each receive cycle on a connection.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use h1recv::config::{ReceiveConfig, Timeout};
///
/// let config = ReceiveConfig::default()
///     .buffer_capacity(8 * 1024)
///     .keepalive_timeout(Timeout::Unbounded)
///     .total_timeout(Duration::from_secs(10));
/// assert_eq!(config.buffer_capacity, 8 * 1024);
/// assert_eq!(config.total_timeout, Timeout::Finite(Duration::from_secs(10)));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiveConfig {
    /// Size of the receive buffer, and so the largest accepted message.
    pub buffer_capacity: usize,
    /// Budget for a message that follows another on the same connection.
    pub keepalive_timeout: Timeout,
    /// Budget for the first message, and for later messages when
    /// `keepalive_timeout` is unbounded.
    pub total_timeout: Timeout,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            keepalive_timeout: Timeout::Finite(DEFAULT_KEEPALIVE_TIMEOUT),
            total_timeout: Timeout::Finite(DEFAULT_TOTAL_TIMEOUT),
        }
    }
}

impl ReceiveConfig {
    /// Set the buffer capacity; values below one byte are raised to one.
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn keepalive_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.keepalive_timeout = timeout.into();
        self
    }

    #[must_use]
    pub fn total_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.total_timeout = timeout.into();
        self
    }

    /// Budget a receive cycle starts with.
    ///
    /// A reused connection starts from a finite `keepalive_timeout`; every
    /// other cycle starts from `total_timeout`.
    #[must_use]
    pub fn initial_budget(&self, keepalive: bool) -> Budget {
        match self.keepalive_timeout {
            Timeout::Finite(limit) if keepalive => Budget::Remaining(limit),
            _ => self.total_timeout.budget(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const KEEPALIVE: Duration = Duration::from_secs(2);
    const TOTAL: Duration = Duration::from_secs(7);

    #[rstest]
    #[case(Timeout::Finite(KEEPALIVE), Timeout::Finite(TOTAL), true, Budget::Remaining(KEEPALIVE))]
    #[case(Timeout::Finite(KEEPALIVE), Timeout::Finite(TOTAL), false, Budget::Remaining(TOTAL))]
    #[case(Timeout::Unbounded, Timeout::Finite(TOTAL), true, Budget::Remaining(TOTAL))]
    #[case(Timeout::Unbounded, Timeout::Unbounded, true, Budget::Unbounded)]
    #[case(Timeout::Finite(KEEPALIVE), Timeout::Unbounded, false, Budget::Unbounded)]
    fn initial_budget_selection(
        #[case] keepalive_timeout: Timeout,
        #[case] total_timeout: Timeout,
        #[case] keepalive: bool,
        #[case] expected: Budget,
    ) {
        let config = ReceiveConfig::default()
            .keepalive_timeout(keepalive_timeout)
            .total_timeout(total_timeout);
        assert_eq!(config.initial_budget(keepalive), expected);
    }

    #[test]
    fn zero_capacity_is_raised() {
        assert_eq!(ReceiveConfig::default().buffer_capacity(0).buffer_capacity, 1);
    }

    #[test]
    fn optional_durations_convert() {
        assert_eq!(Timeout::from(None), Timeout::Unbounded);
        assert_eq!(Timeout::from(Some(TOTAL)), Timeout::Finite(TOTAL));
    }
}
