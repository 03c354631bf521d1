//! Per-connection receive state.
//!
//! A [`ReceiveSession`] is created once per accepted connection and carries
//! everything a receive cycle needs across suspended reads: the buffer, the
//! parser, the metrics accumulator and the remaining time budget.
//! [`ReceiveSession::begin_message`] re-initialises it before each message.

use std::fmt;

use crate::{
    buffer::RecvBuffer,
    config::ReceiveConfig,
    deadline::{Budget, DeadlineTracker},
    metrics::Metrics,
    parser::{ParseState, Parser},
};

/// Identifier assigned to a connection for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ConnectionId({})", self.0) }
}

/// Receive state owned by one connection task.
#[derive(Debug)]
pub struct ReceiveSession {
    pub(crate) config: ReceiveConfig,
    pub(crate) id: ConnectionId,
    pub(crate) buffer: RecvBuffer,
    pub(crate) parser: Parser,
    pub(crate) metrics: Metrics,
    pub(crate) deadline: DeadlineTracker,
    // Set once the current cycle produced its outcome.
    pub(crate) finished: bool,
    cycles: u64,
}

impl ReceiveSession {
    /// Create a session ready to receive the first message of a connection.
    #[must_use]
    pub fn new(config: &ReceiveConfig) -> Self {
        Self {
            config: *config,
            id: ConnectionId::default(),
            buffer: RecvBuffer::with_capacity(config.buffer_capacity),
            parser: Parser::new(config.buffer_capacity),
            metrics: Metrics::default(),
            deadline: DeadlineTracker::new(config.initial_budget(false)),
            finished: false,
            cycles: 1,
        }
    }

    /// Tag the session with the connection it serves.
    #[must_use]
    pub fn with_connection_id(mut self, id: ConnectionId) -> Self {
        self.id = id;
        self
    }

    /// Prepare for the next message.
    ///
    /// `keepalive` marks a message following an earlier one on the same
    /// connection, which selects the keep-alive budget when it is finite.
    pub fn begin_message(&mut self, keepalive: bool) {
        self.buffer.clear();
        self.parser.reset();
        self.metrics = Metrics::default();
        self.deadline.reset(self.config.initial_budget(keepalive));
        self.finished = false;
        self.cycles += 1;
    }

    #[must_use]
    pub fn connection_id(&self) -> ConnectionId { self.id }

    #[must_use]
    pub fn config(&self) -> &ReceiveConfig { &self.config }

    /// Parse progress of the current message.
    #[must_use]
    pub fn state(&self) -> ParseState { self.parser.state() }

    /// Time left for the current message.
    #[must_use]
    pub fn budget(&self) -> Budget { self.deadline.budget() }

    /// Telemetry accumulated for the current message.
    #[must_use]
    pub fn metrics(&self) -> &Metrics { &self.metrics }

    /// Bytes received but not yet consumed by the parser.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.buffer.unparsed_len() }

    /// Whether the current cycle has already produced its outcome.
    #[must_use]
    pub fn is_finished(&self) -> bool { self.finished }

    /// Number of receive cycles started, including the current one.
    #[must_use]
    pub fn cycles(&self) -> u64 { self.cycles }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Timeout;

    fn config() -> ReceiveConfig {
        ReceiveConfig::default()
            .buffer_capacity(128)
            .keepalive_timeout(Duration::from_secs(1))
            .total_timeout(Duration::from_secs(9))
    }

    #[test]
    fn new_session_uses_total_timeout() {
        let session = ReceiveSession::new(&config());
        assert_eq!(session.state(), ParseState::NoDataYet);
        assert_eq!(session.budget(), Budget::Remaining(Duration::from_secs(9)));
        assert_eq!(session.buffered_len(), 0);
        assert_eq!(session.cycles(), 1);
        assert!(!session.is_finished());
    }

    #[test]
    fn begin_message_resets_and_selects_budget() {
        let mut session = ReceiveSession::new(&config());
        session.buffer.write_window()[..3].copy_from_slice(b"GET");
        session.buffer.commit(3);
        session.finished = true;

        session.begin_message(true);
        assert_eq!(session.buffered_len(), 0);
        assert_eq!(session.budget(), Budget::Remaining(Duration::from_secs(1)));
        assert!(!session.is_finished());
        assert_eq!(session.cycles(), 2);

        session.begin_message(false);
        assert_eq!(session.budget(), Budget::Remaining(Duration::from_secs(9)));
    }

    #[test]
    fn unbounded_keepalive_falls_back_to_total() {
        let config = config().keepalive_timeout(Timeout::Unbounded);
        let mut session = ReceiveSession::new(&config);
        session.begin_message(true);
        assert_eq!(session.budget(), Budget::Remaining(Duration::from_secs(9)));
    }

    #[test]
    fn connection_id_is_carried() {
        let session = ReceiveSession::new(&config()).with_connection_id(ConnectionId::new(7));
        assert_eq!(session.connection_id().as_u64(), 7);
        assert_eq!(session.connection_id().to_string(), "ConnectionId(7)");
    }
}
