//! Terminal outcomes of a failed receive cycle.

use std::io;

use thiserror::Error;

use crate::parser::{ParseError, TimeoutKind};

/// Why [`receive_message`](crate::receive::receive_message) produced no
/// request.
///
/// Every variant is final for the cycle; nothing is retried.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// The input was malformed, overflowed its declared length or was too
    /// large for the buffer.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The peer closed the connection before the message was complete.
    #[error("connection closed after {bytes_received} bytes of an incomplete message")]
    EndOfStream {
        /// Bytes of the current message received before the close.
        bytes_received: usize,
    },

    /// The time budget ran out; the kind names the phase in progress.
    #[error("receive timed out: {0}")]
    Timeout(TimeoutKind),

    /// The server is shutting down.
    #[error("receive cancelled")]
    Cancelled,

    /// The transport failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// The session already produced an outcome and was not restarted with
    /// [`begin_message`](crate::session::ReceiveSession::begin_message).
    #[error("receive cycle already finished")]
    CycleFinished,
}

impl ReceiveError {
    #[must_use]
    pub fn is_timeout(&self) -> bool { matches!(self, Self::Timeout(_)) }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled) }

    /// Status code to answer with before closing the connection.
    ///
    /// `None` means the connection is closed without a response: nothing
    /// was received, the peer is gone, or the server is shutting down.
    #[must_use]
    pub fn status_hint(&self) -> Option<u16> {
        match self {
            Self::Parse(ParseError::MessageTooLarge { .. }) => Some(413),
            Self::Parse(_) => Some(400),
            Self::Timeout(TimeoutKind::NoData) => None,
            Self::Timeout(_) => Some(408),
            Self::EndOfStream { .. } | Self::Cancelled | Self::Io(_) | Self::CycleFinished => None,
        }
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(ParseError::MalformedStartLine { .. }) => "malformed_start_line",
            Self::Parse(ParseError::MalformedHeader { .. }) => "malformed_header",
            Self::Parse(ParseError::BodyOverflow { .. }) => "body_overflow",
            Self::Parse(ParseError::MessageTooLarge { .. }) => "message_too_large",
            Self::EndOfStream { .. } => "end_of_stream",
            Self::Timeout(TimeoutKind::NoData) => "timeout_no_data",
            Self::Timeout(TimeoutKind::StartLine) => "timeout_start_line",
            Self::Timeout(TimeoutKind::Headers) => "timeout_headers",
            Self::Timeout(TimeoutKind::Body) => "timeout_body",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
            Self::CycleFinished => "cycle_finished",
        }
    }
}
