//! Errors raised while parsing a request.

use thiserror::Error;

/// Malformed or oversized input detected by the [`Parser`](super::Parser).
///
/// None of these are retried: the message is rejected as a whole.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The request line could not be split into method, target and version,
    /// or one of them is invalid.
    #[error("malformed request line: {reason}")]
    MalformedStartLine {
        /// What was wrong with the line.
        reason: &'static str,
    },

    /// A header line is invalid or the header section is inconsistent.
    #[error("malformed header: {reason}")]
    MalformedHeader {
        /// What was wrong with the header.
        reason: &'static str,
    },

    /// Bytes arrived after the declared end of the message.
    #[error("body overflow: {received} bytes received for declared length {declared}")]
    BodyOverflow {
        /// Body length announced by the header section.
        declared: usize,
        /// Body bytes seen, including the excess.
        received: usize,
    },

    /// The message head, or head plus declared body, exceeds the size limit.
    #[error("message too large: {attempted} bytes exceed limit of {limit}")]
    MessageTooLarge {
        /// Size the message would need.
        attempted: usize,
        /// Configured maximum.
        limit: usize,
    },
}

impl ParseError {
    pub(crate) const fn start_line(reason: &'static str) -> Self {
        Self::MalformedStartLine { reason }
    }

    pub(crate) const fn header(reason: &'static str) -> Self { Self::MalformedHeader { reason } }
}
