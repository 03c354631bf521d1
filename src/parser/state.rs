//! Parse progress and its mapping onto timeout classification.

use std::fmt;

/// Progress of a request through the parser, ordered from least to most
/// advanced.
///
/// The only backwards move is `AwaitingLineTerminator -> AtStartLine`, taken
/// after an empty line preceding the request line has been skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParseState {
    /// Nothing has been received for the current message.
    #[default]
    NoDataYet,
    /// Collecting the request line.
    AtStartLine,
    /// A line ended with CR and the LF has not been seen yet.
    AwaitingLineTerminator,
    /// Collecting header lines.
    InHeaders,
    /// Collecting the declared body.
    InBody,
    /// The message is complete.
    Completed,
}

/// Phase a receive deadline expired in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// No byte of the message arrived.
    NoData,
    /// The request line was incomplete.
    StartLine,
    /// The header section was incomplete.
    Headers,
    /// The body was incomplete.
    Body,
}

impl ParseState {
    /// Timeout classification for a deadline expiring in this state.
    ///
    /// Returns `None` for [`ParseState::Completed`]: no read is armed once a
    /// message is complete.
    #[must_use]
    pub const fn timeout_kind(self) -> Option<TimeoutKind> {
        match self {
            Self::NoDataYet => Some(TimeoutKind::NoData),
            Self::AtStartLine | Self::AwaitingLineTerminator => Some(TimeoutKind::StartLine),
            Self::InHeaders => Some(TimeoutKind::Headers),
            Self::InBody => Some(TimeoutKind::Body),
            Self::Completed => None,
        }
    }

    /// Whether the message has been fully parsed.
    #[must_use]
    pub const fn is_completed(self) -> bool { matches!(self, Self::Completed) }
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoDataYet => "no-data-yet",
            Self::AtStartLine => "start-line",
            Self::AwaitingLineTerminator => "awaiting-line-terminator",
            Self::InHeaders => "headers",
            Self::InBody => "body",
            Self::Completed => "completed",
        })
    }
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoData => "no data received",
            Self::StartLine => "request line incomplete",
            Self::Headers => "headers incomplete",
            Self::Body => "body incomplete",
        })
    }
}
