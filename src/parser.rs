//! Resumable HTTP/1.x request parser.
//!
//! [`Parser`] is fed the window of buffered-but-unconsumed bytes and advances
//! the request as far as that window allows. It performs no I/O: the caller
//! reads more data whenever [`Progress::NeedMore`] is returned, drops the
//! consumed prefix and calls [`Parser::parse`] again with a window that starts
//! at the first unconsumed byte.
//!
//! Head lines are consumed only once their CRLF terminator is visible, so a
//! partial line stays in the caller's buffer. Body bytes are consumed as soon
//! as they arrive. The resulting [`Request`] is identical however the input
//! was split across calls.

mod error;
mod line;
mod state;

use bytes::BytesMut;
pub use error::ParseError;
use line::StartLine;
pub use state::{ParseState, TimeoutKind};

use crate::request::{BodyLength, Headers, Request};

/// Result of a successful [`Parser::parse`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The window ended mid-token; this many leading bytes were consumed.
    NeedMore(usize),
    /// The message is complete; this many leading bytes were consumed.
    Done(usize),
}

impl Progress {
    /// Number of leading window bytes consumed by the call.
    #[must_use]
    pub const fn consumed(self) -> usize {
        match self {
            Self::NeedMore(n) | Self::Done(n) => n,
        }
    }

    #[must_use]
    pub const fn is_done(self) -> bool { matches!(self, Self::Done(_)) }
}

enum Step {
    Advanced(usize),
    Incomplete,
}

/// Line whose CR has been consumed while its LF is still outstanding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum PendingLine {
    /// An empty line sent ahead of the request line.
    #[default]
    Leading,
    RequestLine,
}

/// Incremental request parser bounded by a maximum message size.
#[derive(Debug)]
pub struct Parser {
    state: ParseState,
    max_message_size: usize,
    pending: PendingLine,
    // Bytes of the current partial line already searched for a terminator.
    scanned: usize,
    head_len: usize,
    start: Option<StartLine>,
    headers: Headers,
    body_length: BodyLength,
    body: BytesMut,
    finished: Option<Request>,
}

impl Parser {
    /// Create a parser rejecting messages larger than `max_message_size`.
    #[must_use]
    pub fn new(max_message_size: usize) -> Self {
        Self {
            state: ParseState::NoDataYet,
            max_message_size,
            pending: PendingLine::Leading,
            scanned: 0,
            head_len: 0,
            start: None,
            headers: Headers::new(),
            body_length: BodyLength::None,
            body: BytesMut::new(),
            finished: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ParseState { self.state }

    #[must_use]
    pub fn max_message_size(&self) -> usize { self.max_message_size }

    /// Discard all progress and prepare for a new message.
    pub fn reset(&mut self) {
        self.state = ParseState::NoDataYet;
        self.pending = PendingLine::Leading;
        self.scanned = 0;
        self.head_len = 0;
        self.start = None;
        self.headers = Headers::new();
        self.body_length = BodyLength::None;
        self.body = BytesMut::new();
        self.finished = None;
    }

    /// Take the completed request.
    ///
    /// Returns `None` until [`ParseState::Completed`] is reached, and after
    /// the request has been taken once.
    pub fn take_request(&mut self) -> Option<Request> { self.finished.take() }

    /// Advance the message using the bytes in `window`.
    ///
    /// Bytes left in the window after the message completes are reported as
    /// [`ParseError::BodyOverflow`], including on a later call before
    /// [`reset`](Self::reset). An empty window on a completed message yields
    /// `Done(0)`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the input is malformed or exceeds the
    /// size limit. The parser must be [`reset`](Self::reset) before reuse.
    pub fn parse(&mut self, window: &[u8]) -> Result<Progress, ParseError> {
        let mut pos = 0;
        loop {
            let rest = &window[pos..];
            let step = match self.state {
                ParseState::NoDataYet => {
                    if rest.is_empty() {
                        Step::Incomplete
                    } else {
                        self.state = ParseState::AtStartLine;
                        Step::Advanced(0)
                    }
                }
                ParseState::AtStartLine => self.start_line(rest)?,
                ParseState::AwaitingLineTerminator => self.line_terminator(rest)?,
                ParseState::InHeaders => self.header_line(rest)?,
                ParseState::InBody => self.body(rest)?,
                ParseState::Completed => {
                    if !rest.is_empty() {
                        let declared = self.body_length.len();
                        return Err(ParseError::BodyOverflow {
                            declared,
                            received: declared + rest.len(),
                        });
                    }
                    return Ok(Progress::Done(pos));
                }
            };
            match step {
                Step::Advanced(n) => pos += n,
                Step::Incomplete => return Ok(Progress::NeedMore(pos)),
            }
        }
    }

    /// Locate the CR ending the current line, resuming where the previous
    /// search stopped.
    fn find_line_end(
        &mut self,
        rest: &[u8],
        bare_lf: ParseError,
    ) -> Result<Option<usize>, ParseError> {
        let from = self.scanned.min(rest.len());
        match rest[from..].iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(i) if rest[from + i] == b'\n' => Err(bare_lf),
            Some(i) => Ok(Some(from + i)),
            None => {
                self.scanned = rest.len();
                Ok(None)
            }
        }
    }

    fn check_head_room(&self, pending: usize) -> Result<(), ParseError> {
        let attempted = self.head_len.saturating_add(pending);
        if attempted > self.max_message_size {
            return Err(ParseError::MessageTooLarge {
                attempted,
                limit: self.max_message_size,
            });
        }
        Ok(())
    }

    fn consume_head(&mut self, n: usize) -> Result<(), ParseError> {
        self.scanned = 0;
        self.head_len += n;
        self.check_head_room(0)
    }

    fn start_line(&mut self, rest: &[u8]) -> Result<Step, ParseError> {
        let bare_lf = ParseError::start_line("bare LF in request line");
        let Some(cr) = self.find_line_end(rest, bare_lf)? else {
            self.check_head_room(rest.len())?;
            return Ok(Step::Incomplete);
        };
        if cr == 0 {
            self.pending = PendingLine::Leading;
        } else {
            self.start = Some(line::parse_request_line(&rest[..cr])?);
            self.pending = PendingLine::RequestLine;
        }
        self.consume_head(cr + 1)?;
        self.state = ParseState::AwaitingLineTerminator;
        Ok(Step::Advanced(cr + 1))
    }

    fn line_terminator(&mut self, rest: &[u8]) -> Result<Step, ParseError> {
        let Some(&first) = rest.first() else {
            return Ok(Step::Incomplete);
        };
        if first != b'\n' {
            return Err(ParseError::start_line("CR not followed by LF"));
        }
        self.consume_head(1)?;
        self.state = match self.pending {
            PendingLine::Leading => ParseState::AtStartLine,
            PendingLine::RequestLine => ParseState::InHeaders,
        };
        Ok(Step::Advanced(1))
    }

    fn header_line(&mut self, rest: &[u8]) -> Result<Step, ParseError> {
        let bare_lf = ParseError::header("bare LF in header section");
        let Some(cr) = self.find_line_end(rest, bare_lf)? else {
            self.check_head_room(rest.len())?;
            return Ok(Step::Incomplete);
        };
        let Some(&lf) = rest.get(cr + 1) else {
            self.scanned = cr;
            self.check_head_room(rest.len())?;
            return Ok(Step::Incomplete);
        };
        if lf != b'\n' {
            return Err(ParseError::header("CR not followed by LF"));
        }

        if cr == 0 {
            self.consume_head(2)?;
            self.finish_head()?;
        } else {
            let (name, value) = line::parse_header_line(&rest[..cr])?;
            self.headers.append(name, value);
            self.consume_head(cr + 2)?;
        }
        Ok(Step::Advanced(cr + 2))
    }

    fn finish_head(&mut self) -> Result<(), ParseError> {
        self.body_length = line::body_length(&self.headers)?;
        let declared = self.body_length.len();
        self.check_head_room(declared)?;
        if declared == 0 {
            self.complete()
        } else {
            self.body.reserve(declared);
            self.state = ParseState::InBody;
            Ok(())
        }
    }

    fn body(&mut self, rest: &[u8]) -> Result<Step, ParseError> {
        let missing = self.body_length.len() - self.body.len();
        let take = missing.min(rest.len());
        if take == 0 {
            return Ok(Step::Incomplete);
        }
        self.body.extend_from_slice(&rest[..take]);
        if take == missing {
            self.complete()?;
        }
        Ok(Step::Advanced(take))
    }

    fn complete(&mut self) -> Result<(), ParseError> {
        let Some(StartLine {
            method,
            target,
            version,
        }) = self.start.take()
        else {
            return Err(ParseError::start_line("missing request line"));
        };
        self.finished = Some(Request {
            method,
            target,
            version,
            headers: std::mem::take(&mut self.headers),
            body_length: self.body_length,
            body: self.body.split().freeze(),
        });
        self.state = ParseState::Completed;
        Ok(())
    }
}
