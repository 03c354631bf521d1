//! Receive pipeline orchestration.
//!
//! [`receive_message`] drives one receive cycle of a [`ReceiveSession`]:
//! read with the remaining budget, account for the read, parse the unparsed
//! window, compact, and repeat until the message completes or the cycle
//! fails. Exactly one read is in flight at a time and the parser is never
//! fed again once the cycle has an outcome.

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    deadline::ReadOutcome,
    error::ReceiveError,
    metrics::Metrics,
    parser::{ParseError, ParseState, TimeoutKind},
    request::Request,
    session::ReceiveSession,
};

/// Receive one complete request from `reader`.
///
/// The session must be fresh from [`ReceiveSession::new`] or
/// [`ReceiveSession::begin_message`]. Cancelling `cancel` ends the cycle with
/// [`ReceiveError::Cancelled`] at the next suspension.
///
/// # Errors
///
/// Returns the [`ReceiveError`] that ended the cycle: malformed or oversized
/// input, end of stream, a timeout classified by the phase in progress,
/// cancellation, or a transport error. A session that already has an outcome
/// yields [`ReceiveError::CycleFinished`] without touching `reader`.
///
/// # Examples
///
/// ```
/// use h1recv::{config::ReceiveConfig, receive::receive_message, session::ReceiveSession};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), h1recv::error::ReceiveError> {
/// let mut reader: &[u8] = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
/// let mut session = ReceiveSession::new(&ReceiveConfig::default());
/// let (request, metrics) =
///     receive_message(&mut reader, &mut session, &CancellationToken::new()).await?;
/// assert_eq!(request.target(), "/");
/// assert_eq!(metrics.bytes_total(), 27);
/// # Ok(())
/// # }
/// ```
pub async fn receive_message<R>(
    reader: &mut R,
    session: &mut ReceiveSession,
    cancel: &CancellationToken,
) -> Result<(Request, Metrics), ReceiveError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if session.finished {
        return Err(ReceiveError::CycleFinished);
    }

    let result = drive(reader, session, cancel).await;
    session.finished = true;

    let connection = session.id.as_u64();
    let cycle = session.cycles();
    match &result {
        Ok((request, metrics)) => debug!(
            connection,
            cycle,
            method = request.method(),
            request_target = request.target(),
            bytes = metrics.bytes_total(),
            reads = metrics.reads(),
            elapsed_us = u64::try_from(metrics.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request received"
        ),
        Err(error) => debug!(
            connection,
            cycle,
            kind = error.kind(),
            state = %session.parser.state(),
            bytes = session.metrics.bytes_total(),
            %error,
            "receive failed"
        ),
    }
    result
}

fn timeout_in(state: ParseState) -> ReceiveError {
    // Completed never reaches a deadline: no read is armed once it is set.
    ReceiveError::Timeout(state.timeout_kind().unwrap_or(TimeoutKind::Body))
}

async fn drive<R>(
    reader: &mut R,
    session: &mut ReceiveSession,
    cancel: &CancellationToken,
) -> Result<(Request, Metrics), ReceiveError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        if session.buffer.is_full() {
            let limit = session.buffer.capacity();
            return Err(ParseError::MessageTooLarge {
                attempted: limit + 1,
                limit,
            }
            .into());
        }
        if session.deadline.is_expired() {
            return Err(timeout_in(session.parser.state()));
        }

        let outcome = session
            .deadline
            .read(reader, session.buffer.write_window(), cancel)
            .await;
        let n = match outcome {
            ReadOutcome::Data { n, timing } => {
                session.metrics.record_read(n, &timing);
                n
            }
            ReadOutcome::Eof => {
                return Err(ReceiveError::EndOfStream {
                    bytes_received: session.metrics.bytes_total(),
                });
            }
            ReadOutcome::TimedOut => return Err(timeout_in(session.parser.state())),
            ReadOutcome::Cancelled => return Err(ReceiveError::Cancelled),
            ReadOutcome::Failed(e) => return Err(e.into()),
        };
        session.buffer.commit(n);

        let progress = session.parser.parse(session.buffer.parse_window())?;
        session.buffer.consume(progress.consumed());
        trace!(
            connection = session.id.as_u64(),
            read = n,
            consumed = progress.consumed(),
            buffered = session.buffer.unparsed_len(),
            state = %session.parser.state(),
            "parsed window"
        );

        if progress.is_done() {
            let request = session
                .parser
                .take_request()
                .ok_or(ParseError::start_line("missing request line"))?;
            return Ok((request, session.metrics));
        }
    }
}
