//! A scripted [`AsyncRead`] for driving receive cycles.

use std::{
    collections::VecDeque,
    future::Future,
    io,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use tokio::{
    io::{AsyncRead, ReadBuf},
    time::{Sleep, sleep},
};

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Deliver these bytes, split across reads if the caller's buffer is short.
    Data(Vec<u8>),
    /// Sleep before the next step.
    Wait(Duration),
    /// Never complete the pending read.
    Stall,
    /// Fail the read with this error kind.
    Fail(io::ErrorKind),
}

/// Shared count of reads that completed, observable after the reader moved.
#[derive(Debug, Clone, Default)]
pub struct ReadCounter(Arc<AtomicUsize>);

impl ReadCounter {
    #[must_use]
    pub fn get(&self) -> usize { self.0.load(Ordering::SeqCst) }

    fn bump(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
}

/// Reader replaying a script of [`Step`]s, then reporting end of stream.
///
/// Each completed `poll_read` (data, failure or EOF) increments the
/// [`ReadCounter`].
#[derive(Debug, Default)]
pub struct ScriptedReader {
    steps: VecDeque<Step>,
    pending_sleep: Option<Pin<Box<Sleep>>>,
    reads: ReadCounter,
}

impl ScriptedReader {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Deliver `bytes` one byte per read.
    #[must_use]
    pub fn bytewise(bytes: &[u8]) -> Self {
        bytes.iter().fold(Self::new(), |reader, b| reader.data(vec![*b]))
    }

    /// Deliver `bytes` in reads of at most `size` bytes.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    #[must_use]
    pub fn chunked(bytes: &[u8], size: usize) -> Self {
        bytes
            .chunks(size)
            .fold(Self::new(), |reader, chunk| reader.data(chunk))
    }

    #[must_use]
    pub fn data(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.steps.push_back(Step::Data(bytes.into()));
        self
    }

    #[must_use]
    pub fn wait(mut self, delay: Duration) -> Self {
        self.steps.push_back(Step::Wait(delay));
        self
    }

    #[must_use]
    pub fn stall(mut self) -> Self {
        self.steps.push_back(Step::Stall);
        self
    }

    #[must_use]
    pub fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }

    /// Handle to the number of completed reads.
    #[must_use]
    pub fn reads(&self) -> ReadCounter { self.reads.clone() }

    /// Steps not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize { self.steps.len() }
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if let Some(delay) = this.pending_sleep.as_mut() {
                if delay.as_mut().poll(cx).is_pending() {
                    return Poll::Pending;
                }
                this.pending_sleep = None;
            }

            match this.steps.pop_front() {
                None => {
                    this.reads.bump();
                    return Poll::Ready(Ok(()));
                }
                Some(Step::Wait(delay)) => this.pending_sleep = Some(Box::pin(sleep(delay))),
                Some(Step::Stall) => {
                    this.steps.push_front(Step::Stall);
                    return Poll::Pending;
                }
                Some(Step::Fail(kind)) => {
                    this.reads.bump();
                    return Poll::Ready(Err(io::Error::from(kind)));
                }
                Some(Step::Data(mut bytes)) => {
                    if bytes.is_empty() {
                        continue;
                    }
                    let n = bytes.len().min(buf.remaining());
                    buf.put_slice(&bytes[..n]);
                    if n < bytes.len() {
                        this.steps.push_front(Step::Data(bytes.split_off(n)));
                    }
                    this.reads.bump();
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}
