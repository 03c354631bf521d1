//! Time budget arithmetic across suspended reads.
//!
//! A receive cycle starts with a [`Budget`] and every read is armed with
//! whatever is left of it. [`DeadlineTracker::read`] measures the read on the
//! monotonic clock, charges the elapsed time to the budget and reports the
//! result as a [`ReadOutcome`]. Monotonic time comes from
//! [`tokio::time::Instant`] so paused-clock tests are deterministic; the
//! wall-clock stamps in [`ReadTiming`] are only used for reporting.

use std::{io, time::SystemTime};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    select,
    time::{Duration, Instant, timeout},
};
use tokio_util::sync::CancellationToken;

/// Time left for the current receive cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    /// Elapsed time never exhausts the budget.
    Unbounded,
    /// Time left before the cycle fails with a timeout.
    Remaining(Duration),
}

impl Budget {
    /// Whether no time is left.
    #[must_use]
    pub fn is_expired(self) -> bool { matches!(self, Self::Remaining(left) if left.is_zero()) }

    /// Finite time left, if any limit applies.
    #[must_use]
    pub const fn remaining(self) -> Option<Duration> {
        match self {
            Self::Unbounded => None,
            Self::Remaining(left) => Some(left),
        }
    }

    /// Budget left after `elapsed` has been spent, saturating at zero.
    #[must_use]
    pub fn charge(self, elapsed: Duration) -> Self {
        match self {
            Self::Unbounded => Self::Unbounded,
            Self::Remaining(left) => Self::Remaining(left.saturating_sub(elapsed)),
        }
    }
}

/// When a read was issued and when it completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadTiming {
    /// Wall-clock time the read was issued.
    pub started_at: SystemTime,
    /// Wall-clock time the read completed.
    pub finished_at: SystemTime,
    /// Monotonic time spent waiting.
    pub elapsed: Duration,
}

/// Result of a single deadline-bounded read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `n > 0` bytes arrived before the deadline.
    Data { n: usize, timing: ReadTiming },
    /// The peer closed its write half.
    Eof,
    /// The budget ran out before any byte arrived.
    TimedOut,
    /// The cancellation token fired first.
    Cancelled,
    /// The transport reported an error.
    Failed(io::Error),
}

/// Arms reads with the remaining budget and folds elapsed time back into it.
#[derive(Debug)]
pub struct DeadlineTracker {
    budget: Budget,
}

impl DeadlineTracker {
    #[must_use]
    pub const fn new(budget: Budget) -> Self { Self { budget } }

    /// Replace the budget at the start of a receive cycle.
    pub fn reset(&mut self, budget: Budget) { self.budget = budget; }

    #[must_use]
    pub const fn budget(&self) -> Budget { self.budget }

    #[must_use]
    pub fn is_expired(&self) -> bool { self.budget.is_expired() }

    /// Read once into `buf`, bounded by the remaining budget and `cancel`.
    ///
    /// Cancellation is checked before the read is polled. Time spent on a
    /// completed read is charged to the budget whatever its result.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn read<R>(
        &mut self,
        reader: &mut R,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> ReadOutcome
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let started_at = SystemTime::now();
        let start = Instant::now();
        let budget = self.budget;

        let result = select! {
            biased;

            () = cancel.cancelled() => return ReadOutcome::Cancelled,
            res = bounded(budget, reader.read(buf)) => res,
        };

        let elapsed = start.elapsed();
        self.budget = self.budget.charge(elapsed);
        match result {
            None => ReadOutcome::TimedOut,
            Some(Ok(0)) => ReadOutcome::Eof,
            Some(Ok(n)) => ReadOutcome::Data {
                n,
                timing: ReadTiming {
                    started_at,
                    finished_at: SystemTime::now(),
                    elapsed,
                },
            },
            Some(Err(e)) => ReadOutcome::Failed(e),
        }
    }
}

async fn bounded<F, T>(budget: Budget, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match budget {
        Budget::Unbounded => Some(fut.await),
        Budget::Remaining(left) => timeout(left, fut).await.ok(),
    }
}
