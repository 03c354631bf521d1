//! Receive telemetry.
//!
//! Three layers live here:
//!
//! - [`Metrics`], accumulated per message by the receive pipeline and handed
//!   to the caller with the request;
//! - [`ServerMetrics`], server-wide atomic counters shared by every
//!   connection task through an `Arc`;
//! - free helper functions wrapping the [`metrics`](https://docs.rs/metrics)
//!   facade. They compile to no-ops without the `metrics` feature.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime},
};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::deadline::ReadTiming;

/// Name of the gauge tracking active connections.
pub const CONNECTIONS_ACTIVE: &str = "h1recv_connections_active";
/// Name of the counter tracking completely received messages.
pub const MESSAGES_RECEIVED: &str = "h1recv_messages_received_total";
/// Name of the counter tracking bytes read from connections.
pub const BYTES_RECEIVED: &str = "h1recv_bytes_received_total";
/// Name of the counter tracking failed receive cycles, labelled by `kind`.
pub const RECEIVE_ERRORS: &str = "h1recv_receive_errors_total";
/// Name of the counter tracking responses written.
pub const RESPONSES_SENT: &str = "h1recv_responses_sent_total";
/// Name of the counter tracking panicking connection tasks.
pub const CONNECTION_PANICS: &str = "h1recv_connection_panics_total";

/// Telemetry for one received message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    first_byte_at: Option<SystemTime>,
    last_byte_at: Option<SystemTime>,
    elapsed: Duration,
    bytes_total: usize,
    reads: usize,
    fastest_read: Option<Duration>,
    slowest_read: Option<Duration>,
}

impl Metrics {
    /// Fold a successful read of `n` bytes into the totals.
    pub fn record_read(&mut self, n: usize, timing: &ReadTiming) {
        self.first_byte_at.get_or_insert(timing.started_at);
        self.last_byte_at = Some(timing.finished_at);
        self.elapsed += timing.elapsed;
        self.bytes_total += n;
        self.reads += 1;
        self.fastest_read = Some(self.fastest_read.map_or(timing.elapsed, |d| d.min(timing.elapsed)));
        self.slowest_read = Some(self.slowest_read.map_or(timing.elapsed, |d| d.max(timing.elapsed)));
    }

    /// Wall-clock time the read delivering the first byte was issued.
    #[must_use]
    pub fn first_byte_at(&self) -> Option<SystemTime> { self.first_byte_at }

    /// Wall-clock time the most recent read completed.
    #[must_use]
    pub fn last_byte_at(&self) -> Option<SystemTime> { self.last_byte_at }

    /// Total time spent waiting on successful reads.
    #[must_use]
    pub fn elapsed(&self) -> Duration { self.elapsed }

    #[must_use]
    pub fn bytes_total(&self) -> usize { self.bytes_total }

    /// Number of reads that delivered data.
    #[must_use]
    pub fn reads(&self) -> usize { self.reads }

    #[must_use]
    pub fn fastest_read(&self) -> Option<Duration> { self.fastest_read }

    #[must_use]
    pub fn slowest_read(&self) -> Option<Duration> { self.slowest_read }
}

/// Server-wide counters shared by all connection tasks.
///
/// Every update is mirrored to the `metrics` facade when that feature is
/// enabled.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    connections_accepted: AtomicU64,
    connections_active: AtomicU64,
    messages_received: AtomicU64,
    bytes_received: AtomicU64,
    receive_errors: AtomicU64,
    timeouts: AtomicU64,
    responses_sent: AtomicU64,
    bytes_sent: AtomicU64,
    connection_panics: AtomicU64,
}

/// Point-in-time copy of [`ServerMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerMetricsSnapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub receive_errors: u64,
    pub timeouts: u64,
    pub responses_sent: u64,
    pub bytes_sent: u64,
    pub connection_panics: u64,
}

fn widen(n: usize) -> u64 { u64::try_from(n).unwrap_or(u64::MAX) }

impl ServerMetrics {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        inc_connections();
    }

    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
        dec_connections();
    }

    /// Count a completely received message and its telemetry.
    pub fn message_received(&self, metrics: &Metrics) {
        let bytes = widen(metrics.bytes_total());
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        inc_messages(bytes);
    }

    /// Count a failed receive cycle.
    pub fn receive_failed(&self, kind: &'static str, timed_out: bool) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
        inc_receive_errors(kind);
    }

    pub fn response_sent(&self, bytes: usize) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(widen(bytes), Ordering::Relaxed);
        inc_responses();
    }

    pub fn connection_panicked(&self) {
        self.connection_panics.fetch_add(1, Ordering::Relaxed);
        inc_connection_panics();
    }

    #[must_use]
    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        ServerMetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            connection_panics: self.connection_panics.load(Ordering::Relaxed),
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a received message of `bytes` bytes.
pub fn inc_messages(bytes: u64) {
    #[cfg(feature = "metrics")]
    {
        counter!(MESSAGES_RECEIVED).increment(1);
        counter!(BYTES_RECEIVED).increment(bytes);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = bytes;
}

/// Record a failed receive cycle of the given kind.
pub fn inc_receive_errors(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(RECEIVE_ERRORS, "kind" => kind).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

/// Record a written response.
pub fn inc_responses() {
    #[cfg(feature = "metrics")]
    counter!(RESPONSES_SENT).increment(1);
}

/// Record a panicking connection task.
pub fn inc_connection_panics() {
    #[cfg(feature = "metrics")]
    counter!(CONNECTION_PANICS).increment(1);
}
