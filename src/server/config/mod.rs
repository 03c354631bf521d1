//! Configuration utilities for [`Server`].

use std::{sync::Arc, time::Duration};

use tokio::sync::oneshot;

use super::{BackoffConfig, DEFAULT_SEND_TIMEOUT, Server, ServerState, Unbound};
use crate::{config::ReceiveConfig, handler::RequestHandler, metrics::ServerMetrics};

pub mod binding;

impl<H> Server<H, Unbound>
where
    H: RequestHandler,
{
    /// Create a new `Server` answering requests with `handler`.
    ///
    /// The worker count defaults to the number of available CPU cores (or 1 if this cannot be
    /// determined). The TCP listener is unset; call [`bind`](Self::bind) before running the
    /// server.
    #[must_use]
    pub fn new(handler: H) -> Self { Self::with_shared_handler(Arc::new(handler)) }

    /// Create a new `Server` from an already shared handler.
    #[must_use]
    pub fn with_shared_handler(handler: Arc<H>) -> Self {
        let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            handler,
            workers,
            receive_config: ReceiveConfig::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            metrics: Arc::new(ServerMetrics::new()),
            ready_tx: None,
            backoff_config: BackoffConfig::default(),
            state: Unbound,
        }
    }
}

impl<H, S> Server<H, S>
where
    H: RequestHandler,
    S: ServerState,
{
    /// Set the number of worker tasks to spawn for the server.
    #[must_use]
    pub fn workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    /// Set the buffer capacity and time budgets used for every connection.
    #[must_use]
    pub fn receive_config(mut self, config: ReceiveConfig) -> Self {
        self.receive_config = config;
        self
    }

    /// Limit the time spent writing a single response.
    #[must_use]
    pub fn send_timeout(mut self, limit: Duration) -> Self {
        self.send_timeout = limit;
        self
    }

    /// Configure accept-loop back-off; the values are normalised before use.
    #[must_use]
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff_config = config.normalized();
        self
    }

    /// Share `metrics` with the server instead of a private instance.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Configure a channel used to signal when the server is ready to accept connections.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Returns the configured number of worker tasks for the server.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize { self.workers }

    /// Returns the per-connection receive configuration.
    #[must_use]
    pub const fn receive_settings(&self) -> &ReceiveConfig { &self.receive_config }

    /// Returns the configured back-off behaviour.
    #[must_use]
    pub const fn backoff_config(&self) -> BackoffConfig { self.backoff_config }

    /// Server-wide counters updated by every connection.
    #[must_use]
    pub fn server_metrics(&self) -> Arc<ServerMetrics> { Arc::clone(&self.metrics) }
}
