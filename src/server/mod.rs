//! Tokio-based HTTP/1.x server driving the receive pipeline.
//!
//! [`Server`] spawns worker tasks that accept TCP connections. Each
//! connection runs in its own tracked task which owns one
//! [`ReceiveSession`](crate::session::ReceiveSession), receives requests one
//! after another, hands them to a [`RequestHandler`] and writes the
//! responses back while the connection stays persistent.

use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, sync::oneshot};

use crate::{config::ReceiveConfig, handler::RequestHandler, metrics::ServerMetrics};

/// Default limit for writing one response.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Tokio-based server answering requests with a [`RequestHandler`].
///
/// The server carries a typestate `S` indicating whether it is
/// [`Unbound`] (not yet bound to a TCP listener) or [`Bound`]. New
/// servers start `Unbound` and must call [`Server::bind`] or
/// [`Server::bind_existing_listener`] before running. A worker task is
/// spawned per configured worker; all of them share the handler and the
/// server-wide [`ServerMetrics`]. The server listens for a shutdown signal
/// using `tokio::signal::ctrl_c` and notifies all workers and connections
/// to stop.
pub struct Server<H, S = Unbound>
where
    H: RequestHandler,
    S: ServerState,
{
    pub(crate) handler: Arc<H>,
    pub(crate) workers: usize,
    pub(crate) receive_config: ReceiveConfig,
    pub(crate) send_timeout: Duration,
    pub(crate) metrics: Arc<ServerMetrics>,
    /// Channel used to notify when the server is ready.
    ///
    /// A `oneshot::Sender` can transmit only one readiness notification, so
    /// a new sender must be provided each time the server is started.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) backoff_config: BackoffConfig,
    /// Typestate tracking whether the server has been bound to a listener.
    pub(crate) state: S,
}

/// Marker indicating the server has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the server is bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod config;
pub use config::binding;
mod connection;
pub mod error;
mod runtime;

pub use error::ServerError;
/// Re-exported configuration types for server backoff behavior.
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;
