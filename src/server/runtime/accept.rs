//! Accept-loop utilities for server runtime.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use log::warn;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    time::{Duration, sleep},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::backoff::BackoffConfig;
use crate::{
    handler::RequestHandler,
    server::{
        ServerError,
        connection::{ConnectionSettings, spawn_connection_task},
    },
};

/// Abstraction for sources of incoming connections consumed by the accept loop.
///
/// Implementations must be cancellation-safe: dropping a pending `accept()`
/// future must not leak resources.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(in crate::server) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { TcpListener::local_addr(self) }
}

#[derive(Debug)]
pub(in crate::server) struct AcceptLoopOptions {
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    pub backoff: BackoffConfig,
}

/// Accepts incoming connections and spawns a tracked task for each.
///
/// Failures to accept trigger an exponential back-off governed by
/// `options.backoff`. The loop ends when `options.shutdown` is cancelled;
/// the same token cancels receives in progress on spawned connections.
pub(in crate::server) async fn accept_loop<H, L>(
    listener: Arc<L>,
    settings: ConnectionSettings<H>,
    options: AcceptLoopOptions,
) where
    H: RequestHandler,
    L: AcceptListener + 'static,
{
    let AcceptLoopOptions {
        shutdown,
        tracker,
        backoff,
    } = options;
    let backoff = backoff.normalized();
    debug_assert!(
        backoff.initial_delay <= backoff.max_delay,
        "BackoffConfig invariant violated: initial_delay > max_delay"
    );
    let mut delay = backoff.initial_delay;
    while let Some(next_delay) =
        accept_iteration(&*listener, &settings, &shutdown, &tracker, &backoff, delay).await
    {
        delay = next_delay;
    }
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn accept_iteration<H, L>(
    listener: &L,
    settings: &ConnectionSettings<H>,
    shutdown: &CancellationToken,
    tracker: &TaskTracker,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    H: RequestHandler,
    L: AcceptListener,
{
    select! {
        biased;

        () = shutdown.cancelled() => None,
        res = listener.accept() => Some(match res {
            Ok((stream, peer_addr)) => {
                spawn_connection_task(stream, peer_addr, settings.clone(), shutdown.child_token(), tracker);
                backoff.initial_delay
            }
            Err(e) => {
                let local_addr = listener.local_addr().ok();
                let error = ServerError::Accept(e);
                warn!("{error}: local_addr={local_addr:?}, retry_in={delay:?}");
                sleep(delay).await;
                backoff.next_delay(delay)
            }
        }),
    }
}
