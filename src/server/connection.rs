//! Per-connection dispatch for [`Server`](super::Server).
//!
//! Each accepted connection owns one [`ReceiveSession`] for its lifetime.
//! Requests are received one at a time, handed to the [`RequestHandler`] and
//! answered before the next receive cycle starts with the keep-alive budget.

use std::{
    any::Any,
    fmt,
    net::SocketAddr,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::BytesMut;
use futures::FutureExt;
use log::error;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::debug;

use crate::{
    config::ReceiveConfig,
    error::ReceiveError,
    handler::RequestHandler,
    metrics::ServerMetrics,
    receive::receive_message,
    request::Version,
    response::Response,
    session::{ConnectionId, ReceiveSession},
};

/// Everything a connection task needs from its server.
pub(in crate::server) struct ConnectionSettings<H> {
    pub handler: Arc<H>,
    pub receive_config: ReceiveConfig,
    pub send_timeout: Duration,
    pub metrics: Arc<ServerMetrics>,
    pub ids: Arc<AtomicU64>,
}

impl<H> Clone for ConnectionSettings<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            receive_config: self.receive_config,
            send_timeout: self.send_timeout,
            metrics: Arc::clone(&self.metrics),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<H> fmt::Debug for ConnectionSettings<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("receive_config", &self.receive_config)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

/// Panic payload rendered as a string when it is one, `Debug` otherwise.
struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Keeps the active connection count right even if the task unwinds.
struct ActiveConnection<'a>(&'a ServerMetrics);

impl<'a> ActiveConnection<'a> {
    fn open(metrics: &'a ServerMetrics) -> Self {
        metrics.connection_opened();
        Self(metrics)
    }
}

impl Drop for ActiveConnection<'_> {
    fn drop(&mut self) { self.0.connection_closed(); }
}

/// Spawn a task to serve a single TCP connection, logging and discarding any panics.
pub(in crate::server) fn spawn_connection_task<H>(
    stream: TcpStream,
    peer_addr: SocketAddr,
    settings: ConnectionSettings<H>,
    cancel: CancellationToken,
    tracker: &TaskTracker,
) where
    H: RequestHandler,
{
    let id = ConnectionId::new(settings.ids.fetch_add(1, Ordering::Relaxed));
    tracker.spawn(async move {
        debug!(connection = id.as_u64(), %peer_addr, "connection accepted");
        let fut = AssertUnwindSafe(serve_connection(stream, id, &settings, &cancel)).catch_unwind();

        if let Err(panic) = fut.await {
            settings.metrics.connection_panicked();
            let panic_msg = PanicMessage(panic);
            // Emit via both `log` and `tracing` for tests that capture either.
            error!("connection task panicked: panic={panic_msg}, peer_addr={peer_addr}");
            tracing::error!(panic = %panic_msg, %peer_addr, "connection task panicked");
        }
    });
}

async fn write_response<W>(io: &mut W, bytes: &[u8], limit: Duration) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let write = async {
        io.write_all(bytes).await?;
        io.flush().await
    };
    timeout(limit, write).await.map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::TimedOut, "response write timed out")
    })?
}

/// Receive and answer requests on `io` until the connection ends.
pub(in crate::server) async fn serve_connection<IO, H>(
    mut io: IO,
    id: ConnectionId,
    settings: &ConnectionSettings<H>,
    cancel: &CancellationToken,
) where
    IO: AsyncRead + AsyncWrite + Unpin,
    H: RequestHandler,
{
    let _active = ActiveConnection::open(&settings.metrics);
    let mut session = ReceiveSession::new(&settings.receive_config).with_connection_id(id);
    let mut out = BytesMut::new();

    loop {
        match receive_message(&mut io, &mut session, cancel).await {
            Ok((request, message_metrics)) => {
                settings.metrics.message_received(&message_metrics);
                let version = request.version();
                let client_keep_alive = request.wants_keep_alive();
                let response = settings.handler.handle(request, message_metrics).await;
                let keep_alive =
                    client_keep_alive && !response.wants_close() && !cancel.is_cancelled();

                out.clear();
                response.encode(version, keep_alive, &mut out);
                if let Err(e) = write_response(&mut io, &out, settings.send_timeout).await {
                    debug!(connection = id.as_u64(), error = %e, "response write failed");
                    return;
                }
                settings.metrics.response_sent(out.len());
                if !keep_alive {
                    break;
                }
                session.begin_message(true);
            }
            Err(ReceiveError::EndOfStream { bytes_received: 0 }) if session.cycles() > 1 => {
                debug!(connection = id.as_u64(), "peer closed between messages");
                break;
            }
            Err(error) => {
                settings
                    .metrics
                    .receive_failed(error.kind(), error.is_timeout());
                if let Some(status) = error.status_hint() {
                    let response = Response::new(status)
                        .with_header("Content-Type", "text/plain")
                        .with_body(format!("{error}\n"))
                        .close();
                    out.clear();
                    response.encode(Version::Http11, false, &mut out);
                    match write_response(&mut io, &out, settings.send_timeout).await {
                        Ok(()) => settings.metrics.response_sent(out.len()),
                        Err(e) => debug!(connection = id.as_u64(), error = %e, "error response write failed"),
                    }
                }
                break;
            }
        }
    }

    if let Err(e) = io.shutdown().await {
        debug!(connection = id.as_u64(), error = %e, "connection shutdown failed");
    }
    debug!(connection = id.as_u64(), cycles = session.cycles(), "connection closed");
}
