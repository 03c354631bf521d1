//! A loopback [`Server`] harness.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use h1recv::{ReceiveConfig, RequestHandler, Server, ServerMetrics, server::ServerError};
use rstest::fixture;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

/// A small receive configuration for tests: 1 KiB buffer, 2 second
/// keep-alive and 5 second total budgets.
#[fixture]
pub fn small_config() -> ReceiveConfig {
    ReceiveConfig::default()
        .buffer_capacity(1024)
        .keepalive_timeout(Duration::from_secs(2))
        .total_timeout(Duration::from_secs(5))
}

/// A running server bound to an ephemeral loopback port.
pub struct TestServer {
    addr: SocketAddr,
    metrics: Arc<ServerMetrics>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Bind `handler` with `config` and wait until the workers are accepting.
    ///
    /// # Panics
    /// Panics if binding fails or the server stops before becoming ready.
    pub async fn start<H>(handler: H, config: ReceiveConfig) -> Self
    where
        H: RequestHandler,
    {
        let metrics = Arc::new(ServerMetrics::new());
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = Server::new(handler)
            .workers(1)
            .receive_config(config)
            .metrics(Arc::clone(&metrics))
            .ready_signal(ready_tx)
            .bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .expect("bind loopback listener");
        let addr = server.local_addr().expect("bound address");
        let handle = tokio::spawn(server.run_with_shutdown(async {
            let _ = stop_rx.await;
        }));
        ready_rx.await.expect("server became ready");
        Self {
            addr,
            metrics,
            stop: Some(stop_tx),
            handle,
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    #[must_use]
    pub fn metrics(&self) -> &ServerMetrics { &self.metrics }

    /// Signal shutdown and wait for every connection task to finish.
    ///
    /// # Panics
    /// Panics if the server task failed or panicked.
    pub async fn shutdown(mut self) -> Arc<ServerMetrics> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.handle)
            .await
            .expect("server task joined")
            .expect("server run succeeded");
        Arc::clone(&self.metrics)
    }
}

/// Write `request` to `addr` and collect everything until the server closes.
///
/// # Errors
/// Returns an error if connecting or transferring fails, or if the server
/// keeps the connection open for longer than five seconds.
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(request).await?;
    let mut response = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "server kept the connection open"))??;
    Ok(response)
}
