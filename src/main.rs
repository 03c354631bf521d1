//! Echo server demonstrating `h1recv` usage.
//!
//! Parses CLI arguments, installs logging and optional Prometheus export,
//! then serves until Ctrl+C.

mod cli;

use std::{error::Error, time::Duration};

use clap::Parser;
use h1recv::{EchoHandler, ReceiveConfig, Server, Timeout};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Milliseconds to a budget where zero means unbounded.
fn budget_from_millis(ms: u64) -> Timeout {
    Timeout::from((ms > 0).then(|| Duration::from_millis(ms)))
}

fn receive_config(cli: &cli::Cli) -> ReceiveConfig {
    ReceiveConfig::default()
        .buffer_capacity(cli.buffer_capacity)
        .keepalive_timeout(budget_from_millis(cli.keepalive_timeout_ms))
        .total_timeout(budget_from_millis(cli.total_timeout_ms))
}

#[cfg(feature = "metrics")]
fn install_exporter(addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!(%addr, "prometheus exporter listening");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_exporter(addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    tracing::warn!(%addr, "metrics support not compiled in; ignoring --metrics-addr");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_exporter(addr)?;
    }

    let mut server = Server::new(EchoHandler)
        .receive_config(receive_config(&cli))
        .send_timeout(Duration::from_millis(cli.send_timeout_ms));
    if let Some(workers) = cli.workers {
        server = server.workers(workers);
    }
    let server = server.bind(cli.bind)?;
    info!(addr = ?server.local_addr(), workers = server.worker_count(), "listening");

    server.run().await?;
    Ok(())
}
