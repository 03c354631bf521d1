//! Command line interface for the `h1recv` echo server.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `h1recv` binary.
#[derive(Debug, Parser)]
#[command(
    name = "h1recv",
    version,
    about = "Echo server built on bounded HTTP/1.x request reception"
)]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Number of accept workers; defaults to the available parallelism.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Receive buffer capacity in bytes; also the largest accepted message.
    #[arg(long, default_value_t = 64 * 1024)]
    pub buffer_capacity: usize,

    /// Budget for a message on a persistent connection, in milliseconds (0 disables).
    #[arg(long, default_value_t = 5_000)]
    pub keepalive_timeout_ms: u64,

    /// Budget for the first message on a connection, in milliseconds (0 disables).
    #[arg(long, default_value_t = 30_000)]
    pub total_timeout_ms: u64,

    /// Limit for writing one response, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub send_timeout_ms: u64,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_match_the_library() {
        let cli = Cli::parse_from(["h1recv"]);
        assert_eq!(cli.bind, "127.0.0.1:8080".parse().expect("addr"));
        assert_eq!(cli.workers, None);
        assert_eq!(cli.buffer_capacity, 64 * 1024);
        assert_eq!(cli.keepalive_timeout_ms, 5_000);
        assert_eq!(cli.total_timeout_ms, 30_000);
        assert!(cli.metrics_addr.is_none());
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from([
            "h1recv",
            "--bind",
            "0.0.0.0:9000",
            "--workers",
            "2",
            "--buffer-capacity",
            "1024",
            "--total-timeout-ms",
            "0",
            "--metrics-addr",
            "127.0.0.1:9100",
        ]);
        assert_eq!(cli.bind.port(), 9000);
        assert_eq!(cli.workers, Some(2));
        assert_eq!(cli.buffer_capacity, 1024);
        assert_eq!(cli.total_timeout_ms, 0);
        assert_eq!(cli.metrics_addr.map(|a| a.port()), Some(9100));
    }
}
