//! Test helpers shared across server modules.

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::{Arc, atomic::AtomicU64},
};

use rstest::fixture;

use super::{Bound, DEFAULT_SEND_TIMEOUT, Server, connection::ConnectionSettings};
use crate::{config::ReceiveConfig, handler::RequestHandler, metrics::ServerMetrics};

#[fixture]
/// Returns a bound [`TcpListener`] on a free port for use in tests.
///
/// Keeping the listener bound prevents race conditions where another
/// process could claim the port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

/// Extract the bound address from a listener.
#[must_use]
pub fn listener_addr(listener: &StdTcpListener) -> SocketAddr {
    listener
        .local_addr()
        .expect("failed to get listener address")
}

pub fn bind_server<H>(handler: H, listener: StdTcpListener) -> Server<H, Bound>
where
    H: RequestHandler,
{
    Server::new(handler)
        .bind_existing_listener(listener)
        .expect("Failed to bind")
}

/// Connection settings with fresh metrics and the default send timeout.
pub fn settings<H>(handler: H, receive_config: ReceiveConfig) -> ConnectionSettings<H>
where
    H: RequestHandler,
{
    ConnectionSettings {
        handler: Arc::new(handler),
        receive_config,
        send_timeout: DEFAULT_SEND_TIMEOUT,
        metrics: Arc::new(ServerMetrics::new()),
        ids: Arc::new(AtomicU64::new(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::EchoHandler;

    #[test]
    fn listener_addr_matches_local_addr() {
        let listener = free_listener();
        assert_eq!(
            listener_addr(&listener),
            listener.local_addr().expect("failed to get address")
        );
    }

    #[tokio::test]
    async fn bind_server_exposes_the_listener_address() {
        let listener = free_listener();
        let addr = listener_addr(&listener);
        let server = bind_server(EchoHandler, listener);
        assert_eq!(server.local_addr(), Some(addr));
    }
}
