//! Application seam for received requests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{metrics::Metrics, request::Request, response::Response};

/// Produces the response for each completely received request.
///
/// One handler instance is shared by every connection of a server.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle `request`; `metrics` describes how it was received.
    async fn handle(&self, request: Request, metrics: Metrics) -> Response;
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    async fn handle(&self, request: Request, metrics: Metrics) -> Response {
        (**self).handle(request, metrics).await
    }
}

/// Handler answering every request with its own body.
///
/// The response also reports the request target and how many bytes and
/// reads the message took to arrive.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle(&self, request: Request, metrics: Metrics) -> Response {
        let target = request.target().to_owned();
        Response::new(200)
            .with_header("Content-Type", "application/octet-stream")
            .with_header("X-Echo-Target", target)
            .with_header("X-Received-Bytes", metrics.bytes_total().to_string())
            .with_header("X-Received-Reads", metrics.reads().to_string())
            .with_body(request.into_body())
    }
}
