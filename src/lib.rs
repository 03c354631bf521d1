#![doc(html_root_url = "https://docs.rs/h1recv/latest")]
//! Public API for the `h1recv` library.
//!
//! This crate receives HTTP/1.x requests from byte streams under strict
//! bounds: a fixed-capacity receive buffer per connection, an incremental
//! parser that accepts input in arbitrary fragments, and a time budget that
//! turns slow or silent peers into state-specific timeouts. A small tokio
//! server drives the pipeline over TCP with persistent connections.

pub mod buffer;
pub mod config;
pub mod deadline;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod parser;
pub mod receive;
pub mod request;
pub mod response;
pub mod server;
pub mod session;

pub use config::{ReceiveConfig, Timeout};
pub use error::ReceiveError;
pub use handler::{EchoHandler, RequestHandler};
pub use metrics::{Metrics, ServerMetrics};
pub use parser::{ParseError, ParseState, Parser, TimeoutKind};
pub use receive::receive_message;
pub use request::{Headers, Request, Version};
pub use response::Response;
pub use server::Server;
pub use session::{ConnectionId, ReceiveSession};
