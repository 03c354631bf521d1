//! Utilities for exercising `h1recv` in tests.
//!
//! [`ScriptedReader`] replays a fixed script of chunks, pauses, stalls and
//! failures so receive cycles can be driven deterministically under a paused
//! tokio clock. [`TestServer`] runs a real [`h1recv::Server`] on a loopback
//! port and [`exchange`] talks to it over TCP.
//!
//! ```rust
//! use h1recv::{ReceiveConfig, ReceiveSession, receive_message};
//! use h1recv_testing::ScriptedReader;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let mut reader = ScriptedReader::new().data("GET / HTTP/1.1\r\n").data("\r\n");
//! let mut session = ReceiveSession::new(&ReceiveConfig::default());
//! let (request, _) = receive_message(&mut reader, &mut session, &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(request.target(), "/");
//! # }
//! ```

pub mod reader;
pub mod requests;
pub mod server;

pub use reader::{ReadCounter, ScriptedReader, Step};
pub use requests::{get, post};
pub use server::{TestServer, exchange, small_config};
