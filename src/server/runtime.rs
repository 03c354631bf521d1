//! Runtime control for [`Server`].

mod accept;
mod backoff;

use std::sync::{Arc, atomic::AtomicU64};

#[cfg(test)]
pub(super) use accept::MockAcceptListener;
pub(super) use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use log::warn;
use tokio::{select, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Bound, Server, ServerError, connection::ConnectionSettings};
use crate::handler::RequestHandler;

impl<H> Server<H, Bound>
where
    H: RequestHandler,
{
    /// Run the server until a shutdown signal is received.
    ///
    /// Spawns the configured number of worker tasks and awaits Ctrl+C for shutdown.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use h1recv::{handler::EchoHandler, server::Server};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), h1recv::server::ServerError> {
    /// let server = Server::new(EchoHandler).bind(([127, 0, 0, 1], 8080).into())?;
    /// server.run().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// Attempting to run a server without binding fails to compile:
    ///
    /// ```compile_fail
    /// use h1recv::{handler::EchoHandler, server::Server};
    ///
    /// async fn try_run() {
    ///     Server::new(EchoHandler)
    ///         .run()
    ///         .await
    ///         .expect("unbound servers do not expose run()");
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the server until the `shutdown` future resolves.
    ///
    /// Resolving `shutdown` stops the accept loops and cancels every receive
    /// in progress; connections then finish their current response and
    /// close. The call returns once all connection tasks have ended.
    ///
    /// # Examples
    ///
    /// ```
    /// use h1recv::{handler::EchoHandler, server::Server};
    /// use tokio::sync::oneshot;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), h1recv::server::ServerError> {
    /// let server = Server::new(EchoHandler).bind(([127, 0, 0, 1], 0).into())?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(async move {
    ///     server
    ///         .run_with_shutdown(async {
    ///             let _ = rx.await;
    ///         })
    ///         .await
    /// });
    ///
    /// let _ = tx.send(());
    /// handle
    ///     .await
    ///     .expect("join server task")
    ///     .expect("server run failed");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            handler,
            workers,
            receive_config,
            send_timeout,
            metrics,
            ready_tx,
            backoff_config,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let settings = ConnectionSettings {
            handler,
            receive_config,
            send_timeout,
            metrics,
            ids: Arc::new(AtomicU64::new(0)),
        };

        for _ in 0..workers {
            tracker.spawn(accept_loop(
                Arc::clone(&listener),
                settings.clone(),
                AcceptLoopOptions {
                    shutdown: shutdown_token.clone(),
                    tracker: tracker.clone(),
                    backoff: backoff_config,
                },
            ));
        }

        // Signal readiness after all workers have been spawned.
        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("Failed to send readiness signal: receiver dropped");
        }

        select! {
            () = shutdown => shutdown_token.cancel(),
            () = tracker.wait() => {},
        }

        tracker.close();
        tracker.wait().await;
        Ok(())
    }
}
