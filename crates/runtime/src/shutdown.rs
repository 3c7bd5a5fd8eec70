use std::{
    future::Future,
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::{FutureExt, future::join_all};
use tokio::{
    signal::unix::{Signal, SignalKind},
    sync::watch,
    task::JoinHandle,
};
use tracing::{debug, warn};

/// A `ShutdownSignal` is an helper struct that listens for various shutdown signals sources.
pub struct ShutdownSignal {
    /// A future that resolves when a SIGINT signal is received.
    ctrl_c: Pin<Box<dyn Future<Output = io::Result<()>> + Send>>,
    /// A future that resolves when a SIGTERM signal is received.
    term_signal: Signal,
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal").finish_non_exhaustive()
    }
}

impl ShutdownSignal {
    /// Installs the SIGINT and SIGTERM handlers.
    pub fn new() -> io::Result<Self> {
        let ctrl_c = Box::pin(tokio::signal::ctrl_c());
        let term_signal = tokio::signal::unix::signal(SignalKind::terminate())?;

        Ok(Self { ctrl_c, term_signal })
    }
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.ctrl_c.poll_unpin(cx).is_ready() {
            debug!("Received SIGINT signal");
            return Poll::Ready(());
        }

        if this.term_signal.poll_recv(cx).is_ready() {
            debug!("Received SIGTERM signal");
            return Poll::Ready(());
        }

        Poll::Pending
    }
}

/// Process-wide cancellation source.
///
/// Hands out [`ShutdownToken`]s to tasks; [`Shutdown::trigger`] flips every token at once.
/// Dropping the `Shutdown` also counts as a cancellation.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Creates a new, untriggered cancellation source.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a token observing this source.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken { rx: self.tx.subscribe() }
    }

    /// Cancels every token handed out by this source.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Cooperative cancellation handle owned by a single task.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once cancellation is requested or the source is dropped.
    pub async fn cancelled(&mut self) {
        // An error means the sender is gone, which is treated as cancellation.
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Wait for `handles` to finish, aborting whatever is still running after `timeout`.
///
/// Returns `true` when every task completed on its own.
pub async fn join_with_timeout(mut handles: Vec<JoinHandle<()>>, timeout: Duration) -> bool {
    let joined = tokio::time::timeout(timeout, join_all(handles.iter_mut())).await;

    match joined {
        Ok(results) => {
            for res in results {
                if let Err(e) = res {
                    if e.is_panic() {
                        warn!(error = %e, "task panicked before shutdown");
                    }
                }
            }
            debug!("Graceful shutdown completed successfully");
            true
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Graceful shutdown timeout exceeded, aborting tasks");
            for handle in &handles {
                handle.abort();
            }
            false
        }
    }
}
