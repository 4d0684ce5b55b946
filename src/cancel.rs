//! Cooperative cancellation for long-running worker operations
//!
//! The caller keeps one clone of the token and hands another to the worker.
//! Connect attempts and staging downloads race their I/O against
//! [`CancelToken::cancelled`].

use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation signal backed by a watch channel
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // The sender lives as long as any clone, so this only errs after
            // every token is gone; nobody can cancel anymore.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
