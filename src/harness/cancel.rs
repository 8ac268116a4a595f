//! Run-wide cancellation.
//!
//! Cancelling stops the corpus loop from launching new fixtures; in-flight invocations observe the same
//! signal and kill their child process.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable, one-way cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the signal has been cancelled (immediately if it already is).
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so `wait_for` only returns once the flag is set.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancel on the first Ctrl-C. Must be called from within a tokio runtime.
    pub fn cancel_on_ctrl_c(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling run");
                signal.cancel();
            }
        });
    }
}
