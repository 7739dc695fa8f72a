//! Process-wide shutdown signal backed by a tokio [`watch`] channel.
//!
//! The daemon holds the single [`ShutdownTrigger`]; every component of the
//! runtime holds a cloned [`ShutdownSignal`] and observes it at natural
//! suspension points.

use std::sync::Arc;

use tokio::sync::watch;

/// Create a linked trigger/signal pair.
#[must_use]
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownTrigger {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}

/// Fires the shutdown signal. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    /// Signal shutdown to every observer. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

/// Observes the shutdown trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_, signal) = channel();
        signal
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown has been requested.
    ///
    /// Pends forever if the trigger is dropped without firing.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
