//! Graceful-shutdown signalling between the listener, the control loops
//! and the data loops.

use tokio::sync::watch;

/// Hands out [`Listener`]s and tells them when the service is going down.
#[derive(Debug)]
pub struct Notifier {
    tx: watch::Sender<bool>,
}

impl Notifier {
    pub fn new() -> Notifier {
        let (tx, _) = watch::channel(false);
        Notifier { tx }
    }

    /// Signals every listener that shutdown has begun. Safe to call more
    /// than once.
    pub fn notify(&self) {
        let _ = self.tx.send(true);
    }

    pub fn subscribe(&self) -> Listener {
        Listener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier::new()
    }
}

/// The per-task end of the shutdown signal. Checked at every suspension
/// point that may outlive the service.
#[derive(Debug, Clone)]
pub struct Listener {
    rx: watch::Receiver<bool>,
}

impl Listener {
    /// Returns true once shutdown has been signalled.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes when shutdown is signalled, immediately if it already was.
    pub async fn listen(&mut self) {
        if self.is_shutdown() {
            return;
        }
        // The sender lives as long as the Notifier; a dropped Notifier also
        // means the service is going away.
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_releases_listeners() {
        let notifier = Notifier::new();
        let mut listener = notifier.subscribe();
        assert!(!listener.is_shutdown());
        notifier.notify();
        listener.listen().await;
        assert!(listener.is_shutdown());
    }

    #[tokio::test]
    async fn listen_after_notify_returns_immediately() {
        let notifier = Notifier::new();
        notifier.notify();
        let mut listener = notifier.subscribe();
        listener.listen().await;
    }
}
