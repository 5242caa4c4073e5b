use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::{EventSink, RuntimeError};
use crate::events::ShellEvent;

/// Event sink backed by an unbounded mpsc channel.
///
/// Every sender shares one queue, so the events of a single job arrive in
/// emission order.
pub struct ChannelRuntime {
    event_tx: RwLock<mpsc::UnboundedSender<ShellEvent>>,
}

impl ChannelRuntime {
    pub fn new(event_tx: mpsc::UnboundedSender<ShellEvent>) -> Self {
        Self {
            event_tx: RwLock::new(event_tx),
        }
    }

    /// Create a runtime together with the receiver the host should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ShellEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Replace the event sender (used when the host restarts its event loop)
    pub fn replace_event_tx(&self, new_tx: mpsc::UnboundedSender<ShellEvent>) {
        *self.event_tx.write() = new_tx;
    }
}

impl EventSink for ChannelRuntime {
    fn emit(&self, event: ShellEvent) -> Result<(), RuntimeError> {
        self.event_tx
            .read()
            .send(event)
            .map_err(|_| RuntimeError::ReceiverClosed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_delivers_in_order() {
        let (runtime, mut rx) = ChannelRuntime::channel();
        runtime
            .emit(ShellEvent::Finish {
                job_id: "a_000001".into(),
            })
            .unwrap();
        runtime.emit(ShellEvent::Reloaded).unwrap();

        assert!(matches!(rx.recv().await, Some(ShellEvent::Finish { .. })));
        assert!(matches!(rx.recv().await, Some(ShellEvent::Reloaded)));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (runtime, rx) = ChannelRuntime::channel();
        drop(rx);
        let err = runtime.emit(ShellEvent::Reloaded).unwrap_err();
        assert!(matches!(err, RuntimeError::ReceiverClosed));
    }

    #[tokio::test]
    async fn test_replace_event_tx() {
        let (runtime, _old_rx) = ChannelRuntime::channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        runtime.replace_event_tx(tx);
        runtime.emit(ShellEvent::Reloaded).unwrap();
        assert!(matches!(rx.recv().await, Some(ShellEvent::Reloaded)));
    }
}
