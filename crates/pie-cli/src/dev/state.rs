//! Connection state for the live notification server.
//!
//! The server talks to at most one browser. [`ConnectionSlot`] holds that
//! connection's outbound sender; a new handshake replaces whatever was there.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Outbound side of one connected client.
#[derive(Debug)]
struct Connection {
    id: usize,
    tx: UnboundedSender<String>,
}

/// Single-connection slot shared between the socket handler and pushers.
///
/// Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSlot {
    current: Arc<Mutex<Option<Connection>>>,
    next_id: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `tx` the active connection, replacing any previous one.
    ///
    /// The previous sender is dropped, which makes its socket task send Close
    /// and end. Returns the new connection's id.
    pub fn replace(&self, tx: UnboundedSender<String>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.current.lock() = Some(Connection { id, tx });
        id
    }

    /// Clear the slot if connection `id` still holds it.
    ///
    /// Returns whether the slot was cleared. A connection that has already
    /// been replaced leaves its successor alone.
    pub fn clear_if(&self, id: usize) -> bool {
        let mut current = self.current.lock();
        if current.as_ref().map(|c| c.id) == Some(id) {
            *current = None;
            true
        } else {
            false
        }
    }

    /// Whether a connection is active.
    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map_or(false, |c| !c.tx.is_closed())
    }

    /// Id of the active connection.
    pub fn active_id(&self) -> Option<usize> {
        self.current.lock().as_ref().map(|c| c.id)
    }

    /// Push a frame to the active connection.
    ///
    /// Returns `false` when there is no connection or the send failed; a
    /// failed send also empties the slot.
    pub fn send(&self, payload: String) -> bool {
        let mut current = self.current.lock();
        let Some(connection) = current.as_ref() else {
            return false;
        };
        if connection.tx.send(payload).is_ok() {
            true
        } else {
            *current = None;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_send_without_connection_is_dropped() {
        let slot = ConnectionSlot::new();
        assert!(!slot.is_active());
        assert!(!slot.send("{}".to_string()));
    }

    #[test]
    fn test_replace_routes_to_newest() {
        let slot = ConnectionSlot::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let first = slot.replace(tx1);
        let second = slot.replace(tx2);
        assert_ne!(first, second);

        assert!(slot.send("hello".to_string()));
        assert_eq!(rx2.try_recv().unwrap(), "hello");
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_replace_drops_previous_sender() {
        let slot = ConnectionSlot::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel::<String>();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        slot.replace(tx1);
        slot.replace(tx2);

        // Sender gone: the old socket task sees the end of its channel
        assert!(matches!(
            rx1.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_clear_if_ignores_replaced_connection() {
        let slot = ConnectionSlot::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let old = slot.replace(tx1);
        let new = slot.replace(tx2);

        assert!(!slot.clear_if(old));
        assert_eq!(slot.active_id(), Some(new));
        assert!(slot.clear_if(new));
        assert!(!slot.is_active());
    }

    #[test]
    fn test_failed_send_clears_slot() {
        let slot = ConnectionSlot::new();
        let (tx, rx) = mpsc::unbounded_channel();
        slot.replace(tx);
        drop(rx);

        assert!(!slot.is_active());
        assert!(!slot.send("reload".to_string()));
        assert_eq!(slot.active_id(), None);
    }
}
