//! Socket lifecycle and readiness events.
//!
//! Observers subscribe through [`LocalSocket::subscribe`](crate::LocalSocket::subscribe)
//! and receive events over an unbounded tokio channel. Emission never blocks
//! the I/O path; receivers that have been dropped are pruned on the next emit.

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// An event emitted by a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// One value was moved into the inbound queue.
    ReadyRead,
    /// An outbound frame was fully written.
    BytesWritten,
    /// The socket closed. Emitted exactly once.
    Disconnected,
    /// An I/O or protocol failure. Emitted before the resulting close.
    Error(String),
}

/// Fan-out of events to every subscriber.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SocketEvent>>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<SocketEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: SocketEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
