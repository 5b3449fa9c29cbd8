//! Bounded queue carrying decrypted messages to the consumer

use shared_protocol::Message;
use tokio::sync::mpsc;

use crate::{TransportError, TransportResult};

/// Session-side handle to the server's message queue.
///
/// Holds only a weak reference: once the server drops its sender on
/// shutdown, pushes fail with `QueueClosed` and the consumer sees the end of
/// the stream as soon as in-flight pushes complete.
#[derive(Clone)]
pub struct MessageQueue {
    tx: mpsc::WeakSender<Message>,
}

impl MessageQueue {
    pub fn new(sender: &mpsc::Sender<Message>) -> Self {
        Self {
            tx: sender.downgrade(),
        }
    }

    /// Enqueue a message, waiting while the queue is full
    pub async fn push(&self, message: Message) -> TransportResult<()> {
        let tx = self.tx.upgrade().ok_or(TransportError::QueueClosed)?;
        tx.send(message)
            .await
            .map_err(|_| TransportError::QueueClosed)
    }
}
