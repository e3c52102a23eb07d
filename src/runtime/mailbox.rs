//! The bounded queue every producer writes into and the event loop drains.

use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::message::Message;

/// Default mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 10;

/// Cloneable sending half of the mailbox.
///
/// Sends wait for room when the mailbox is full. That wait is the runtime's
/// only backpressure.
pub struct Mailbox<M> {
    tx: mpsc::Sender<Message<M>>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Creates a mailbox and the receiver the event loop owns.
pub(crate) fn channel<M>(capacity: usize) -> (Mailbox<M>, mpsc::Receiver<Message<M>>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Mailbox { tx }, rx)
}

impl<M: Send + 'static> Mailbox<M> {
    /// Queues `msg`. Returns false if the event loop is gone.
    pub async fn send(&self, msg: Message<M>) -> bool {
        if self.tx.send(msg).await.is_err() {
            debug!("Mailbox closed, message dropped");
            return false;
        }
        true
    }

    /// Queues `msg` unless `scope` trips first.
    ///
    /// Producers use this so a full mailbox cannot keep them alive after
    /// shutdown.
    pub async fn send_until(&self, msg: Message<M>, scope: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = scope.cancelled() => false,
            sent = self.send(msg) => sent,
        }
    }

    /// Asks the event loop to stop.
    pub async fn quit(&self) -> bool {
        self.send(Message::Quit).await
    }
}
