//! Seams between the sync engine and the outside world.
//!
//! A [`ReadingSource`] answers pull requests (latest reading, recent
//! history). A [`PushChannel`] hands out [`Subscription`]s that deliver
//! insertion events as messages on a single-consumer queue.

use async_trait::async_trait;
use gasmon_types::{Reading, ReadingEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Pull side of the reading store.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// The most recent reading, or `None` if the store is empty.
    async fn fetch_latest(&self) -> Result<Option<Reading>>;

    /// Up to `limit` most recent readings, newest first.
    async fn fetch_history(&self, limit: u32) -> Result<Vec<Reading>>;
}

/// Push side of the reading store.
pub trait PushChannel: Send + Sync {
    /// Register for insertion events.
    ///
    /// Must be called from within a Tokio runtime. Events stop flowing once
    /// the returned [`Subscription`] is cancelled or dropped.
    fn subscribe(&self) -> Subscription;
}

/// Receiving end of a push registration.
///
/// Dropping the subscription cancels it.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<ReadingEvent>,
    cancel_token: CancellationToken,
}

/// Producer half of a [`Subscription`], held by the push transport.
#[derive(Debug, Clone)]
pub struct PushSender {
    sender: mpsc::Sender<ReadingEvent>,
    cancel_token: CancellationToken,
}

impl Subscription {
    /// Create a linked sender/subscription pair with the given queue depth.
    pub fn channel(buffer: usize) -> (PushSender, Subscription) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let cancel_token = CancellationToken::new();
        (
            PushSender {
                sender,
                cancel_token: cancel_token.clone(),
            },
            Subscription {
                receiver,
                cancel_token,
            },
        )
    }

    /// Next event, or `None` once the transport has shut down.
    pub async fn recv(&mut self) -> Option<ReadingEvent> {
        self.receiver.recv().await
    }

    /// Stop the subscription. Already-queued events are discarded.
    pub fn cancel(&mut self) {
        self.cancel_token.cancel();
        self.receiver.close();
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl PushSender {
    /// Deliver an event. Returns `false` once the subscriber is gone.
    pub async fn send(&self, event: ReadingEvent) -> bool {
        tokio::select! {
            _ = self.cancel_token.cancelled() => false,
            sent = self.sender.send(event) => sent.is_ok(),
        }
    }

    /// Resolves when the subscriber cancels or drops its subscription.
    pub async fn cancelled(&self) {
        self.cancel_token.cancelled().await;
    }

    /// Whether the subscriber is gone.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled() || self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::reading;

    #[tokio::test]
    async fn test_events_flow_until_cancelled() {
        let (sender, mut subscription) = Subscription::channel(4);
        let event = ReadingEvent::Inserted {
            reading: reading("a", 10.0, time::OffsetDateTime::UNIX_EPOCH),
        };

        assert!(sender.send(event.clone()).await);
        assert_eq!(subscription.recv().await, Some(event.clone()));

        subscription.cancel();
        assert!(subscription.is_cancelled());
        assert!(sender.is_cancelled());
        assert!(!sender.send(event).await);
    }

    #[tokio::test]
    async fn test_drop_cancels_sender() {
        let (sender, subscription) = Subscription::channel(1);
        drop(subscription);

        // Must resolve rather than hang
        sender.cancelled().await;
        assert!(sender.is_cancelled());
    }

    #[tokio::test]
    async fn test_recv_ends_when_sender_dropped() {
        let (sender, mut subscription) = Subscription::channel(1);
        drop(sender);
        assert_eq!(subscription.recv().await, None);
    }
}
