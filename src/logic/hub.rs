//! Subscriber Hub - best-effort fan-out of serialized payloads
//!
//! Each subscriber owns a bounded queue. `broadcast` never waits on a
//! subscriber: a full queue loses that message, a closed queue removes the
//! subscriber. Per-subscriber order is the broadcast order because every
//! queue is FIFO and only one broadcaster pushes at a time.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Channel identity of a hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Raw,
    Processed,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Raw => "raw",
            Topic::Processed => "processed",
        }
    }
}

/// Receiving end handed to a connection
pub struct Subscription {
    pub id: Uuid,
    pub rx: mpsc::Receiver<Arc<str>>,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Messages lost to full queues
    pub dropped: usize,
    /// Subscribers removed because their queue was closed
    pub removed: usize,
}

pub struct SubscriberHub {
    topic: Topic,
    buffer: usize,
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<Arc<str>>>>,
}

impl SubscriberHub {
    pub fn new(topic: Topic, buffer: usize) -> Self {
        Self {
            topic,
            buffer: buffer.max(1),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        let count = {
            let mut subscribers = self.subscribers.lock();
            subscribers.insert(id, tx);
            subscribers.len()
        };
        tracing::debug!(topic = self.topic.as_str(), %id, count, "Subscriber connected");
        Subscription { id, rx }
    }

    /// Remove a subscriber; unknown ids are ignored
    pub fn unsubscribe(&self, id: Uuid) {
        if self.subscribers.lock().remove(&id).is_some() {
            tracing::debug!(topic = self.topic.as_str(), %id, "Subscriber disconnected");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drop every subscriber, ending their streams
    pub fn close_all(&self) {
        self.subscribers.lock().clear();
    }

    /// Offer `payload` to every subscriber without waiting on any of them
    pub fn broadcast(&self, payload: impl Into<Arc<str>>) -> BroadcastReport {
        let payload: Arc<str> = payload.into();
        let mut report = BroadcastReport::default();

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|id, tx| match tx.try_send(Arc::clone(&payload)) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                report.dropped += 1;
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(topic = self.topic.as_str(), %id, "Removing closed subscriber");
                report.removed += 1;
                false
            }
        });

        report
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_subscriber_removed_others_still_served() {
        let hub = SubscriberHub::new(Topic::Raw, 8);
        let mut first = hub.subscribe();
        let second = hub.subscribe();
        let mut third = hub.subscribe();

        drop(second.rx);
        let report = hub.broadcast("event-1");

        assert_eq!(report, BroadcastReport { delivered: 2, dropped: 0, removed: 1 });
        assert_eq!(hub.subscriber_count(), 2);
        assert_eq!(&*first.rx.try_recv().unwrap(), "event-1");
        assert_eq!(&*third.rx.try_recv().unwrap(), "event-1");
    }

    #[test]
    fn test_slow_subscriber_loses_messages_but_stays() {
        let hub = SubscriberHub::new(Topic::Processed, 2);
        let mut slow = hub.subscribe();

        for i in 0..5 {
            hub.broadcast(format!("m{i}"));
        }

        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(&*slow.rx.try_recv().unwrap(), "m0");
        assert_eq!(&*slow.rx.try_recv().unwrap(), "m1");
        assert!(slow.rx.try_recv().is_err());

        hub.broadcast("m5");
        assert_eq!(&*slow.rx.try_recv().unwrap(), "m5");
    }

    #[test]
    fn test_per_subscriber_order_preserved() {
        let hub = SubscriberHub::new(Topic::Raw, 16);
        let mut sub = hub.subscribe();
        for i in 0..10 {
            hub.broadcast(i.to_string());
        }
        let received: Vec<String> = (0..10).map(|_| sub.rx.try_recv().unwrap().to_string()).collect();
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_unsubscribe_and_close_all() {
        let hub = SubscriberHub::new(Topic::Raw, 4);
        let a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.unsubscribe(a.id);
        hub.unsubscribe(a.id);
        assert_eq!(hub.subscriber_count(), 1);

        hub.close_all();
        assert_eq!(hub.subscriber_count(), 0);
        assert!(matches!(
            b.rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_subscribe_concurrently_with_broadcast() {
        let hub = Arc::new(SubscriberHub::new(Topic::Raw, 1024));

        let producer = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                for i in 0..200 {
                    hub.broadcast(i.to_string());
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut subs = Vec::new();
        for _ in 0..20 {
            subs.push(hub.subscribe());
            tokio::task::yield_now().await;
        }
        producer.await.unwrap();

        assert_eq!(hub.subscriber_count(), 20);
        for mut sub in subs {
            let mut last: Option<u32> = None;
            while let Ok(msg) = sub.rx.try_recv() {
                let n: u32 = msg.parse().unwrap();
                if let Some(prev) = last {
                    assert_eq!(n, prev + 1);
                }
                last = Some(n);
            }
        }
    }
}
