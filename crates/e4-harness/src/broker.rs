//! In-process publish/subscribe broker.
//!
//! Stands in for an MQTT-style broker in tests and the demo binary. Every
//! connection has a FIFO inbox; publishing appends the message to the inbox of
//! each connection subscribed to the exact topic. Nothing is retained: a
//! subscriber only sees messages published after it subscribed.

use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use e4_client::{Transport, TransportError};

/// Message waiting in a connection's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Topic it was published on
    pub topic: String,
    /// Payload as published
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct BrokerState {
    next_connection: u64,
    /// topic -> subscribed connections
    subscriptions: HashMap<String, BTreeSet<u64>>,
    /// Present while the connection is open
    inboxes: HashMap<u64, VecDeque<Delivery>>,
    published: u64,
}

/// Shared broker. Clones refer to the same broker.
#[derive(Clone, Default)]
pub struct LocalBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl LocalBroker {
    /// Empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection with an empty inbox.
    pub fn connect(&self) -> BrokerClient {
        let mut state = self.lock();
        let id = state.next_connection;
        state.next_connection += 1;
        state.inboxes.insert(id, VecDeque::new());

        tracing::trace!(connection = id, "broker connection opened");
        BrokerClient { id, broker: self.clone() }
    }

    /// Messages accepted so far.
    pub fn published_count(&self) -> u64 {
        self.lock().published
    }

    /// Open connections subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock().subscriptions.get(topic).map_or(0, BTreeSet::len)
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One connection to a [`LocalBroker`].
///
/// Implements [`Transport`] for publishing and subscribing; received messages
/// are pulled with [`poll`](Self::poll) or [`drain`](Self::drain).
#[derive(Clone)]
pub struct BrokerClient {
    id: u64,
    broker: LocalBroker,
}

impl BrokerClient {
    /// Next message in this connection's inbox.
    pub fn poll(&self) -> Option<Delivery> {
        self.broker.lock().inboxes.get_mut(&self.id).and_then(VecDeque::pop_front)
    }

    /// Every message currently in the inbox, oldest first.
    pub fn drain(&self) -> Vec<Delivery> {
        self.broker
            .lock()
            .inboxes
            .get_mut(&self.id)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of messages waiting.
    pub fn pending(&self) -> usize {
        self.broker.lock().inboxes.get(&self.id).map_or(0, VecDeque::len)
    }

    /// Close the connection. Queued messages are dropped and further calls
    /// fail with [`TransportError::Disconnected`].
    pub fn disconnect(&self) {
        let mut state = self.broker.lock();
        state.inboxes.remove(&self.id);
        for subscribers in state.subscriptions.values_mut() {
            subscribers.remove(&self.id);
        }

        tracing::trace!(connection = self.id, "broker connection closed");
    }

    fn ensure_connected(&self, state: &BrokerState) -> Result<(), TransportError> {
        if state.inboxes.contains_key(&self.id) {
            Ok(())
        } else {
            Err(TransportError::Disconnected(format!("connection {} is closed", self.id)))
        }
    }
}

impl Transport for BrokerClient {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        validate_topic(topic)?;

        let mut state = self.broker.lock();
        self.ensure_connected(&state)?;

        let subscribers: Vec<u64> =
            state.subscriptions.get(topic).map(|s| s.iter().copied().collect()).unwrap_or_default();

        for subscriber in &subscribers {
            if let Some(inbox) = state.inboxes.get_mut(subscriber) {
                inbox.push_back(Delivery { topic: topic.to_string(), payload: payload.to_vec() });
            }
        }
        state.published += 1;

        tracing::trace!(
            connection = self.id,
            topic,
            len = payload.len(),
            subscribers = subscribers.len(),
            "published"
        );
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        validate_topic(topic)?;

        let mut state = self.broker.lock();
        self.ensure_connected(&state)?;
        state.subscriptions.entry(topic.to_string()).or_default().insert(self.id);

        tracing::trace!(connection = self.id, topic, "subscribed");
        Ok(())
    }
}

/// Exact-match topics only: wildcards and empty names are refused.
fn validate_topic(topic: &str) -> Result<(), TransportError> {
    if topic.is_empty() || topic.contains(['+', '#', '\0']) {
        return Err(TransportError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn fifo_delivery_to_every_subscriber() {
        let broker = LocalBroker::new();
        let publisher = broker.connect();
        let first = broker.connect();
        let second = broker.connect();
        first.subscribe("/news").unwrap();
        second.subscribe("/news").unwrap();

        publisher.publish("/news", b"one").unwrap();
        publisher.publish("/news", b"two").unwrap();

        for client in [&first, &second] {
            let payloads: Vec<_> = client.drain().into_iter().map(|d| d.payload).collect();
            assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec()]);
        }
        assert_eq!(publisher.pending(), 0);
        assert_eq!(broker.published_count(), 2);
    }

    #[test]
    fn no_retained_messages() {
        let broker = LocalBroker::new();
        let publisher = broker.connect();
        publisher.publish("/late", b"missed").unwrap();

        let late = broker.connect();
        late.subscribe("/late").unwrap();
        assert_eq!(late.poll(), None);
    }

    #[test]
    fn topics_match_exactly() {
        let broker = LocalBroker::new();
        let client = broker.connect();
        client.subscribe("/a/b").unwrap();

        client.publish("/a", b"x").unwrap();
        client.publish("/a/b/c", b"x").unwrap();
        assert_eq!(client.pending(), 0);

        assert!(matches!(client.subscribe("/a/#"), Err(TransportError::InvalidTopic(_))));
        assert!(matches!(client.publish("", b"x"), Err(TransportError::InvalidTopic(_))));
    }

    #[test]
    fn disconnected_clients_are_refused() {
        let broker = LocalBroker::new();
        let client = broker.connect();
        client.subscribe("/t").unwrap();
        client.disconnect();

        assert_eq!(broker.subscriber_count("/t"), 0);
        assert!(matches!(client.publish("/t", b"x"), Err(TransportError::Disconnected(_))));
        assert!(matches!(client.subscribe("/t"), Err(TransportError::Disconnected(_))));
    }

    proptest! {
        #[test]
        fn each_subscriber_sees_its_topics_in_publish_order(
            publishes in prop::collection::vec((0usize..3, any::<u8>()), 0..64),
        ) {
            let topics = ["/a", "/b", "/c"];
            let broker = LocalBroker::new();
            let publisher = broker.connect();
            let only_a = broker.connect();
            let a_and_c = broker.connect();
            only_a.subscribe("/a").unwrap();
            a_and_c.subscribe("/a").unwrap();
            a_and_c.subscribe("/c").unwrap();

            for (topic, byte) in &publishes {
                publisher.publish(topics[*topic], &[*byte]).unwrap();
            }

            let expected = |wanted: &[usize]| -> Vec<Delivery> {
                publishes
                    .iter()
                    .filter(|(topic, _)| wanted.contains(topic))
                    .map(|(topic, byte)| Delivery {
                        topic: topics[*topic].to_string(),
                        payload: vec![*byte],
                    })
                    .collect()
            };
            prop_assert_eq!(only_a.drain(), expected(&[0]));
            prop_assert_eq!(a_and_c.drain(), expected(&[0, 2]));
            prop_assert_eq!(broker.published_count(), publishes.len() as u64);
        }
    }
}
