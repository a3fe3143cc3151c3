//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  Publishing never blocks and never awaits, so the single-
//! threaded tick loop can notify from inside any component operation.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Access`] | Access-state changes and the one-time unlock notification |
//! | [`Topic::Scanning`] | Marker recenter notifications |
//! | [`Topic::Navigation`] | Floor changes and unreachable-route notices |

use tokio::sync::broadcast;
use tracing::{trace, warn};
use wayfind_types::Event;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// Routing lanes on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Geofence gate: state changes and the unlock notification.
    Access,
    /// Marker scanning: recenter notifications.
    Scanning,
    /// Navigation: floor changes, route availability.
    Navigation,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    access: broadcast::Sender<Event>,
    scanning: broadcast::Sender<Event>,
    navigation: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (access, _) = broadcast::channel(capacity);
        let (scanning, _) = broadcast::channel(capacity);
        let (navigation, _) = broadcast::channel(capacity);
        Self {
            access,
            scanning,
            navigation,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    /// Returns `0` when no subscribers are currently listening on the topic;
    /// that is a normal condition for a headless host, not an error.
    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        match self.topic_sender(topic).send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                trace!(?topic, source = %event.source, "no subscribers; notification dropped");
                0
            }
        }
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Access => &self.access,
            Topic::Scanning => &self.scanning,
            Topic::Navigation => &self.navigation,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Take the next buffered event without waiting.
    ///
    /// Returns `None` when nothing is buffered.  A lagged receiver skips the
    /// dropped events and returns the oldest one still retained.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every buffered event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
