use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use topic_types::{ParticipantId, TopicId};

use crate::error::{FabricError, Result};
use crate::event::DepositEvent;

/// Filter for subscribing to a subset of deposit events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events for these topics are delivered.
    pub topics: Option<Vec<TopicId>>,
    /// If set, only deposits made by these participants are delivered.
    pub participants: Option<Vec<ParticipantId>>,
    /// If set, only deposits on these outcome indices are delivered.
    pub outcomes: Option<Vec<usize>>,
}

impl EventFilter {
    /// Filter that only passes events for a single topic.
    pub fn topic(topic: TopicId) -> Self {
        Self {
            topics: Some(vec![topic]),
            ..Default::default()
        }
    }

    /// Returns `true` if the given event matches this filter.
    pub fn matches(&self, event: &DepositEvent) -> bool {
        if let Some(ref topics) = self.topics {
            if !topics.contains(&event.topic) {
                return false;
            }
        }
        if let Some(ref participants) = self.participants {
            if !participants.contains(&event.participant) {
                return false;
            }
        }
        if let Some(ref outcomes) = self.outcomes {
            if !outcomes.contains(&event.accepted.outcome_index) {
                return false;
            }
        }
        true
    }
}

/// Receiving half of a subscription.
pub struct EventStream {
    receiver: broadcast::Receiver<DepositEvent>,
}

impl EventStream {
    /// Take the next buffered event without waiting.
    ///
    /// Returns `Ok(None)` when nothing is buffered.
    pub fn try_next(&mut self) -> Result<Option<DepositEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                Err(FabricError::Lagged { missed })
            }
            Err(broadcast::error::TryRecvError::Closed) => Err(FabricError::SubscriberClosed),
        }
    }

    /// Wait for the next event.
    pub async fn next(&mut self) -> Result<DepositEvent> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Lagged(missed) => FabricError::Lagged { missed },
            broadcast::error::RecvError::Closed => FabricError::SubscriberClosed,
        })
    }

    /// Collect every event currently buffered, skipping over lag gaps.
    pub fn drain(&mut self) -> Vec<DepositEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_next() {
                Ok(Some(event)) => events.push(event),
                Err(FabricError::Lagged { .. }) => continue,
                Ok(None) | Err(FabricError::SubscriberClosed) => break,
            }
        }
        events
    }
}

/// Internal subscriber: a filter paired with a broadcast sender.
struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<DepositEvent>,
}

/// Fan-out router that delivers events to matching subscribers.
struct EventRouter {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventRouter {
    fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn subscribe(&self, filter: EventFilter, capacity: usize) -> EventStream {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { filter, sender });
        EventStream { receiver }
    }

    /// Route an event to all matching subscribers, returning the number of
    /// subscribers it was delivered to. Closed subscribers are pruned.
    fn route(&self, event: &DepositEvent) -> usize {
        let mut delivered = 0;
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subs.retain(|sub| {
            if sub.filter.matches(event) {
                let sent = sub.sender.send(event.clone()).is_ok();
                if sent {
                    delivered += 1;
                }
                sent
            } else {
                sub.sender.receiver_count() > 0
            }
        });
        delivered
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Configuration for the [`EventFabric`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Capacity of per-subscriber broadcast channels.
    pub channel_capacity: usize,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// In-process publish/subscribe bus for deposit notifications.
///
/// Publishing never fails and never blocks on slow subscribers: a subscriber
/// that falls more than `channel_capacity` events behind observes
/// [`FabricError::Lagged`] on its stream instead.
pub struct EventFabric {
    router: EventRouter,
    config: FabricConfig,
    published: AtomicU64,
}

impl EventFabric {
    pub fn new(config: FabricConfig) -> Self {
        Self {
            router: EventRouter::new(),
            config,
            published: AtomicU64::new(0),
        }
    }

    /// Publish a committed deposit to all matching subscribers.
    pub fn publish(&self, event: &DepositEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let delivered = self.router.route(event);
        debug!(
            id = %event.id,
            topic = %event.topic,
            seq = event.seq,
            delivered,
            "deposit event published"
        );
        delivered
    }

    /// Subscribe to events matching the given filter.
    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        self.router.subscribe(filter, self.config.channel_capacity)
    }

    /// Current number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.router.subscriber_count()
    }

    /// Total number of events published since creation.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &FabricConfig {
        &self.config
    }
}

impl Default for EventFabric {
    fn default() -> Self {
        Self::new(FabricConfig::default())
    }
}
