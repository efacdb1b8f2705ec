//! # gear_event - Notification Bus
//!
//! Typed publish/subscribe used between the transfer engine and whatever
//! draws the inventory:
//! - Events are queued on publish and delivered on `process`
//! - Handlers are keyed by event type
//! - Priority-ordered delivery
//! - Forwarding into a pull-style channel for views that poll

use std::any::{Any, TypeId};
use std::collections::BTreeMap;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Event priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// A queued event with its delivery metadata
struct EventEnvelope {
    type_id: TypeId,
    data: Box<dyn Any + Send + Sync>,
    priority: Priority,
    /// Publish order, used to keep delivery stable within a priority
    sequence: u64,
}

impl EventEnvelope {
    fn new<E: Event>(event: E, priority: Priority, sequence: u64) -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            data: Box::new(event),
            priority,
            sequence,
        }
    }
}

/// Trait for events
pub trait Event: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Event for T {}

/// Type-erased handler stored by the bus
pub type DynamicHandler = Box<dyn Fn(&dyn Any) + Send + Sync>;

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Event bus for publishing and subscribing to events
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    queue: Receiver<EventEnvelope>,
    handlers: BTreeMap<TypeId, Vec<(SubscriberId, Priority, DynamicHandler)>>,
    next_subscriber_id: u64,
    next_sequence: std::sync::atomic::AtomicU64,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, queue) = unbounded();
        Self {
            sender,
            queue,
            handlers: BTreeMap::new(),
            next_subscriber_id: 1,
            next_sequence: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) {
        self.publish_with_priority(event, Priority::Normal);
    }

    /// Publish an event with priority
    pub fn publish_with_priority<E: Event>(&self, event: E, priority: Priority) {
        let sequence = self
            .next_sequence
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        // The bus holds its own receiver, so the channel cannot be disconnected.
        let _ = self.sender.send(EventEnvelope::new(event, priority, sequence));
    }

    /// Subscribe to an event type
    pub fn subscribe<E: Event, F>(&mut self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_with_priority::<E, F>(handler, Priority::Normal)
    }

    /// Subscribe with priority
    pub fn subscribe_with_priority<E: Event, F>(
        &mut self,
        handler: F,
        priority: Priority,
    ) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber_id);
        self.next_subscriber_id += 1;

        let type_id = TypeId::of::<E>();
        let wrapped_handler: DynamicHandler = Box::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                handler(event);
            }
        });

        let handlers = self.handlers.entry(type_id).or_default();
        handlers.push((id, priority, wrapped_handler));
        // Stable sort keeps subscription order among equal priorities
        handlers.sort_by(|a, b| b.1.cmp(&a.1));

        id
    }

    /// Forward every event of type `E` into a channel the caller can poll.
    pub fn forward<E: Event + Clone>(&mut self) -> EventChannel<E> {
        let (tx, rx) = unbounded();
        self.subscribe_with_priority(
            move |event: &E| {
                let _ = tx.send(event.clone());
            },
            Priority::Critical,
        );
        EventChannel { receiver: rx }
    }

    /// Dispatch all pending events, returning how many were delivered.
    pub fn process(&mut self) -> usize {
        let mut events: Vec<EventEnvelope> = self.queue.try_iter().collect();

        events.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });

        let count = events.len();
        for envelope in events {
            if let Some(handlers) = self.handlers.get(&envelope.type_id) {
                for (_, _, handler) in handlers {
                    handler(envelope.data.as_ref());
                }
            }
        }

        count
    }

    /// Get pending event count
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Check if there are pending events
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of [`EventBus::forward`]
pub struct EventChannel<E: Event> {
    receiver: Receiver<E>,
}

impl<E: Event> EventChannel<E> {
    /// Drain all events
    pub fn drain(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Prelude
pub mod prelude {
    pub use crate::{Event, EventBus, EventChannel, Priority, SubscriberId};
}
