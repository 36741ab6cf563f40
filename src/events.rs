// Event system for decoupled communication between chat and canvas components
//
// Topics are a closed enum and every payload is a variant of EventKind, so a
// subscriber can never receive a payload shape it did not ask for. Delivery is
// synchronous: publish() runs every current handler for the topic, in
// subscription order, before it returns. Publishing with no subscribers is a
// silent no-op.
//
// Handlers are snapshotted before they run and the registry lock is released,
// so a handler may publish or (un)subscribe without deadlocking.

use crate::artifacts::Artifact;
use crate::conversation::Message;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Named channels on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ArtifactsReceived,
    ToggleCanvas,
    CanvasStateChanged,
    NewConversation,
    ConversationSelected,
    MessageReceived,
}

impl Topic {
    /// Wire-style name of the topic, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Topic::ArtifactsReceived => "artifacts-received",
            Topic::ToggleCanvas => "toggle-canvas",
            Topic::CanvasStateChanged => "canvas-state-changed",
            Topic::NewConversation => "new-conversation",
            Topic::ConversationSelected => "conversation-selected",
            Topic::MessageReceived => "message-received",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payloads that can be sent through the event bus
#[derive(Debug, Clone)]
pub enum EventKind {
    /// A reply produced one or more artifacts
    ArtifactsReceived { artifacts: Vec<Artifact> },

    /// Flip the canvas between hidden and open
    ToggleCanvas,

    /// The canvas moved to or from hidden
    CanvasStateChanged { is_open: bool },

    /// Drop the transcript, the artifacts and close the canvas
    NewConversation,

    /// Load a different conversation into the chat
    ConversationSelected { conversation_id: i64 },

    /// An agent message was appended to the transcript
    MessageReceived { message: Message },
}

impl EventKind {
    pub fn topic(&self) -> Topic {
        match self {
            EventKind::ArtifactsReceived { .. } => Topic::ArtifactsReceived,
            EventKind::ToggleCanvas => Topic::ToggleCanvas,
            EventKind::CanvasStateChanged { .. } => Topic::CanvasStateChanged,
            EventKind::NewConversation => Topic::NewConversation,
            EventKind::ConversationSelected { .. } => Topic::ConversationSelected,
            EventKind::MessageReceived { .. } => Topic::MessageReceived,
        }
    }
}

/// Main event structure containing all information about an event
#[derive(Debug, Clone)]
pub struct Event {
    pub source: String,
    pub kind: EventKind,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl Event {
    /// Create a new event
    pub fn new(source: impl Into<String>, kind: EventKind) -> Self {
        Self {
            source: source.into(),
            kind,
            timestamp: chrono::Local::now(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.kind.topic()
    }
}

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Topic, Handler)>,
}

fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event bus for publishing and subscribing to events
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    /// Create a new, empty event bus
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Register a handler for one topic
    ///
    /// The handler stays registered until the returned Subscription is
    /// dropped or explicitly unsubscribed.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut registry = lock_registry(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, topic, Arc::new(handler)));
        tracing::debug!("Subscribed handler {} to {}", id, topic);

        Subscription {
            id,
            topic,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver an event to every current subscriber of its topic
    ///
    /// Returns the number of handlers that ran.
    pub fn publish(&self, event: Event) -> usize {
        let topic = event.topic();
        let handlers: Vec<Handler> = lock_registry(&self.registry)
            .handlers
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        if handlers.is_empty() {
            tracing::debug!("Dropping {} from {}: no subscribers", topic, event.source);
            return 0;
        }

        tracing::debug!(
            "Publishing {} from {} to {} subscriber(s)",
            topic,
            event.source,
            handlers.len()
        );
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    /// Shorthand for publish(Event::new(source, kind))
    pub fn emit(&self, source: &str, kind: EventKind) -> usize {
        self.publish(Event::new(source, kind))
    }

    /// Get the number of handlers registered for a topic
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        lock_registry(&self.registry)
            .handlers
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered handler; unsubscribes on drop
pub struct Subscription {
    id: u64,
    topic: Topic,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Remove the handler now
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Bus already gone: nothing left to detach from.
        if let Some(registry) = self.registry.upgrade() {
            lock_registry(&registry)
                .handlers
                .retain(|(id, _, _)| *id != self.id);
            tracing::debug!("Unsubscribed handler {} from {}", self.id, self.topic);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}
