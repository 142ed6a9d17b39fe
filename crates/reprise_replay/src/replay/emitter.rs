//! Replayer lifecycle notifications.

use reprise_core::Timestamp;

/// Notification emitted by the replayer.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplayerEvent {
    /// A full snapshot replaced the document content.
    FullSnapshotRebuilt { timestamp: Timestamp },
    Start,
    Pause,
    Resume,
    Finish,
    /// A recorded custom event was reached.
    CustomEvent {
        tag: String,
        payload: serde_json::Value,
    },
    /// Recorded page metadata changed the viewport.
    MetaChanged { href: String, width: u32, height: u32 },
}

/// Discriminant of [`ReplayerEvent`], used to filter subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplayerEventKind {
    FullSnapshotRebuilt,
    Start,
    Pause,
    Resume,
    Finish,
    CustomEvent,
    MetaChanged,
}

impl ReplayerEvent {
    pub fn kind(&self) -> ReplayerEventKind {
        match self {
            Self::FullSnapshotRebuilt { .. } => ReplayerEventKind::FullSnapshotRebuilt,
            Self::Start => ReplayerEventKind::Start,
            Self::Pause => ReplayerEventKind::Pause,
            Self::Resume => ReplayerEventKind::Resume,
            Self::Finish => ReplayerEventKind::Finish,
            Self::CustomEvent { .. } => ReplayerEventKind::CustomEvent,
            Self::MetaChanged { .. } => ReplayerEventKind::MetaChanged,
        }
    }
}

/// Replayer event handler function type
pub type ReplayerEventHandler = Box<dyn FnMut(&ReplayerEvent)>;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Subscription {
    id: HandlerId,
    kind: Option<ReplayerEventKind>,
    handler: ReplayerEventHandler,
}

/// Dispatches replayer events to registered handlers, in registration order.
#[derive(Default)]
pub struct Emitter {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one kind of event, or every event with `None`.
    pub fn subscribe<F>(&mut self, kind: Option<ReplayerEventKind>, handler: F) -> HandlerId
    where
        F: FnMut(&ReplayerEvent) + 'static,
    {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Returns false if the handler was not registered.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn emit(&mut self, event: ReplayerEvent) {
        let kind = event.kind();
        for subscription in &mut self.subscriptions {
            if subscription.kind.map_or(true, |k| k == kind) {
                (subscription.handler)(&event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
