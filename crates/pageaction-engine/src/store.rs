use std::collections::HashMap;

use pageaction_protocol::MessageId;

use crate::NotificationEvent;

/// Filed notifications keyed by message id.
#[derive(Debug, Default, Clone)]
pub struct NotificationStore {
    /// Events by id.
    events: HashMap<MessageId, NotificationEvent>,
}

impl NotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an event. Returns false, leaving the store unchanged, when the id
    /// was already present.
    pub fn insert(&mut self, event: NotificationEvent) -> bool {
        if self.events.contains_key(&event.message_id) {
            return false;
        }
        self.events.insert(event.message_id.clone(), event);
        true
    }

    /// Look up an event.
    pub fn get(&self, id: &MessageId) -> Option<&NotificationEvent> {
        self.events.get(id)
    }

    /// True when `id` has been filed.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.events.contains_key(id)
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing has been filed.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
