//! The domain table: domain groups plus the notification store.
//!
//! The ingestion pipeline is the only writer. Everything else reads through a
//! [`SharedTable`] lock, typically to render or to build an action context.

use std::{collections::BTreeMap, sync::Arc};

use pageaction_protocol::{CounterUpdate, MessageId};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    DomainActionContext, DomainGroup, NotificationActionContext, NotificationEvent,
    NotificationStore,
};

/// Table handle shared between the pipeline and readers.
pub type SharedTable = Arc<RwLock<Table>>;

/// Result of filing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The event was appended to `domain`.
    Filed {
        /// Group the event landed in.
        domain: String,
        /// Identity of the event.
        message_id: MessageId,
        /// True when the event introduced a new URL to the group.
        new_url: bool,
    },
    /// An event with the same id was filed earlier; nothing changed.
    Duplicate(MessageId),
}

/// Domain groups and the events filed under them.
#[derive(Debug, Default)]
pub struct Table {
    /// Groups by domain key.
    groups: BTreeMap<String, DomainGroup>,
    /// All filed events.
    store: NotificationStore,
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new table for sharing.
    pub fn shared() -> SharedTable {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Resolve the group for `domain`, creating it on first reference.
    pub fn group_mut(&mut self, domain: &str) -> &mut DomainGroup {
        self.groups
            .entry(domain.to_string())
            .or_insert_with(|| DomainGroup::new(domain))
    }

    /// Existing group for `domain`.
    pub fn group(&self, domain: &str) -> Option<&DomainGroup> {
        self.groups.get(domain)
    }

    /// All groups ordered by domain.
    pub fn groups(&self) -> impl Iterator<Item = &DomainGroup> {
        self.groups.values()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when no group exists.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Filed event by id.
    pub fn notification(&self, id: &MessageId) -> Option<&NotificationEvent> {
        self.store.get(id)
    }

    /// Events of `domain` in arrival order.
    pub fn notifications_of(&self, domain: &str) -> Vec<&NotificationEvent> {
        self.group(domain)
            .map(|g| {
                g.notifications()
                    .iter()
                    .filter_map(|id| self.store.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply an absolute counter snapshot.
    pub fn apply_counter(&mut self, update: &CounterUpdate) {
        let group = self.group_mut(&update.domain);
        for (api, &count) in &update.counts {
            let prev = group.set_counter(api, count);
            if let Some(prev) = prev
                && prev > count
            {
                warn!(domain = %update.domain, api = %api, prev, count, "counter_decreased");
            }
        }
    }

    /// File an event into its domain group unless its id was seen before.
    pub fn file(&mut self, event: NotificationEvent) -> FileOutcome {
        if self.store.contains(&event.message_id) {
            debug!(message_id = %event.message_id, "notification_duplicate");
            return FileOutcome::Duplicate(event.message_id);
        }
        let domain = event.domain();
        let message_id = event.message_id.clone();
        let new_url = self.group_mut(&domain).file_notification(&event);
        self.store.insert(event);
        FileOutcome::Filed {
            domain,
            message_id,
            new_url,
        }
    }

    /// Context handed to domain actions.
    pub fn domain_context(&self, domain: &str) -> Option<DomainActionContext> {
        self.group(domain).map(|g| DomainActionContext {
            domain: g.domain().to_string(),
            urls: g.urls().to_vec(),
        })
    }

    /// Context handed to notification actions.
    pub fn notification_context(&self, id: &MessageId) -> Option<NotificationActionContext> {
        self.store.get(id).map(|ev| NotificationActionContext {
            message_id: ev.message_id.clone(),
            api: ev.api.clone(),
            url: ev.url.clone(),
            error_stack: ev.error_stack.clone(),
        })
    }
}
