use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::{ListStore, Result};

/// Append-only named lists held in memory. A value already in a list is not
/// appended again.
#[derive(Clone, Default)]
pub struct MemoryLists {
    /// List name to entries in append order.
    lists: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl MemoryLists {
    /// Create an empty list store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entries in `list`.
    pub fn entries(&self, list: &str) -> Vec<String> {
        self.lists.lock().get(list).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ListStore for MemoryLists {
    async fn append_to(&self, list: &str, value: &str) -> Result<()> {
        let mut lists = self.lists.lock();
        let entries = lists.entry(list.to_string()).or_default();
        if entries.iter().any(|e| e == value) {
            debug!(list, value, "list_append_present");
        } else {
            entries.push(value.to_string());
            debug!(list, value, "list_append");
        }
        Ok(())
    }
}
