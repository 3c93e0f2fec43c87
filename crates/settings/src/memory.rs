//! In-memory settings store.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};
use tracing::debug;
use url::Url;

use crate::{PatternCache, Result, Scope, SettingChange, SettingsStore, keys};

/// Capacity of the change notification channel.
const CHANGE_CAPACITY: usize = 64;

/// One URL-scoped value.
struct ScopedEntry {
    /// Where the value applies.
    scope: Scope,
    /// Setting key.
    key: String,
    /// Stored value.
    value: Value,
}

/// Shared state behind [`MemorySettings`].
struct Inner {
    /// Global values.
    values: RwLock<HashMap<String, Value>>,
    /// Scoped values, most recently written last.
    scoped: RwLock<Vec<ScopedEntry>>,
    /// Readiness flag.
    loaded: watch::Sender<bool>,
    /// Change fan-out.
    changes: broadcast::Sender<SettingChange>,
    /// Compiled pattern scopes.
    patterns: PatternCache,
}

/// Settings held in memory. Cloning shares the same store.
#[derive(Clone)]
pub struct MemorySettings {
    /// Shared state.
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemorySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySettings").finish_non_exhaustive()
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Values used when nothing was stored for a key.
fn default_value(key: &str) -> Option<Value> {
    match key {
        keys::SHOW_NOTIFICATIONS => Some(json!(true)),
        keys::BLOCK_MODE => Some(json!("fake")),
        keys::THEME => Some(json!("default")),
        keys::IGNORED_APIS => Some(json!({})),
        _ => None,
    }
}

impl MemorySettings {
    /// Create an empty, not yet loaded store.
    pub fn new() -> Self {
        let (loaded, _) = watch::channel(false);
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                values: RwLock::new(HashMap::new()),
                scoped: RwLock::new(Vec::new()),
                loaded,
                changes,
                patterns: PatternCache::new(),
            }),
        }
    }

    /// Create a store from global values and mark it loaded.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let s = Self::new();
        {
            let mut map = s.inner.values.write();
            for (k, v) in values {
                map.insert(k.into(), v);
            }
        }
        s.mark_loaded();
        s
    }

    /// Signal readiness to everyone awaiting [`SettingsStore::loaded`].
    pub fn mark_loaded(&self) {
        self.inner.loaded.send_replace(true);
    }

    /// Whether the store has been marked loaded.
    pub fn is_loaded(&self) -> bool {
        *self.inner.loaded.borrow()
    }

    /// Insert a value without validation or notification. Used while loading.
    pub(crate) fn seed(&self, key: String, value: Value, scope: Option<Scope>) {
        match scope {
            None => {
                self.inner.values.write().insert(key, value);
            }
            Some(scope) => self.put_scoped(scope, key, value),
        }
    }

    /// Replace or append a scoped value.
    fn put_scoped(&self, scope: Scope, key: String, value: Value) {
        let mut scoped = self.inner.scoped.write();
        scoped.retain(|e| !(e.scope == scope && e.key == key));
        scoped.push(ScopedEntry { scope, key, value });
    }

    /// Value stored exactly under `scope`, without fallback.
    pub fn get_scoped(&self, key: &str, scope: &str) -> Option<Value> {
        let scope = Scope::parse(scope);
        self.inner
            .scoped
            .read()
            .iter()
            .find(|e| e.key == key && e.scope == scope)
            .map(|e| e.value.clone())
    }

    /// All scopes that carry a value for `key`, in write order.
    pub fn scopes_for(&self, key: &str) -> Vec<Scope> {
        self.inner
            .scoped
            .read()
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.scope.clone())
            .collect()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    fn get(&self, key: &str, url: Option<&Url>) -> Option<Value> {
        if let Some(url) = url {
            let scoped = self.inner.scoped.read();
            let hit = scoped
                .iter()
                .rev()
                .find(|e| e.key == key && e.scope.matches(url, &self.inner.patterns));
            if let Some(entry) = hit {
                return Some(entry.value.clone());
            }
        }
        self.inner
            .values
            .read()
            .get(key)
            .cloned()
            .or_else(|| default_value(key))
    }

    async fn set(&self, key: &str, value: Value, scope: Option<&str>) -> Result<()> {
        match scope {
            None => {
                self.inner.values.write().insert(key.to_string(), value);
            }
            Some(raw) => {
                let parsed = Scope::parse(raw);
                parsed.validate(&self.inner.patterns)?;
                self.put_scoped(parsed, key.to_string(), value);
            }
        }
        debug!(key, scope = ?scope, "setting_stored");
        // No subscribers is fine.
        let _ = self.inner.changes.send(SettingChange {
            key: key.to_string(),
            scope: scope.map(str::to_string),
        });
        Ok(())
    }

    async fn loaded(&self) {
        let mut rx = self.inner.loaded.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingChange> {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, time::Duration};

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn scoped_values_override_global() {
        let s = MemorySettings::with_values([("blockMode", json!("fake"))]);
        s.set(keys::BLOCK_MODE, json!("allow"), Some("example.com"))
            .await
            .unwrap();
        assert_eq!(
            s.get(keys::BLOCK_MODE, Some(&url("https://a.example.com/"))),
            Some(json!("allow"))
        );
        assert_eq!(
            s.get(keys::BLOCK_MODE, Some(&url("https://other.org/"))),
            Some(json!("fake"))
        );
        assert_eq!(s.get(keys::BLOCK_MODE, None), Some(json!("fake")));
    }

    #[tokio::test]
    async fn latest_matching_scope_wins() {
        let s = MemorySettings::with_values(Vec::<(String, Value)>::new());
        s.set(keys::SHOW_NOTIFICATIONS, json!(false), Some("example.com"))
            .await
            .unwrap();
        s.set(
            keys::SHOW_NOTIFICATIONS,
            json!(true),
            Some(r"^https://example\.com/keep$"),
        )
        .await
        .unwrap();
        assert!(s.show_notifications(Some(&url("https://example.com/keep"))));
        assert!(!s.show_notifications(Some(&url("https://example.com/other"))));
        assert_eq!(s.scopes_for(keys::SHOW_NOTIFICATIONS).len(), 2);
    }

    #[tokio::test]
    async fn invalid_pattern_is_rejected_and_not_stored() {
        let s = MemorySettings::new();
        let err = s
            .set(keys::BLOCK_MODE, json!("allow"), Some("^(bad$"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidPattern { .. }));
        assert!(s.scopes_for(keys::BLOCK_MODE).is_empty());
    }

    #[tokio::test]
    async fn set_broadcasts_changes() {
        let s = MemorySettings::new();
        let mut rx = s.subscribe();
        s.set(keys::THEME, json!("dark"), None).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, keys::THEME);
        assert_eq!(change.scope, None);
        assert_eq!(s.theme(), "dark");
    }

    #[tokio::test]
    async fn loaded_waits_for_mark() {
        let s = MemorySettings::new();
        let waiter = {
            let s = s.clone();
            tokio::spawn(async move { s.loaded().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());
        s.mark_loaded();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("loaded resolves")
            .unwrap();
    }

    #[test]
    fn ignored_apis_accepts_object_and_array() {
        let s = MemorySettings::with_values([(
            keys::IGNORED_APIS,
            json!({"a": true, "b": false, "c": 1}),
        )]);
        let want: HashSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(s.ignored_apis(), want);

        let s = MemorySettings::with_values([(keys::IGNORED_APIS, json!(["x", "y"]))]);
        assert_eq!(s.ignored_apis().len(), 2);
    }

    #[test]
    fn defaults_apply() {
        let s = MemorySettings::new();
        assert_eq!(s.theme(), "default");
        assert!(s.show_notifications(None));
        assert!(s.ignored_apis().is_empty());
    }
}
