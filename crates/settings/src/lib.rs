//! Settings and list stores used by the page action.
//!
//! The page action treats persistent settings as an external capability. This
//! crate defines that capability ([`SettingsStore`], [`ListStore`]) together
//! with in-memory implementations used by the replay tool and the tests.
//!
//! Values can be global or scoped. A scope is either a domain, which matches
//! that host and its subdomains, or an anchored `^…$` regular expression,
//! which must match the whole URL.
#![warn(missing_docs)]

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use url::Url;

mod error;
mod lists;
mod loader;
mod memory;
mod pattern_cache;
mod scope;

pub use error::{Error, Result};
pub use lists::MemoryLists;
pub use memory::MemorySettings;
pub use pattern_cache::PatternCache;
pub use scope::Scope;

/// Well-known setting keys.
pub mod keys {
    /// Whether notifications are shown (bool, scopable).
    pub const SHOW_NOTIFICATIONS: &str = "showNotifications";
    /// Blocking mode such as `fake` or `allow` (string, scopable).
    pub const BLOCK_MODE: &str = "blockMode";
    /// Name of the active view theme (string).
    pub const THEME: &str = "theme";
    /// Ignored fingerprinting APIs (object of `api -> bool`, or array of names).
    pub const IGNORED_APIS: &str = "ignoredAPIs";
}

/// Name of the session-scoped allow list.
pub const SESSION_WHITELIST: &str = "sessionWhite";

/// A setting value changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingChange {
    /// Setting key.
    pub key: String,
    /// Scope the value was written under, `None` for the global value.
    pub scope: Option<String>,
}

/// Settings store capability.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Resolve the effective value for `key`, honoring scoped overrides that
    /// match `url`.
    fn get(&self, key: &str, url: Option<&Url>) -> Option<Value>;

    /// Store `value` for `key`, globally or under `scope`.
    async fn set(&self, key: &str, value: Value, scope: Option<&str>) -> Result<()>;

    /// Resolves once the initial settings have been loaded.
    async fn loaded(&self);

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SettingChange>;

    /// The set of APIs whose notifications are suppressed.
    fn ignored_apis(&self) -> HashSet<String> {
        match self.get(keys::IGNORED_APIS, None) {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter(|(_, v)| truthy(v))
                .map(|(k, _)| k)
                .collect(),
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => HashSet::new(),
        }
    }

    /// Active theme name.
    fn theme(&self) -> String {
        self.get(keys::THEME, None)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "default".to_string())
    }

    /// Whether notifications are shown for `url`.
    fn show_notifications(&self, url: Option<&Url>) -> bool {
        self.get(keys::SHOW_NOTIFICATIONS, url)
            .map(|v| truthy(&v))
            .unwrap_or(true)
    }
}

/// Append-only persisted list capability.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Append `value` to the list called `list`.
    async fn append_to(&self, list: &str, value: &str) -> Result<()>;
}

/// Loose truthiness for JSON settings values.
pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
