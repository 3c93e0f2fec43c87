//! Capabilities the core consumes from its host.

use async_trait::async_trait;
use pageaction_protocol::TabId;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::Result;

// ---- Browser transport ----

/// Tab query and runtime messaging.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Active tabs in the current window.
    async fn active_tabs(&self) -> Result<Vec<TabId>>;

    /// Attach the runtime message listener. Each received message is one
    /// JSON object.
    fn listen(&self) -> UnboundedReceiver<Value>;

    /// Send `message` to `tab`.
    async fn send_message(&self, tab: TabId, message: Value) -> Result<()>;
}

// ---- Modal dialogs ----

/// One entry of a modal choice list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Label shown to the user.
    pub text: String,
    /// Value returned when picked.
    pub value: String,
}

impl Choice {
    /// Entry whose label is its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            text: value.clone(),
            value,
        }
    }
}

/// Modal choice and prompt dialogs. `None` means the user dismissed the dialog.
#[async_trait]
pub trait Modal: Send + Sync {
    /// Let the user pick one of `options`; returns its value.
    async fn choice(&self, text: &str, options: &[Choice]) -> Option<String>;

    /// Let the user edit `prefill`; returns the submitted text.
    async fn prompt(&self, text: &str, prefill: &str) -> Option<String>;
}

// ---- Localized strings ----

/// Localized message lookup.
pub trait Messages: Send + Sync {
    /// Text for `key`.
    fn get(&self, key: &str) -> String;
}

/// Built-in English catalog. Unknown keys render as themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl Messages for DefaultMessages {
    fn get(&self, key: &str) -> String {
        let text = match key {
            "selectIgnore" => "Select what to ignore:",
            "inputIgnoreURL" => "Edit the URL pattern to ignore:",
            "selectWhitelist" => "Select what to whitelist:",
            "inputWhitelistURL" => "Edit the URL pattern to whitelist:",
            "selectSessionWhitelist" => "Select what to whitelist for this session:",
            "inputSessionWhitelistURL" => "Edit the URL pattern to whitelist for this session:",
            "showOptions" => "Options",
            "disableNotifications" => "Disable notifications",
            "ignorelist" => "Ignore",
            "whitelist" => "Whitelist",
            "whitelistTemporarily" => "Whitelist temporarily",
            "displayFullURL" => "Show full URL",
            "displayCallingStack" => "Show calling stack",
            other => other,
        };
        text.to_string()
    }
}
