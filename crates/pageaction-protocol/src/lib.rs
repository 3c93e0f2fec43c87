//! Shared message types for the page action.
//!
//! Three families of messages live here:
//! - inbound transport messages from the monitored tab ([`Inbound`])
//! - the single outbound request sent to that tab ([`Outbound`])
//! - view updates consumed by the renderer ([`ViewMsg`])
#![warn(missing_docs)]

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

mod inbound;

pub use inbound::{CounterUpdate, Inbound, RawNotification};

/// Default transport namespace used as the key prefix.
pub const DEFAULT_NAMESPACE: &str = "canvasBlocker";

/// Key prefix shared by every transport message of one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(String);

impl Default for Namespace {
    fn default() -> Self {
        Self(DEFAULT_NAMESPACE.to_string())
    }
}

impl Namespace {
    /// Create a namespace from a prefix such as `canvasBlocker`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// The bare prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key carrying counter snapshots: `<ns>-notificationCounter`.
    pub fn counter_key(&self) -> String {
        format!("{}-notificationCounter", self.0)
    }

    /// Key carrying notification batches: `<ns>-notifications`.
    pub fn notifications_key(&self) -> String {
        format!("{}-notifications", self.0)
    }

    /// Key of the startup request: `<ns>-sendNotifications`.
    pub fn send_notifications_key(&self) -> String {
        format!("{}-sendNotifications", self.0)
    }
}

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque notification identifier. The transport may send strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        /// Accepted wire representations.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            /// String identifier.
            Str(String),
            /// Signed integer identifier.
            Int(i64),
            /// Unsigned integer identifier.
            Uint(u64),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Str(s) => Self(s),
            Repr::Int(n) => Self(n.to_string()),
            Repr::Uint(n) => Self(n.to_string()),
        })
    }
}

/// Messages sent from the page action to the monitored tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Ask the tab to emit its buffered notifications.
    SendNotifications(TabId),
}

/// IPC-related helpers: channel aliases and message codec.
pub mod ipc {
    use super::ViewMsg;

    /// Tokio unbounded sender for view messages.
    pub type ViewTx = tokio::sync::mpsc::UnboundedSender<ViewMsg>;
    /// Tokio unbounded receiver for view messages.
    pub type ViewRx = tokio::sync::mpsc::UnboundedReceiver<ViewMsg>;

    /// Create a standard unbounded view channel (sender, receiver).
    pub fn view_channel() -> (ViewTx, ViewRx) {
        tokio::sync::mpsc::unbounded_channel::<ViewMsg>()
    }

    /// JSON codec for transport messages.
    pub mod codec;
}

/// Messages sent from the core to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMsg {
    /// Counters or URLs of a domain group changed.
    DomainUpdated {
        /// Domain key of the group.
        domain: String,
    },

    /// A notification was filed into a domain group.
    NotificationFiled {
        /// Domain key of the group.
        domain: String,
        /// Identifier of the filed notification.
        message_id: MessageId,
    },

    /// Stylesheet to apply, e.g. `pageAction-dark.css`.
    Theme(String),

    /// Show a blocking informational text.
    Alert(String),

    /// Open the extension options page.
    OpenOptions,

    /// Close the transient view.
    Close,

    /// Forwarded log line.
    Log {
        /// Level name such as `INFO`.
        level: String,
        /// Emitting module path.
        target: String,
        /// Rendered message and fields.
        message: String,
    },
}
