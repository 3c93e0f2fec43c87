use std::result::Result as StdResult;

use pageaction_protocol::{MessageId, TabId, ipc::codec};
use thiserror::Error;
use tokio::task::JoinError;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Fatal startup conditions. Any of these aborts the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartupError {
    /// The active-tab query returned nothing.
    #[error("noTabsFound")]
    NoTabsFound,
    /// The active-tab query was ambiguous.
    #[error("tooManyTabsFound: {0:?}")]
    TooManyTabsFound(Vec<TabId>),
}

/// One notification payload that could not be filed. Recovered by skipping.
#[derive(Debug, Error)]
#[error("malformed notification: {reason}")]
pub struct MalformedEvent {
    /// What was wrong with the payload.
    pub reason: String,
}

impl From<codec::Error> for MalformedEvent {
    fn from(e: codec::Error) -> Self {
        Self {
            reason: e.to_string(),
        }
    }
}

impl From<url::ParseError> for MalformedEvent {
    fn from(e: url::ParseError) -> Self {
        Self {
            reason: format!("bad url: {e}"),
        }
    }
}

/// Unified error type for the page action engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Session startup failed.
    #[error("startup failed: {0}")]
    Startup(#[from] StartupError),

    /// No action with this name exists in the registry.
    #[error("unknown {scope} action {name:?}")]
    UnknownAction {
        /// Registry the lookup ran against.
        scope: &'static str,
        /// Requested action name.
        name: String,
    },

    /// An action was registered with an empty or duplicate name.
    #[error("invalid {scope} action {name:?}: {reason}")]
    InvalidAction {
        /// Registry the action was added to.
        scope: &'static str,
        /// Offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An action targeted a domain with no group.
    #[error("unknown domain {0:?}")]
    UnknownDomain(String),

    /// An action targeted a notification that was never filed.
    #[error("unknown notification {0}")]
    UnknownNotification(MessageId),

    /// The settings or list store rejected a write.
    #[error("settings error: {0}")]
    Settings(#[from] settings::Error),

    /// The transport failed to deliver or query.
    #[error("transport error: {0}")]
    Transport(String),

    /// A background task panicked or was aborted.
    #[error("task failed: {0}")]
    Task(#[from] JoinError),

    /// The view channel has been closed by the receiver.
    #[error("view channel closed")]
    ChannelClosed,
}
