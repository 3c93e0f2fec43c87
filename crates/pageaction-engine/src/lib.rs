//! Page Action Engine
//!
//! The engine turns fingerprinting notifications streamed from one browser
//! tab into per-domain groups, and binds the user actions offered on them:
//! - startup handshake with the single active tab ([`Session::start`])
//! - chunked, cooperative ingestion of notification batches
//!   ([`IngestionPipeline`], [`Ingestor`])
//! - per-domain counters, URLs, and filed notifications ([`Table`])
//! - ordered action registries per context ([`Actions`])
//! - the "domain or URL pattern?" disambiguation dialog ([`disambiguate`])
//!
//! Host capabilities (transport, settings, modal dialogs, localized strings)
//! are traits; [`test_support`] provides in-process doubles.
mod actions;
mod caps;
pub mod disambiguate;
mod domain;
mod error;
mod event;
mod ingest;
mod pipeline;
mod registry;
mod services;
mod session;
mod stack;
mod store;
mod table;
pub mod test_support;
mod view;

pub use actions::{
    default_actions, register_domain_actions, register_global_actions,
    register_notification_actions,
};
pub use caps::{Choice, DefaultMessages, Messages, Modal, Transport};
pub use domain::DomainGroup;
pub use error::{Error, MalformedEvent, Result, StartupError};
pub use event::{NotificationEvent, domain_of};
pub use ingest::{DEFAULT_CHUNK_SIZE, DEFAULT_TICK_MS, IngestConfig, Ingestor, TickReport};
pub use pipeline::{IngestionPipeline, PipelineStats};
pub use registry::{
    Action, ActionContext, ActionEntry, ActionFuture, ActionRegistry, Actions,
    DomainActionContext, GlobalActionContext, NotificationActionContext,
};
pub use services::Services;
pub use session::{ActionTarget, Session, SessionConfig};
pub use stack::{CallingStack, StackEntry, StackFrame, parse_error_stack};
pub use store::NotificationStore;
pub use table::{FileOutcome, SharedTable, Table};
pub use view::{ViewDispatcher, stylesheet};
