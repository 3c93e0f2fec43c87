use std::sync::Arc;

use settings::{ListStore, SettingsStore};

use crate::{Messages, Modal, view::ViewDispatcher};

/// Host capabilities shared by the actions and the pipeline.
#[derive(Clone)]
pub struct Services {
    /// Persistent settings.
    pub settings: Arc<dyn SettingsStore>,
    /// Append-only lists.
    pub lists: Arc<dyn ListStore>,
    /// Choice and prompt dialogs.
    pub modal: Arc<dyn Modal>,
    /// Localized strings.
    pub messages: Arc<dyn Messages>,
    /// Renderer channel.
    pub view: ViewDispatcher,
}
