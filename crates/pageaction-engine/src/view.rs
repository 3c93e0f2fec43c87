use pageaction_protocol::{MessageId, ViewMsg, ipc::ViewTx};
use tracing::{info, trace};

use crate::{Error, Result};

/// Stylesheet name for a theme.
pub fn stylesheet(theme: &str) -> String {
    format!("pageAction-{}.css", theme)
}

/// Sends render updates and transient dialogs to the view layer.
#[derive(Clone, Debug)]
pub struct ViewDispatcher {
    /// View channel.
    tx: ViewTx,
}

impl ViewDispatcher {
    /// Create a new dispatcher from a view message channel.
    pub fn new(tx: ViewTx) -> Self {
        Self { tx }
    }

    /// Send a raw view message.
    pub fn send(&self, msg: ViewMsg) -> Result<()> {
        self.tx.send(msg).map_err(|_| Error::ChannelClosed)
    }

    /// A domain group's counters or URLs changed.
    pub fn domain_updated(&self, domain: &str) -> Result<()> {
        self.send(ViewMsg::DomainUpdated {
            domain: domain.to_string(),
        })
    }

    /// A notification was filed.
    pub fn notification_filed(&self, domain: &str, message_id: &MessageId) -> Result<()> {
        trace!(domain, message_id = %message_id, "notification_filed");
        self.send(ViewMsg::NotificationFiled {
            domain: domain.to_string(),
            message_id: message_id.clone(),
        })
    }

    /// Apply the stylesheet for `theme`.
    pub fn theme(&self, theme: &str) -> Result<()> {
        self.send(ViewMsg::Theme(stylesheet(theme)))
    }

    /// Show an informational text to the user.
    pub fn alert(&self, text: String) -> Result<()> {
        info!(text = %text, "view_alert");
        self.send(ViewMsg::Alert(text))
    }

    /// Open the options page.
    pub fn open_options(&self) -> Result<()> {
        self.send(ViewMsg::OpenOptions)
    }

    /// Close the transient view.
    pub fn close(&self) -> Result<()> {
        self.send(ViewMsg::Close)
    }
}
