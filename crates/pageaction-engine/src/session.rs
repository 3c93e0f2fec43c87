//! One page action session: startup handshake, ingestion, and action dispatch.
//!
//! Startup waits for the active-tab query and the settings load together. The
//! tab count is checked before anything else happens, so a failed startup
//! never attaches the message listener and never sends the request.

use std::{result::Result as StdResult, sync::Arc};

use pageaction_protocol::{MessageId, Namespace, Outbound, TabId, ipc::codec};
use settings::{SettingChange, SettingsStore, keys};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    ActionContext, Actions, Error, IngestConfig, IngestionPipeline, PipelineStats, Result,
    Services, SharedTable, StartupError, Table, Transport, actions::default_actions,
    view::ViewDispatcher,
};

/// Session parameters.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Transport key namespace.
    pub namespace: Namespace,
    /// Ingestion cadence.
    pub ingest: IngestConfig,
}

/// What an action is invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
    /// The page action itself.
    Global,
    /// A domain group, by domain key.
    Domain(String),
    /// A filed notification.
    Notification(MessageId),
}

/// A running page action session. Dropping it stops its background tasks.
pub struct Session {
    /// The single monitored tab.
    tab: TabId,
    /// Domain table fed by the pipeline.
    table: SharedTable,
    /// Registered actions.
    actions: Arc<Actions>,
    /// Stops the pipeline and the theme watcher.
    cancel: CancellationToken,
    /// Ingestion driver, until joined.
    pipeline: Option<JoinHandle<PipelineStats>>,
    /// Theme change watcher, until joined.
    theme: Option<JoinHandle<()>>,
    /// Totals reported by the finished pipeline.
    stats: PipelineStats,
}

/// Require exactly one active tab.
fn single_tab(tabs: Vec<TabId>) -> StdResult<TabId, StartupError> {
    match tabs.len() {
        0 => Err(StartupError::NoTabsFound),
        1 => Ok(tabs[0]),
        _ => Err(StartupError::TooManyTabsFound(tabs)),
    }
}

impl Session {
    /// Run the startup handshake and begin ingesting.
    pub async fn start(
        transport: Arc<dyn Transport>,
        services: Services,
        cfg: SessionConfig,
    ) -> Result<Self> {
        let (tabs, ()) = tokio::join!(transport.active_tabs(), services.settings.loaded());
        let tab = match single_tab(tabs?) {
            Ok(tab) => tab,
            Err(e) => {
                error!(error = %e, "startup_failed");
                return Err(e.into());
            }
        };
        let actions = Arc::new(default_actions(&services)?);
        let cancel = CancellationToken::new();

        let changes = services.settings.subscribe();
        if let Err(e) = services.view.theme(&services.settings.theme()) {
            warn!(error = %e, "theme_not_applied");
        }
        let theme = tokio::spawn(watch_theme(
            services.settings.clone(),
            services.view.clone(),
            changes,
            cancel.child_token(),
        ));

        let table = Table::shared();
        let rx = transport.listen();
        let pipeline = IngestionPipeline::new(
            cfg.namespace.clone(),
            cfg.ingest,
            table.clone(),
            services.settings.clone(),
            services.view.clone(),
        );
        let pipeline = tokio::spawn(pipeline.run(rx, cancel.clone()));

        let session = Self {
            tab,
            table,
            actions,
            cancel,
            pipeline: Some(pipeline),
            theme: Some(theme),
            stats: PipelineStats::default(),
        };
        info!(tab = %tab, "request notifications from tab");
        let request = codec::encode_outbound(&cfg.namespace, &Outbound::SendNotifications(tab));
        if let Err(e) = transport.send_message(tab, request).await {
            session.close();
            return Err(e);
        }
        info!("waiting for notifications");
        Ok(session)
    }

    /// The monitored tab.
    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Shared handle to the domain table. Readers only.
    pub fn table(&self) -> SharedTable {
        self.table.clone()
    }

    /// Registered actions, for rendering button rows.
    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Build the context for `target` from the current table.
    fn context_for(&self, target: ActionTarget) -> Result<ActionContext> {
        let table = self.table.read();
        match target {
            ActionTarget::Global => Ok(ActionContext::Global),
            ActionTarget::Domain(domain) => match table.domain_context(&domain) {
                Some(ctx) => Ok(ActionContext::Domain(ctx)),
                None => Err(Error::UnknownDomain(domain)),
            },
            ActionTarget::Notification(id) => match table.notification_context(&id) {
                Some(ctx) => Ok(ActionContext::Notification(ctx)),
                None => Err(Error::UnknownNotification(id)),
            },
        }
    }

    /// Run the action called `name` on `target`.
    pub async fn invoke(&self, name: &str, target: ActionTarget) -> Result<()> {
        let ctx = self.context_for(target)?;
        self.actions.invoke(name, ctx).await
    }

    /// Stop ingesting. Queued batches are dropped.
    pub fn close(&self) {
        debug!(tab = %self.tab, "session_close");
        self.cancel.cancel();
    }

    /// Wait for the pipeline to finish, then stop the theme watcher.
    ///
    /// The pipeline finishes when the session is closed, or when the transport
    /// hangs up and every queued batch has been filed. The table and the
    /// actions stay usable afterwards; joining again returns the same totals.
    pub async fn join(&mut self) -> Result<PipelineStats> {
        if let Some(pipeline) = self.pipeline.take() {
            self.stats = pipeline.await?;
        }
        self.cancel.cancel();
        if let Some(theme) = self.theme.take() {
            theme.await?;
        }
        Ok(self.stats.clone())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Re-send the stylesheet whenever the theme changes.
async fn watch_theme(
    settings: Arc<dyn SettingsStore>,
    view: ViewDispatcher,
    mut changes: broadcast::Receiver<SettingChange>,
    cancel: CancellationToken,
) {
    loop {
        let refresh = tokio::select! {
            _ = cancel.cancelled() => break,
            change = changes.recv() => match change {
                Ok(change) => change.key == keys::THEME,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "theme_watch_lagged");
                    true
                }
                Err(RecvError::Closed) => break,
            },
        };
        if refresh {
            let theme = settings.theme();
            debug!(theme = %theme, "theme_changed");
            if view.theme(&theme).is_err() {
                break;
            }
        }
    }
}
