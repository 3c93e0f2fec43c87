//! Async driver for ingestion.
//!
//! The pipeline owns the only write path into the [`Table`](crate::Table). It listens for
//! transport messages, applies counter snapshots immediately, and drip-feeds
//! notification batches through the [`Ingestor`] on an interval, yielding to
//! the scheduler between chunks.

use std::sync::Arc;

use pageaction_protocol::{Inbound, Namespace, ipc::codec};
use serde_json::Value;
use settings::SettingsStore;
use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    FileOutcome, IngestConfig, Ingestor, Result, SharedTable, TickReport, view::ViewDispatcher,
};

/// Running totals for a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Ticks that processed a chunk.
    pub ticks: u64,
    /// Counter snapshots applied.
    pub counter_updates: usize,
    /// Notifications filed.
    pub filed: usize,
    /// Notifications dropped by the ignored-API filter.
    pub ignored: usize,
    /// Notifications skipped as malformed.
    pub malformed: usize,
    /// Notifications skipped as re-deliveries.
    pub duplicates: usize,
    /// Transport messages that could not be decoded.
    pub rejected: usize,
}

/// Single writer of the domain table.
pub struct IngestionPipeline {
    /// Transport key namespace.
    ns: Namespace,
    /// Cadence.
    cfg: IngestConfig,
    /// Table being fed.
    table: SharedTable,
    /// Source of the ignored-API set.
    settings: Arc<dyn SettingsStore>,
    /// Render notifications.
    view: ViewDispatcher,
    /// Pending batches.
    ingestor: Ingestor,
    /// Totals so far.
    stats: PipelineStats,
}

impl IngestionPipeline {
    /// Create a pipeline feeding `table`.
    pub fn new(
        ns: Namespace,
        cfg: IngestConfig,
        table: SharedTable,
        settings: Arc<dyn SettingsStore>,
        view: ViewDispatcher,
    ) -> Self {
        Self {
            ns,
            ingestor: Ingestor::new(cfg.chunk_size),
            cfg,
            table,
            settings,
            view,
            stats: PipelineStats::default(),
        }
    }

    /// Demultiplex one transport message.
    pub fn handle_message(&mut self, value: &Value) {
        match codec::decode_inbound(&self.ns, value) {
            Ok(messages) => {
                for msg in messages {
                    self.apply(msg);
                }
            }
            Err(e) => {
                warn!(error = %e, "message_rejected");
                self.stats.rejected += 1;
            }
        }
    }

    /// Apply one inbound message.
    pub fn apply(&mut self, msg: Inbound) {
        match msg {
            Inbound::Counter(update) => {
                if !update.skipped.is_empty() {
                    warn!(
                        domain = %update.domain,
                        keys = ?update.skipped,
                        "counter_values_skipped"
                    );
                }
                self.table.write().apply_counter(&update);
                self.stats.counter_updates += 1;
                debug!(domain = %update.domain, apis = update.counts.len(), "counter_update");
                self.notify(self.view.domain_updated(&update.domain));
            }
            Inbound::Notifications(items) => {
                info!(count = items.len(), "got notifications");
                self.ingestor.enqueue(items);
            }
        }
    }

    /// Process one chunk. Returns `None` when nothing is queued.
    pub fn tick(&mut self) -> Option<TickReport> {
        if self.ingestor.is_idle() {
            return None;
        }
        // Re-read per tick so a settings change mid-batch applies to later chunks.
        let ignored = self.settings.ignored_apis();
        let report = {
            let mut table = self.table.write();
            self.ingestor.tick(&mut table, &ignored)
        }?;
        self.stats.ticks += 1;
        self.stats.filed += report.filed.len();
        self.stats.ignored += report.ignored;
        self.stats.malformed += report.malformed;
        self.stats.duplicates += report.duplicates;
        for outcome in &report.filed {
            if let FileOutcome::Filed {
                domain,
                message_id,
                new_url,
            } = outcome
            {
                self.notify(self.view.notification_filed(domain, message_id));
                if *new_url {
                    self.notify(self.view.domain_updated(domain));
                }
            }
        }
        trace!(
            taken = report.taken,
            filed = report.filed.len(),
            remaining = report.remaining,
            "ingest_tick"
        );
        Some(report)
    }

    /// True when no batch is queued.
    pub fn is_idle(&self) -> bool {
        self.ingestor.is_idle()
    }

    /// Totals so far.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Read access to the table.
    pub fn table(&self) -> SharedTable {
        self.table.clone()
    }

    /// Log and drop view delivery failures; the table stays authoritative.
    fn notify(&self, sent: Result<()>) {
        if let Err(e) = sent {
            trace!(error = %e, "view_update_dropped");
        }
    }

    /// Drive the pipeline until `cancel` fires, or until the listener closes
    /// and every queued batch has been filed.
    pub async fn run(
        mut self,
        mut rx: UnboundedReceiver<Value>,
        cancel: CancellationToken,
    ) -> PipelineStats {
        let mut ticker = time::interval(self.cfg.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut listening = true;
        loop {
            if !listening && self.is_idle() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(pending = self.ingestor.pending(), "pipeline_cancelled");
                    break;
                }
                msg = rx.recv(), if listening => match msg {
                    Some(value) => self.handle_message(&value),
                    None => {
                        debug!("pipeline_listener_closed");
                        listening = false;
                    }
                },
                _ = ticker.tick(), if !self.is_idle() => {
                    self.tick();
                }
            }
        }
        debug!(stats = ?self.stats, "pipeline_done");
        self.stats
    }
}
