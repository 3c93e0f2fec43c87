//! Chunked ingestion state machine.
//!
//! Batches queue in arrival order. Each [`Ingestor::tick`] files at most
//! `chunk_size` items from the front batch, so a driver that yields between
//! ticks never blocks its scheduler for long, however large a batch is.

use std::{
    collections::{HashSet, VecDeque},
    time::Duration,
};

use pageaction_protocol::RawNotification;
use serde_json::Value;
use tracing::{trace, warn};

use crate::{FileOutcome, MalformedEvent, NotificationEvent, Table};

/// Default number of items filed per tick.
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// Default delay between ticks.
pub const DEFAULT_TICK_MS: u64 = 1;

/// Ingestion cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// Items filed per tick.
    pub chunk_size: usize,
    /// Delay between ticks.
    pub tick: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Items consumed from the queue.
    pub taken: usize,
    /// Items filed, in order.
    pub filed: Vec<FileOutcome>,
    /// Items dropped by the ignored-API filter.
    pub ignored: usize,
    /// Items skipped because they could not be parsed.
    pub malformed: usize,
    /// Items skipped because their id was filed before.
    pub duplicates: usize,
    /// Items still queued after this tick.
    pub remaining: usize,
}

/// Queue of pending notification batches.
#[derive(Debug)]
pub struct Ingestor {
    /// Maximum items per tick.
    chunk_size: usize,
    /// Pending batches, oldest first.
    batches: VecDeque<VecDeque<Value>>,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Ingestor {
    /// Create an idle ingestor. A zero chunk size is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            batches: VecDeque::new(),
        }
    }

    /// Queue a batch behind any pending ones. Empty batches are ignored.
    pub fn enqueue(&mut self, items: Vec<Value>) {
        if !items.is_empty() {
            self.batches.push_back(items.into());
        }
    }

    /// True when nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total queued items.
    pub fn pending(&self) -> usize {
        self.batches.iter().map(VecDeque::len).sum()
    }

    /// File the next chunk of the front batch. Returns `None` when idle.
    pub fn tick(&mut self, table: &mut Table, ignored: &HashSet<String>) -> Option<TickReport> {
        let batch = self.batches.front_mut()?;
        let n = self.chunk_size.min(batch.len());
        let mut report = TickReport {
            taken: n,
            ..TickReport::default()
        };
        for value in batch.drain(..n) {
            ingest_one(value, table, ignored, &mut report);
        }
        if batch.is_empty() {
            self.batches.pop_front();
        }
        report.remaining = self.pending();
        Some(report)
    }
}

/// Parse, filter, and file one item.
fn ingest_one(value: Value, table: &mut Table, ignored: &HashSet<String>, report: &mut TickReport) {
    let raw = match RawNotification::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %MalformedEvent::from(e), "notification_skipped");
            report.malformed += 1;
            return;
        }
    };
    if ignored.contains(&raw.api) {
        trace!(api = %raw.api, "notification_ignored");
        report.ignored += 1;
        return;
    }
    let event = match NotificationEvent::from_raw(raw) {
        Ok(ev) => ev,
        Err(e) => {
            warn!(error = %e, "notification_skipped");
            report.malformed += 1;
            return;
        }
    };
    match table.file(event) {
        outcome @ FileOutcome::Filed { .. } => report.filed.push(outcome),
        FileOutcome::Duplicate(_) => report.duplicates += 1,
    }
}
