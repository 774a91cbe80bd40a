//! Run Metrics
//!
//! In-process counters and phase timings. Transport is left to the
//! embedding application; the snapshot is serialisable and rides along
//! on the progress callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Row-event kind observed by the binlog applier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowEventKind {
    Insert,
    Update,
    Delete,
}

/// Shared metrics registry
pub struct Metrics {
    rows_inserted: AtomicU64,
    rows_updated: AtomicU64,
    rows_deleted: AtomicU64,
    rows_copied: AtomicU64,
    event_batches_flushed: AtomicU64,
    row_batches_written: AtomicU64,
    ddl_applied: AtomicU64,
    phase_timings: Mutex<Vec<(String, Duration)>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            rows_inserted: AtomicU64::new(0),
            rows_updated: AtomicU64::new(0),
            rows_deleted: AtomicU64::new(0),
            rows_copied: AtomicU64::new(0),
            event_batches_flushed: AtomicU64::new(0),
            row_batches_written: AtomicU64::new(0),
            ddl_applied: AtomicU64::new(0),
            phase_timings: Mutex::new(Vec::new()),
        }
    }

    pub fn record_row_event(&self, kind: RowEventKind) {
        let counter = match kind {
            RowEventKind::Insert => &self.rows_inserted,
            RowEventKind::Update => &self.rows_updated,
            RowEventKind::Delete => &self.rows_deleted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rows_copied(&self, rows: u64) {
        self.rows_copied.fetch_add(rows, Ordering::Relaxed);
        self.row_batches_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_batch_flushed(&self) {
        self.event_batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ddl_applied(&self) {
        self.ddl_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_phase(&self, phase: &str, elapsed: Duration) {
        tracing::info!("phase {} took {:?}", phase, elapsed);
        if let Ok(mut timings) = self.phase_timings.lock() {
            timings.push((phase.to_string(), elapsed));
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let phase_timings_ms = self
            .phase_timings
            .lock()
            .map(|timings| {
                timings
                    .iter()
                    .map(|(phase, elapsed)| (phase.clone(), elapsed.as_millis() as u64))
                    .collect()
            })
            .unwrap_or_default();

        MetricsSnapshot {
            rows_inserted: self.rows_inserted.load(Ordering::Relaxed),
            rows_updated: self.rows_updated.load(Ordering::Relaxed),
            rows_deleted: self.rows_deleted.load(Ordering::Relaxed),
            rows_copied: self.rows_copied.load(Ordering::Relaxed),
            event_batches_flushed: self.event_batches_flushed.load(Ordering::Relaxed),
            row_batches_written: self.row_batches_written.load(Ordering::Relaxed),
            ddl_applied: self.ddl_applied.load(Ordering::Relaxed),
            phase_timings_ms,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the metrics registry
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub rows_inserted: u64,
    pub rows_updated: u64,
    pub rows_deleted: u64,
    pub rows_copied: u64,
    pub event_batches_flushed: u64,
    pub row_batches_written: u64,
    pub ddl_applied: u64,
    pub phase_timings_ms: Vec<(String, u64)>,
}
