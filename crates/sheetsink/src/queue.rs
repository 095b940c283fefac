use crate::error::SinkError;
use crate::query::QueuedItem;
use crate::telemetry::{Severity, TelemetryEvent, TelemetrySink, TracingSink};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Observable state of the queue; reset to idle once a batch finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub config_id: Option<String>,
    pub total: usize,
    pub completed: usize,
    pub current_item_id: Option<String>,
}

impl BatchProgress {
    pub fn idle() -> Self {
        Self {
            config_id: None,
            total: 0,
            completed: 0,
            current_item_id: None,
        }
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::idle()
    }
}

/// What a runner reports back for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemOutcome {
    pub ok: bool,
    pub row_count: usize,
}

impl ItemOutcome {
    pub fn ok(row_count: usize) -> Self {
        Self {
            ok: true,
            row_count,
        }
    }

    pub fn failed() -> Self {
        Self {
            ok: false,
            row_count: 0,
        }
    }
}

/// A named batch submitted for sequential execution.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub config_id: Option<String>,
    pub items: Vec<QueuedItem>,
    /// Cooperative delay between items, giving the host room to settle its
    /// synchronization rounds.
    pub backoff: Option<Duration>,
}

impl BatchOptions {
    pub fn new(config_id: Option<String>, items: Vec<QueuedItem>) -> Self {
        Self {
            config_id,
            items,
            backoff: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }
}

/// Accounting for a finished batch. A batch with failures still ran to the
/// end; the caller decides what to surface to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub failed: Vec<String>,
}

/// How a `run_batch` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRun {
    /// The batch carried no items; nothing changed.
    Empty,
    /// Another batch was in flight; this one was dropped, not queued.
    Rejected,
    Completed(BatchReport),
}

type ProgressListener = Box<dyn Fn(&BatchProgress) + Send + Sync>;

/// Runs batches strictly sequentially, one batch system-wide.
///
/// The host document commits changes in discrete synchronization rounds, so
/// concurrent writers could interleave partially applied mutations; a single
/// in-flight batch is a correctness choice, not an optimization. The guard is
/// a mutex-backed state transition checked before any other work, so there is
/// no window between "is a batch running" and "start a batch".
pub struct ExecutionQueue {
    running: Mutex<bool>,
    progress: RwLock<BatchProgress>,
    listeners: RwLock<Vec<ProgressListener>>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Default for ExecutionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::with_telemetry(Arc::new(TracingSink))
    }

    pub fn with_telemetry(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            running: Mutex::new(false),
            progress: RwLock::new(BatchProgress::idle()),
            listeners: RwLock::new(Vec::new()),
            telemetry,
        }
    }

    pub fn add_progress_listener<F>(&self, listener: F)
    where
        F: Fn(&BatchProgress) + Send + Sync + 'static,
    {
        self.listeners.write().push(Box::new(listener));
    }

    /// Snapshot of the current progress.
    pub fn progress(&self) -> BatchProgress {
        self.progress.read().clone()
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    /// Execute every item of `options` in order through `runner`.
    ///
    /// The runner owns parameter resolution, target resolution and the table
    /// write for its item; it reports failure by returning `Err` or
    /// `ItemOutcome { ok: false, .. }`. Either way the batch continues — one
    /// item never aborts the rest. A second call while a batch is in flight
    /// is rejected immediately, never queued.
    pub fn run_batch<F>(&self, options: BatchOptions, mut runner: F) -> BatchRun
    where
        F: FnMut(&QueuedItem) -> Result<ItemOutcome, SinkError>,
    {
        if options.items.is_empty() {
            return BatchRun::Empty;
        }

        {
            let mut running = self.running.lock();
            if *running {
                self.telemetry.emit(
                    &TelemetryEvent::new("queue", "batch_rejected", Severity::Warn)
                        .with("configId", options.config_id.as_deref().unwrap_or("")),
                );
                return BatchRun::Rejected;
            }
            *running = true;
        }

        let total = options.items.len();
        let config_id = options.config_id.clone();
        self.telemetry.emit(
            &TelemetryEvent::new("queue", "batch_started", Severity::Info)
                .with("configId", config_id.as_deref().unwrap_or(""))
                .with("items", total.to_string()),
        );

        self.publish(BatchProgress {
            config_id: config_id.clone(),
            total,
            completed: 0,
            current_item_id: None,
        });

        let mut failed: Vec<String> = Vec::new();
        for (index, item) in options.items.iter().enumerate() {
            self.publish(BatchProgress {
                config_id: config_id.clone(),
                total,
                completed: index,
                current_item_id: Some(item.id.clone()),
            });

            match runner(item) {
                Ok(outcome) if outcome.ok => {
                    tracing::debug!(item = %item.id, rows = outcome.row_count, "item completed");
                }
                Ok(_) => failed.push(item.id.clone()),
                Err(err) => {
                    self.telemetry.emit(
                        &TelemetryEvent::new("queue", "item_failed", Severity::Error)
                            .with("itemId", item.id.as_str())
                            .with("error", err.to_string()),
                    );
                    failed.push(item.id.clone());
                }
            }

            self.publish(BatchProgress {
                config_id: config_id.clone(),
                total,
                completed: index + 1,
                current_item_id: None,
            });

            if index + 1 < total {
                if let Some(backoff) = options.backoff.filter(|d| !d.is_zero()) {
                    std::thread::sleep(backoff);
                }
            }
        }

        self.publish(BatchProgress::idle());
        *self.running.lock() = false;

        self.telemetry.emit(
            &TelemetryEvent::new("queue", "batch_completed", Severity::Info)
                .with("configId", config_id.as_deref().unwrap_or(""))
                .with("items", total.to_string())
                .with("failed", failed.len().to_string()),
        );

        BatchRun::Completed(BatchReport { total, failed })
    }

    fn publish(&self, progress: BatchProgress) {
        *self.progress.write() = progress.clone();
        for listener in self.listeners.read().iter() {
            listener(&progress);
        }
    }
}
