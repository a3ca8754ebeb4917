//! Single-subject reconciliation pipeline.
//!
//! One cycle: load the committed snapshot, fetch candidates, merge and
//! score them, diff against the snapshot, filter, build the report, commit
//! the new snapshot, then publish. Nothing is written before the diff and
//! filter succeed, and a cancelled or failed cycle leaves the previous
//! snapshot in place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{CandidateSourceError, CycleError, NotifyError};
use crate::domain::models::{ChangeReport, Config, DiffResult, ScanRun, Snapshot};
use crate::domain::ports::{CandidateSource, Clock, NotificationSink, RunRepository, SnapshotStore};
use crate::services::confidence_filter::ConfidenceFilter;
use crate::services::confidence_scorer::ConfidenceScorer;
use crate::services::deduplicator::Deduplicator;
use crate::services::diff_engine::DiffEngine;
use crate::services::notifier::{build_report, failure_report, Notifier};

/// Sender side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side of a cancellation signal, cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A connected handle and signal.
    pub fn pair() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx: Arc::new(tx) }, Self { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = Self::pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `duration`; returns false if cancelled first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

/// Result of a committed cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// The report built for this cycle.
    pub report: ChangeReport,

    /// The snapshot that was committed.
    pub snapshot: Snapshot,

    /// Candidates dropped as malformed.
    pub rejected: usize,

    /// Set when the snapshot was committed but publishing failed.
    pub notify_error: Option<NotifyError>,
}

pub struct ScanCycle {
    source: Arc<dyn CandidateSource>,
    store: Arc<dyn SnapshotStore>,
    notifier: Notifier,
    runs: Option<Arc<dyn RunRepository>>,
    clock: Arc<dyn Clock>,
    deduplicator: Deduplicator,
    scorer: ConfidenceScorer,
    diff_engine: DiffEngine,
    filter: ConfidenceFilter,
    subject_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ScanCycle {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        store: Arc<dyn SnapshotStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            store,
            notifier: Notifier::new(sink),
            runs: None,
            clock,
            deduplicator: Deduplicator::new(),
            scorer: ConfidenceScorer::new(&config.scoring),
            diff_engine: DiffEngine::new(&config.scoring),
            filter: ConfidenceFilter::new(&config.filter),
            subject_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Record every cycle in a run history.
    pub fn with_run_repository(mut self, runs: Arc<dyn RunRepository>) -> Self {
        self.runs = Some(runs);
        self
    }

    async fn subject_lock(&self, subject_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.subject_locks.lock().await;
        locks
            .entry(subject_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run one cycle for `subject_id`.
    ///
    /// Concurrent calls for the same subject are serialized.
    #[instrument(skip(self, cancel), fields(subject_id = %subject_id))]
    pub async fn run(&self, subject_id: &str, cancel: &CancelSignal) -> Result<CycleOutcome, CycleError> {
        let lock = self.subject_lock(subject_id).await;
        let _guard = lock.lock().await;

        let started_at = self.clock.now();
        let result = self.execute(subject_id, cancel).await;
        let finished_at = self.clock.now();

        if matches!(result, Err(CycleError::Cancelled)) {
            debug!("Cycle cancelled before commit");
            return result;
        }

        let run = match &result {
            Ok(outcome) => {
                let empty = DiffResult::default();
                ScanRun::completed(
                    subject_id,
                    started_at,
                    finished_at,
                    outcome.report.diff().unwrap_or(&empty),
                    outcome.report.suppressed(),
                )
            }
            Err(e) => ScanRun::failed(subject_id, started_at, finished_at, e.to_string()),
        };
        self.record_run(&run).await;

        result
    }

    async fn execute(&self, subject_id: &str, cancel: &CancelSignal) -> Result<CycleOutcome, CycleError> {
        if cancel.is_cancelled() {
            return Err(CycleError::Cancelled);
        }

        let previous = self
            .store
            .load(subject_id)
            .await?
            .unwrap_or_else(|| Snapshot::empty(subject_id, self.clock.now()));

        let candidates = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CycleError::Cancelled),
            fetched = self.source.fetch_candidates(subject_id) => fetched?,
        };

        let fetched = candidates.len();
        let merged = self.deduplicator.merge(candidates, &self.scorer);
        let rejected = merged.rejected.len();
        if rejected > 0 {
            warn!(rejected, "Dropped malformed candidates");
        }

        // Nothing usable while communities were known reads as an outage.
        if merged.communities.is_empty() && !previous.is_empty() {
            return Err(CandidateSourceError::NoCandidates {
                subject_id: subject_id.to_string(),
            }
            .into());
        }
        debug!(fetched, communities = merged.communities.len(), "Candidates merged");

        let now = self.clock.now();
        let mut current = Snapshot::from_communities(subject_id, now, merged.communities);
        current.carry_first_seen(&previous);

        let diff = self.diff_engine.diff(&previous, &current);
        let filtered = self.filter.apply(diff, &previous, &current);
        current.reported = filtered.reported.clone();

        let report = build_report(subject_id, now, &filtered, &current);

        if cancel.is_cancelled() {
            return Err(CycleError::Cancelled);
        }

        self.store.save(&current).await?;

        info!(
            joined = filtered.visible.joined.len(),
            left = filtered.visible.left.len(),
            role_changed = filtered.visible.role_changed.len(),
            updated = filtered.visible.updated.len(),
            suppressed = filtered.suppressed.total(),
            total = current.len(),
            "Snapshot committed"
        );

        let notify_error = self.notifier.publish(&report).await.err();

        Ok(CycleOutcome {
            report,
            snapshot: current,
            rejected,
            notify_error,
        })
    }

    /// Publish the error report for a failed cycle.
    ///
    /// Cancellation produces no report.
    pub async fn report_failure(
        &self,
        subject_id: &str,
        error: &CycleError,
        retry_in: Option<Duration>,
    ) -> Option<ChangeReport> {
        let report = failure_report(subject_id, self.clock.now(), error, retry_in)?;
        warn!(subject_id, error = %error, retry_in = ?retry_in, "Scan cycle failed");
        // A delivery failure is already logged by the notifier.
        let _ = self.notifier.publish(&report).await;
        Some(report)
    }

    async fn record_run(&self, run: &ScanRun) {
        if let Some(runs) = &self.runs {
            if let Err(e) = runs.record(run).await {
                warn!(subject_id = %run.subject_id, error = %e, "Failed to record scan run");
            }
        }
    }
}
