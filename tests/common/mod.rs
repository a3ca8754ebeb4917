//! Common test utilities for integration tests
//!
//! Provides scripted ports and fixtures shared across the integration test
//! files.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use memberscan::adapters::memory::{InMemoryRunRepository, InMemorySnapshotStore};
use memberscan::domain::errors::{CandidateSourceError, NotifyError, StoreError};
use memberscan::domain::models::{Candidate, CanonicalCommunity, ChangeReport, Config, Role, Snapshot};
use memberscan::domain::ports::{CandidateSource, Clock, NotificationSink, SnapshotStore};
use memberscan::services::ScanCycle;

/// Fixed reference time for deterministic tests
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
        + chrono::Duration::seconds(offset_secs)
}

/// Candidate from a detector without a configured tier, so its own
/// confidence is used as-is.
pub fn candidate(source_id: &str, name: &str, role: Role, confidence: f64) -> Candidate {
    Candidate::new(source_id, name, role, "detector", confidence, at(0))
}

pub fn community(id: &str, name: &str, role: Role, confidence: f64) -> CanonicalCommunity {
    CanonicalCommunity {
        id: id.to_string(),
        display_name: name.to_string(),
        role,
        confidence,
        source_count: 1,
        first_seen_at: at(-3600),
        last_seen_at: at(-3600),
        methods: vec!["detector".into()],
        source_ids: vec![id.to_string()],
    }
}

/// Previously committed snapshot where every entry was already reported
pub fn reported_snapshot(subject_id: &str, communities: Vec<CanonicalCommunity>) -> Snapshot {
    Snapshot::from_communities(subject_id, at(-3600), communities).with_all_reported()
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Candidate source that replays queued responses, repeating the last one.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Candidate>, CandidateSourceError>>>,
    last: Mutex<Option<Result<Vec<Candidate>, CandidateSourceError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn then_ok(self, candidates: Vec<Candidate>) -> Self {
        self.push(Ok(candidates));
        self
    }

    pub fn then_err(self, error: CandidateSourceError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<Vec<Candidate>, CandidateSourceError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<Vec<Candidate>, CandidateSourceError> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().unwrap_or_else(|| Ok(vec![]))
    }
}

#[async_trait]
impl CandidateSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_candidates(&self, _subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.next_response()
    }
}

/// Sink that keeps every published report and can be told to fail.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<ChangeReport>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    pub fn reports(&self) -> Vec<ChangeReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ChangeReport> {
        self.reports.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, report: &ChangeReport) -> Result<(), NotifyError> {
        self.reports.lock().unwrap().push(report.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("sink offline".to_string()));
        }
        Ok(())
    }
}

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemorySnapshotStore,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl FlakyStore {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: InMemorySnapshotStore::with_snapshots([snapshot]),
            ..Self::default()
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for FlakyStore {
    async fn load(&self, subject_id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.inner.load(subject_id).await
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                subject_id: snapshot.subject_id.clone(),
                message: "disk full".to_string(),
            });
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(snapshot).await
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Everything a scan cycle test needs to inspect afterwards.
pub struct Harness {
    pub source: Arc<ScriptedSource>,
    pub store: Arc<FlakyStore>,
    pub sink: Arc<RecordingSink>,
    pub runs: Arc<InMemoryRunRepository>,
    pub clock: Arc<ManualClock>,
    pub cycle: Arc<ScanCycle>,
}

impl Harness {
    pub fn new(source: ScriptedSource, store: FlakyStore, sink: RecordingSink) -> Self {
        Self::with_config(source, store, sink, &Config::default())
    }

    pub fn with_config(source: ScriptedSource, store: FlakyStore, sink: RecordingSink, config: &Config) -> Self {
        let source = Arc::new(source);
        let store = Arc::new(store);
        let sink = Arc::new(sink);
        let runs = Arc::new(InMemoryRunRepository::new());
        let clock = Arc::new(ManualClock::new(at(0)));
        let cycle = Arc::new(
            ScanCycle::new(source.clone(), store.clone(), sink.clone(), clock.clone(), config)
                .with_run_repository(runs.clone()),
        );
        Self {
            source,
            store,
            sink,
            runs,
            clock,
            cycle,
        }
    }
}
