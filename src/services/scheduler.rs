//! Polling scheduler.
//!
//! Each subject gets one long-lived task running the state machine
//! `Idle -> Running -> (Idle | Backoff) -> Idle`, ending in `Stopped` on
//! shutdown. A semaphore bounds how many subjects run a cycle at once; a
//! subject never has more than one cycle in flight.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::models::{Config, SchedulerSettings};
use crate::services::scan_cycle::{CancelHandle, CancelSignal, ScanCycle};

/// Exponential backoff capped at a maximum delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay after `attempt` consecutive failures, counting from 0.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_subjects: usize,
    pub backoff: BackoffPolicy,
    pub run_on_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerSettings::default())
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            max_concurrent_subjects: settings.max_concurrent_subjects.max(1),
            backoff: BackoffPolicy::new(
                Duration::from_millis(settings.backoff_base_ms),
                Duration::from_millis(settings.backoff_cap_ms),
            ),
            run_on_startup: settings.run_on_startup,
        }
    }
}

/// Lifecycle state of one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectState {
    Idle,
    Running,
    Backoff,
    Stopped,
}

impl SubjectState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Backoff => "backoff",
            Self::Stopped => "stopped",
        }
    }
}

/// Per-subject status exposed through the handle.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectStatus {
    pub subject_id: String,
    pub state: SubjectState,
    pub interval: Duration,
    pub cycles: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SubjectStatus {
    fn new(subject_id: &str, interval: Duration) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            state: SubjectState::Idle,
            interval,
            cycles: 0,
            failures: 0,
            consecutive_failures: 0,
            last_run: None,
            last_error: None,
        }
    }
}

/// Event emitted by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A cycle began.
    CycleStarted { subject_id: String, cycle: u64 },
    /// A cycle committed its snapshot.
    CycleCompleted {
        subject_id: String,
        cycle: u64,
        changes: usize,
        suppressed: usize,
    },
    /// A cycle failed; the subject is backing off.
    CycleFailed {
        subject_id: String,
        cycle: u64,
        error: String,
        retry_in: Duration,
    },
    /// The subject task exited.
    SubjectStopped { subject_id: String },
}

type StatusMap = Arc<RwLock<BTreeMap<String, SubjectStatus>>>;

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Handle to observe and stop a running scheduler.
pub struct SchedulerHandle {
    shutdown: CancelHandle,
    statuses: StatusMap,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Request every subject to stop at its next suspension point.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn status(&self, subject_id: &str) -> Option<SubjectStatus> {
        self.statuses.read().await.get(subject_id).cloned()
    }

    /// Status of every subject, ordered by id.
    pub async fn statuses(&self) -> Vec<SubjectStatus> {
        self.statuses.read().await.values().cloned().collect()
    }

    /// Wait for every subject task to exit, returning their final status.
    pub async fn join(self) -> Vec<SubjectStatus> {
        for task in self.tasks {
            let _ = task.await;
        }
        self.statuses.read().await.values().cloned().collect()
    }
}

struct SubjectTask {
    subject_id: String,
    interval: Duration,
    cycle: Arc<ScanCycle>,
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
    cancel: CancelSignal,
    statuses: StatusMap,
    events: mpsc::Sender<SchedulerEvent>,
}

impl SubjectTask {
    async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SubjectStatus),
    {
        if let Some(status) = self.statuses.write().await.get_mut(&self.subject_id) {
            f(status);
        }
    }

    async fn emit(&self, event: SchedulerEvent) {
        let _ = self.events.send(event).await;
    }

    async fn run(self) {
        let subject_id = self.subject_id.clone();
        let mut attempt = 0u32;

        if !self.config.run_on_startup && !self.cancel.sleep(self.interval).await {
            self.stop().await;
            return;
        }

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let mut cycle_number = 0;
            self.update(|s| {
                s.state = SubjectState::Running;
                s.cycles += 1;
                cycle_number = s.cycles;
            })
            .await;
            self.emit(SchedulerEvent::CycleStarted {
                subject_id: subject_id.clone(),
                cycle: cycle_number,
            })
            .await;

            let result = self.cycle.run(&subject_id, &self.cancel).await;
            drop(permit);

            let delay = match result {
                Ok(outcome) => {
                    attempt = 0;
                    let finished = outcome.snapshot.as_of;
                    self.update(|s| {
                        s.state = SubjectState::Idle;
                        s.consecutive_failures = 0;
                        s.last_run = Some(finished);
                        s.last_error = None;
                    })
                    .await;
                    self.emit(SchedulerEvent::CycleCompleted {
                        subject_id: subject_id.clone(),
                        cycle: cycle_number,
                        changes: outcome.report.diff().map_or(0, |d| d.change_count()),
                        suppressed: outcome.report.suppressed().total(),
                    })
                    .await;
                    self.interval
                }
                Err(e) if e.is_cancelled() => break,
                Err(e) => {
                    let delay = self.config.backoff.delay(attempt);
                    attempt = attempt.saturating_add(1);
                    let message = e.to_string();
                    self.update(|s| {
                        s.state = SubjectState::Backoff;
                        s.failures += 1;
                        s.consecutive_failures = attempt;
                        s.last_error = Some(message.clone());
                    })
                    .await;
                    self.cycle.report_failure(&subject_id, &e, Some(delay)).await;
                    self.emit(SchedulerEvent::CycleFailed {
                        subject_id: subject_id.clone(),
                        cycle: cycle_number,
                        error: message,
                        retry_in: delay,
                    })
                    .await;
                    delay
                }
            };

            debug!(subject_id = %subject_id, delay_ms = saturating_millis(delay), "Next cycle scheduled");
            if !self.cancel.sleep(delay).await {
                break;
            }
            self.update(|s| s.state = SubjectState::Idle).await;
        }

        self.stop().await;
    }

    async fn stop(&self) {
        self.update(|s| s.state = SubjectState::Stopped).await;
        info!(subject_id = %self.subject_id, "Subject stopped");
        self.emit(SchedulerEvent::SubjectStopped {
            subject_id: self.subject_id.clone(),
        })
        .await;
    }
}

/// Drives scan cycles for a set of subjects.
pub struct Scheduler {
    cycle: Arc<ScanCycle>,
    config: SchedulerConfig,
    subjects: Vec<(String, Duration)>,
}

impl Scheduler {
    pub fn new(cycle: Arc<ScanCycle>, config: SchedulerConfig) -> Self {
        Self {
            cycle,
            config,
            subjects: Vec::new(),
        }
    }

    /// Scheduler for every subject in `config`.
    pub fn from_config(cycle: Arc<ScanCycle>, config: &Config) -> Self {
        let mut scheduler = Self::new(cycle, SchedulerConfig::from(&config.scheduler));
        for subject in &config.subjects {
            scheduler = scheduler.with_subject(&subject.id, config.interval_for(subject));
        }
        scheduler
    }

    /// Add a subject polled every `interval`. Duplicate ids are ignored.
    pub fn with_subject(mut self, subject_id: &str, interval: Duration) -> Self {
        if !self.subjects.iter().any(|(id, _)| id == subject_id) {
            self.subjects.push((subject_id.to_string(), interval));
        }
        self
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Spawn one task per subject.
    pub async fn start(self) -> (SchedulerHandle, mpsc::Receiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let (shutdown, cancel) = CancelSignal::pair();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_subjects.max(1)));

        let statuses: StatusMap = Arc::new(RwLock::new(
            self.subjects
                .iter()
                .map(|(id, interval)| (id.clone(), SubjectStatus::new(id, *interval)))
                .collect(),
        ));

        info!(
            subjects = self.subjects.len(),
            max_concurrent = self.config.max_concurrent_subjects,
            "Scheduler starting"
        );

        let tasks = self
            .subjects
            .into_iter()
            .map(|(subject_id, interval)| {
                let task = SubjectTask {
                    subject_id,
                    interval,
                    cycle: Arc::clone(&self.cycle),
                    config: self.config.clone(),
                    semaphore: Arc::clone(&semaphore),
                    cancel: cancel.clone(),
                    statuses: Arc::clone(&statuses),
                    events: tx.clone(),
                };
                tokio::spawn(task.run())
            })
            .collect();

        (
            SchedulerHandle {
                shutdown,
                statuses,
                tasks,
            },
            rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = BackoffPolicy::new(Duration::from_secs(10), Duration::from_secs(60));
        assert_eq!(policy.delay(0), Duration::from_secs(10));
        assert_eq!(policy.delay(1), Duration::from_secs(20));
        assert_eq!(policy.delay(2), Duration::from_secs(40));
        assert_eq!(policy.delay(3), Duration::from_secs(60));
        assert_eq!(policy.delay(40), Duration::from_secs(60));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = SchedulerSettings {
            max_concurrent_subjects: 0,
            ..SchedulerSettings::default()
        };
        let config = SchedulerConfig::from(&settings);
        assert_eq!(config.max_concurrent_subjects, 1);
        assert_eq!(config.backoff.base, Duration::from_secs(10));
        assert_eq!(config.backoff.cap, Duration::from_secs(600));
        assert!(config.run_on_startup);
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_secs(10)), 10_000);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_subject_state_labels() {
        assert_eq!(SubjectState::Backoff.as_str(), "backoff");
        assert_eq!(SubjectState::Stopped.as_str(), "stopped");
    }
}
