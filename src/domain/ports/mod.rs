//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the scan core depends on:
//! - CandidateSource: detectors producing candidate observations
//! - SnapshotStore: committed snapshot persistence
//! - NotificationSink: change report delivery
//! - RunRepository: scan run history
//! - Clock: timestamp source
//!
//! The core only ever receives these as injected `Arc<dyn ...>` values, so
//! it can be exercised entirely with in-memory fakes.

pub mod candidate_source;
pub mod clock;
pub mod notification_sink;
pub mod run_repository;
pub mod snapshot_store;

pub use candidate_source::CandidateSource;
pub use clock::{Clock, SystemClock};
pub use notification_sink::NotificationSink;
pub use run_repository::RunRepository;
pub use snapshot_store::SnapshotStore;
