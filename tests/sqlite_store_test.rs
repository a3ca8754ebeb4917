//! SQLite snapshot store and run history against a real database file.

mod common;

use std::sync::Arc;

use common::{at, candidate, community, reported_snapshot, RecordingSink, ScriptedSource};
use tempfile::TempDir;

use memberscan::adapters::sqlite::{
    create_migrated_test_pool, initialize_database, SqliteRunRepository, SqliteSnapshotStore,
};
use memberscan::domain::models::{DatabaseConfig, Role, RunStatus, ScanRun, Snapshot};
use memberscan::domain::ports::{RunRepository, SnapshotStore, SystemClock};
use memberscan::services::{CancelSignal, ScanCycle};

async fn file_store(dir: &TempDir) -> (SqliteSnapshotStore, SqliteRunRepository) {
    let config = DatabaseConfig {
        path: dir.path().join("nested/memberscan.db").to_string_lossy().to_string(),
        max_connections: 2,
    };
    let pool = initialize_database(&config).await.expect("database should initialize");
    (SqliteSnapshotStore::new(pool.clone()), SqliteRunRepository::new(pool))
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let (store, _) = file_store(&dir).await;
    assert!(store.load("alice").await.unwrap().is_none());

    let mut snapshot = reported_snapshot(
        "alice",
        vec![
            community("comm_alpha", "Alpha Builders", Role::Creator, 0.97),
            community("1493446837214187523", "Build in Public", Role::Member, 0.62),
        ],
    );
    snapshot.reported.remove("comm_alpha");
    store.save(&snapshot).await.unwrap();

    let loaded = store.load("alice").await.unwrap().expect("snapshot saved");
    assert_eq!(loaded, snapshot);
    assert_eq!(store.subjects().await.unwrap(), vec!["alice".to_string()]);
}

#[tokio::test]
async fn test_save_replaces_whole_snapshot() {
    let dir = TempDir::new().unwrap();
    let (store, _) = file_store(&dir).await;

    let first = reported_snapshot(
        "alice",
        vec![
            community("comm_alpha", "Alpha Builders", Role::Member, 0.9),
            community("comm_beta", "Beta Guild", Role::Member, 0.9),
        ],
    );
    store.save(&first).await.unwrap();

    let second = reported_snapshot("alice", vec![community("comm_gamma", "Gamma Collective", Role::Admin, 0.8)]);
    store.save(&second).await.unwrap();

    let loaded = store.load("alice").await.unwrap().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.get("comm_alpha").is_none());
    assert_eq!(loaded, second);
}

#[tokio::test]
async fn test_subjects_are_isolated() {
    let pool = create_migrated_test_pool().await.unwrap();
    let store = SqliteSnapshotStore::new(pool);

    store
        .save(&reported_snapshot("alice", vec![community("comm_alpha", "Alpha Builders", Role::Member, 0.9)]))
        .await
        .unwrap();
    store.save(&Snapshot::empty("bob", at(0))).await.unwrap();

    assert_eq!(store.load("alice").await.unwrap().unwrap().len(), 1);
    assert!(store.load("bob").await.unwrap().unwrap().is_empty());
    assert_eq!(store.subjects().await.unwrap(), vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test]
async fn test_snapshot_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let snapshot = reported_snapshot("alice", vec![community("comm_alpha", "Alpha Builders", Role::Moderator, 0.75)]);
    {
        let (store, _) = file_store(&dir).await;
        store.save(&snapshot).await.unwrap();
    }

    let (reopened, _) = file_store(&dir).await;
    assert_eq!(reopened.load("alice").await.unwrap(), Some(snapshot));
}

#[tokio::test]
async fn test_run_history_newest_first() {
    let pool = create_migrated_test_pool().await.unwrap();
    let runs = SqliteRunRepository::new(pool);

    let older = ScanRun::failed("alice", at(0), at(1), "candidate source 'dom' failed: 503");
    let newer = ScanRun::failed("alice", at(60), at(61), "disk full");
    let other = ScanRun::failed("bob", at(30), at(31), "timeout");
    for run in [&older, &newer, &other] {
        runs.record(run).await.unwrap();
    }

    let recent = runs.recent("alice", 10).await.unwrap();
    assert_eq!(recent, vec![newer.clone(), older]);
    assert_eq!(runs.recent("alice", 1).await.unwrap(), vec![newer]);
    assert!(runs.recent("carol", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_cycle_persists_through_sqlite() {
    let pool = create_migrated_test_pool().await.unwrap();
    let store = Arc::new(SqliteSnapshotStore::new(pool.clone()));
    let runs = Arc::new(SqliteRunRepository::new(pool));
    let sink = Arc::new(RecordingSink::new());
    let source = Arc::new(ScriptedSource::new().then_ok(vec![
        candidate("comm_alpha", "Alpha Builders", Role::Member, 0.9),
        candidate("comm_beta", "Beta Guild", Role::Creator, 0.4),
    ]));

    let cycle = ScanCycle::new(source, store.clone(), sink, Arc::new(SystemClock), &Default::default())
        .with_run_repository(runs.clone());

    let outcome = cycle.run("alice", &CancelSignal::never()).await.unwrap();
    let loaded = store.load("alice").await.unwrap().unwrap();
    assert_eq!(loaded, outcome.snapshot);
    assert!(loaded.was_reported("comm_alpha"));
    assert!(!loaded.was_reported("comm_beta"));

    let history = runs.recent("alice", 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, RunStatus::Completed);
    assert_eq!(history[0].joined_ids, vec!["comm_alpha".to_string()]);
    assert_eq!(history[0].suppressed, 1);
}
