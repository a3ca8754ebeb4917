//! Benchmarks for candidate clustering and snapshot diffing.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use memberscan::domain::models::{Candidate, Role, Snapshot};
use memberscan::services::{ConfidenceScorer, Deduplicator, DiffEngine};

const METHODS: [&str; 5] = ["dom", "url", "graphql", "hashtag", "social_graph"];

/// Build `n` candidates where every community is observed by about three detectors
/// under slightly different names and ids.
fn generate_candidates(n: usize) -> Vec<Candidate> {
    let observed_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap_or_else(Utc::now);
    (0..n)
        .map(|i| {
            let community = i / 3;
            let (source_id, name) = match i % 3 {
                0 => (format!("social_{}", 1_700_000_000_000_000_000u64 + community as u64), format!("Community {community}")),
                1 => (format!("https://x.com/i/communities/{}", 1_700_000_000_000_000_000u64 + community as u64), format!("community {community}")),
                _ => (format!("hashtag_{community}"), format!("#Community{community}")),
            };
            let role = if community % 17 == 0 { Role::Admin } else { Role::Member };
            Candidate::new(source_id, name, role, METHODS[i % METHODS.len()], 0.7, observed_at)
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let scorer = ConfidenceScorer::default();
    let dedup = Deduplicator::new();

    let mut group = c.benchmark_group("merge");
    for size in [30, 300, 1500] {
        let candidates = generate_candidates(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &candidates, |b, candidates| {
            b.iter(|| dedup.merge(black_box(candidates.clone()), &scorer));
        });
    }
    group.finish();
}

fn bench_diff(c: &mut Criterion) {
    let scorer = ConfidenceScorer::default();
    let dedup = Deduplicator::new();
    let now = Utc::now();

    let previous = Snapshot::from_communities("alice", now, dedup.merge(generate_candidates(900), &scorer).communities);
    let current = Snapshot::from_communities("alice", now, dedup.merge(generate_candidates(960), &scorer).communities);

    let engine = DiffEngine::default();
    c.bench_function("diff_320_communities", |b| {
        b.iter(|| engine.diff(black_box(&previous), black_box(&current)));
    });
}

criterion_group!(benches, bench_merge, bench_diff);
criterion_main!(benches);
