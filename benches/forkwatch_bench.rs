// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Benchmarks for lineage resolution, the co-watch build and the funnel

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forkwatch::cowatch::CoWatchMatrix;
use forkwatch::funnel::{CandidateGenerator, FunnelOptions};
use forkwatch::graph::RepoGraph;
use forkwatch::types::{Repo, RepoId, UserId};
use forkwatch::watches::WatchStore;

fn synthetic_repos(count: u32) -> Vec<Repo> {
    let base = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap_or_default();
    (1..=count)
        .map(|id| {
            // Every fourth repository forks the one three below it
            let fork_of = (id % 4 == 0 && id > 3).then(|| id - 3);
            let created = base + Duration::days(i64::from(id / 7));
            Repo::new(id, format!("user{}", id % 97), format!("project-{}", id % 211), created, fork_of)
        })
        .collect()
}

fn synthetic_watches(users: u32, repos: u32) -> WatchStore {
    let mut edges: Vec<(UserId, RepoId)> = Vec::new();
    for user in 1..=users {
        for k in 0..(user % 17 + 2) {
            edges.push((user, (user * 31 + k * 7) % repos + 1));
        }
    }
    WatchStore::from_edges(edges)
}

fn bench_lineage(c: &mut Criterion) {
    let mut group = c.benchmark_group("lineage");
    for count in [1_000u32, 10_000] {
        let repos = synthetic_repos(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &repos, |b, repos| {
            b.iter(|| RepoGraph::build(black_box(repos.clone()), &[]));
        });
    }
    group.finish();
}

fn bench_cowatch(c: &mut Criterion) {
    let watches = synthetic_watches(2_000, 5_000);
    c.bench_function("cowatch_compute_2000_users", |b| {
        b.iter(|| CoWatchMatrix::compute(black_box(&watches), None));
    });
}

fn bench_funnel(c: &mut Criterion) {
    let Ok(graph) = RepoGraph::build(synthetic_repos(5_000), &[]) else {
        return;
    };
    let watches = synthetic_watches(2_000, 5_000);
    let Ok(matrix) = CoWatchMatrix::compute(&watches, None) else {
        return;
    };
    let generator = CandidateGenerator::new(&graph, &watches, &matrix, FunnelOptions::default());

    c.bench_function("funnel_generate_100_users", |b| {
        b.iter(|| {
            for user in 1..=100 {
                let _ = generator.generate(black_box(user), &[], 20);
            }
        });
    });
}

criterion_group!(benches, bench_lineage, bench_cowatch, bench_funnel);
criterion_main!(benches);
