// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Phase orchestration
//!
//! Derived artifacts are reused when present and recomputed from the raw
//! inputs otherwise. Raw inputs that are needed but missing are hard errors.

use crate::config::Config;
use crate::cowatch::CoWatchTable;
use crate::error::Result;
use crate::funnel::{CandidateGenerator, FunnelOptions};
use crate::graph::RepoGraph;
use crate::ingest;
use crate::results::{self, CandidateMap};
use crate::types::UserId;
use crate::watches::WatchStore;
use std::path::PathBuf;
use tracing::info;

/// Everything the candidate phases read, built once and passed by reference
#[derive(Debug, Clone)]
pub struct DataContext {
    /// Repository store with resolved lineage
    pub repos: RepoGraph,
    /// Watch sets and popularity
    pub watches: WatchStore,
    /// Users to produce recommendations for
    pub test_users: Vec<UserId>,
}

impl DataContext {
    /// Load or rebuild the repository and watch tables and read the test users
    pub fn load(config: &Config, rebuild: bool) -> Result<Self> {
        Ok(Self {
            repos: load_repos(config, rebuild)?,
            watches: load_watches(config, rebuild)?,
            test_users: ingest::read_test_users(&config.test_users_input())?,
        })
    }

    /// Funnel options derived from the configuration
    #[must_use]
    pub fn funnel_options(config: &Config) -> FunnelOptions {
        FunnelOptions {
            fallback_excludes_watched: config.fallback_excludes_watched,
        }
    }
}

/// Load the persisted repository table, or build it from raw input and persist it
pub fn load_repos(config: &Config, rebuild: bool) -> Result<RepoGraph> {
    let table = config.repo_table();
    if !rebuild {
        if let Some(graph) = RepoGraph::load(&table)? {
            return Ok(graph);
        }
    }

    info!("Building repo table from {}", config.source_dir.display());
    let repos = ingest::read_repos(&config.repos_input())?;
    let languages = ingest::read_languages(&config.languages_input())?;
    let graph = RepoGraph::build(repos, &languages)?;
    graph.save(&table)?;
    info!("Stored {} repos in {}", graph.len(), table.display());
    Ok(graph)
}

/// Load the persisted watch table, or build it from raw input and persist it
pub fn load_watches(config: &Config, rebuild: bool) -> Result<WatchStore> {
    let table = config.watch_table();
    if !rebuild {
        if let Some(watches) = WatchStore::load(&table)? {
            return Ok(watches);
        }
    }

    info!("Building watch table from {}", config.watches_input().display());
    let watches = WatchStore::from_edges(ingest::read_watches(&config.watches_input())?);
    watches.save(&table)?;
    info!(
        "Stored {} watches of {} users in {}",
        watches.total_watches(),
        watches.user_count(),
        table.display()
    );
    Ok(watches)
}

/// Make sure the co-watch table exists, computing it when absent or when `rebuild` is set
pub fn ensure_cowatch_table(config: &Config, watches: &WatchStore, rebuild: bool) -> Result<PathBuf> {
    let path = config.cowatch_table();
    if rebuild || !CoWatchTable::exists(&path) {
        CoWatchTable::build(&path, watches, config.build_timeout())?;
    }
    Ok(path)
}

/// Probabilistic seed lists for every test user
pub fn compute_seeds(config: &Config, ctx: &DataContext) -> Result<CandidateMap> {
    let table = CoWatchTable::open_read_only(&config.cowatch_table())?;
    let generator = CandidateGenerator::new(
        &ctx.repos,
        &ctx.watches,
        &table,
        DataContext::funnel_options(config),
    );
    info!("Computing seed candidates for {} users", ctx.test_users.len());
    generator.seed_all(&ctx.test_users, config.candidates)
}

/// Full funnel for every test user, starting from `seeds`
pub fn compute_filled(config: &Config, ctx: &DataContext, seeds: &CandidateMap) -> Result<CandidateMap> {
    let table = CoWatchTable::open_read_only(&config.cowatch_table())?;
    let generator = CandidateGenerator::new(
        &ctx.repos,
        &ctx.watches,
        &table,
        DataContext::funnel_options(config),
    );
    info!("Filling candidates for {} users", ctx.test_users.len());
    generator.generate_all(&ctx.test_users, seeds, config.candidates)
}

/// Output of a full pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Seed candidate file
    pub seed_file: PathBuf,
    /// Filled candidate file
    pub filled_file: PathBuf,
    /// Number of users written
    pub users: usize,
}

/// Run every phase whose output is missing (or all of them with `rebuild`)
pub fn run(config: &Config, rebuild: bool) -> Result<RunSummary> {
    let ctx = DataContext::load(config, rebuild)?;
    ensure_cowatch_table(config, &ctx.watches, rebuild)?;

    let seed_file = config.seed_candidates();
    let seeds = if rebuild || !seed_file.exists() {
        info!("Could not find {}, computing", seed_file.display());
        let seeds = compute_seeds(config, &ctx)?;
        results::write_candidates(&seeds, &seed_file, config.candidates)?;
        seeds
    } else {
        results::read_candidates(&seed_file)?
    };

    let filled_file = config.filled_candidates();
    let filled = if rebuild || !filled_file.exists() {
        let filled = compute_filled(config, &ctx, &seeds)?;
        results::write_candidates(&filled, &filled_file, config.candidates)?;
        filled
    } else {
        results::read_candidates(&filled_file)?
    };

    Ok(RunSummary {
        seed_file,
        filled_file,
        users: filled.len(),
    })
}
