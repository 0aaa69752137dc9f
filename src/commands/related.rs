// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Related command - lists the co-watch neighbours of a repository

use anyhow::{Context, Result};
use forkwatch::config::Config;
use forkwatch::cowatch::{CoWatchSource, CoWatchTable};
use forkwatch::funnel::{rank_related, score};
use forkwatch::pipeline;
use std::collections::BTreeSet;

/// Run the related command
pub fn run(config: &Config, query: &str, limit: usize) -> Result<()> {
    let graph = pipeline::load_repos(config, false)
        .with_context(|| format!("Failed to load repo table from {}", config.derived_dir.display()))?;
    let id = super::lineage::resolve_repo(&graph, query)?;

    let watches = pipeline::load_watches(config, false).context("Failed to load watch table")?;
    let path = pipeline::ensure_cowatch_table(config, &watches, false)
        .context("Failed to build co-watch table")?;
    let table = CoWatchTable::open_read_only(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let sources: BTreeSet<_> = [id].into_iter().collect();
    let mut related = table.related_repos(&sources)?;
    rank_related(&mut related);

    if related.is_empty() {
        println!("No co-watched repositories for {}", query);
        return Ok(());
    }

    println!("Co-watched with {} ({} total):", query, related.len());
    for hit in related.iter().take(limit) {
        let name = graph
            .get(hit.related)
            .map_or_else(|| hit.related.to_string(), |r| r.full_name());
        println!(
            "  {:>8}  {:<40} co={:<5} p={:.4} score={:.4}",
            hit.related,
            name,
            hit.co_freq,
            hit.cond_prob,
            score(hit)
        );
    }

    Ok(())
}
