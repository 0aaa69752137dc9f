// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Seed command - probabilistic candidates from each user's own watches

use anyhow::{Context, Result};
use forkwatch::config::Config;
use forkwatch::pipeline::{self, DataContext};
use forkwatch::results;
use std::path::PathBuf;

/// Run the seed command
pub fn run(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let ctx = DataContext::load(config, false).context("Failed to load data")?;
    pipeline::ensure_cowatch_table(config, &ctx.watches, false)
        .context("Failed to build co-watch table")?;

    let seeds = pipeline::compute_seeds(config, &ctx)?;

    let path = output.unwrap_or_else(|| config.seed_candidates());
    results::write_candidates(&seeds, &path, config.candidates)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote seed candidates for {} users to {}", seeds.len(), path.display());
    Ok(())
}
