// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Fill command - runs the candidate funnel over a seed file

use anyhow::{Context, Result};
use forkwatch::config::Config;
use forkwatch::pipeline::{self, DataContext};
use forkwatch::results::{self, CandidateMap};
use std::path::PathBuf;
use tracing::warn;

/// Run the fill command
pub fn run(config: &Config, seed: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let ctx = DataContext::load(config, false).context("Failed to load data")?;
    pipeline::ensure_cowatch_table(config, &ctx.watches, false)
        .context("Failed to build co-watch table")?;

    let seed_path = seed.unwrap_or_else(|| config.seed_candidates());
    let seeds = if seed_path.exists() {
        results::read_candidates(&seed_path)
            .with_context(|| format!("Failed to read {}", seed_path.display()))?
    } else {
        warn!("No seed file at {}, starting from empty lists", seed_path.display());
        CandidateMap::new()
    };

    let filled = pipeline::compute_filled(config, &ctx, &seeds)?;

    let path = output.unwrap_or_else(|| config.filled_candidates());
    results::write_candidates(&filled, &path, config.candidates)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote candidates for {} users to {}", filled.len(), path.display());
    Ok(())
}
