// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Build command - builds the repository, watch and co-watch tables

use anyhow::{Context, Result};
use forkwatch::config::Config;
use forkwatch::pipeline;
use tracing::info;

/// Run the build command
pub fn run(config: &Config, force: bool) -> Result<()> {
    info!("Building tables in {}", config.derived_dir.display());

    let repos = pipeline::load_repos(config, force).context("Failed to build repo table")?;
    let watches = pipeline::load_watches(config, force).context("Failed to build watch table")?;
    let table = pipeline::ensure_cowatch_table(config, &watches, force)
        .context("Failed to build co-watch table")?;

    let forks = repos.repos().iter().filter(|r| r.is_forked()).count();
    println!("Repos:    {} ({} forks)", repos.len(), forks);
    println!("Users:    {}", watches.user_count());
    println!("Watches:  {}", watches.total_watches());
    println!("Co-watch: {}", table.display());

    Ok(())
}
