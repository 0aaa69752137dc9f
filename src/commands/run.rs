// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Run command - every phase whose output is missing

use anyhow::{Context, Result};
use forkwatch::config::Config;
use forkwatch::pipeline;

/// Run the full pipeline
pub fn run(config: &Config, force: bool) -> Result<()> {
    let summary = pipeline::run(config, force).context("Pipeline failed")?;

    println!("Seed candidates:   {}", summary.seed_file.display());
    println!("Filled candidates: {}", summary.filled_file.display());
    println!("Users:             {}", summary.users);
    Ok(())
}
