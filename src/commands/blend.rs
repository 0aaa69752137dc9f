// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Blend command - merges a secondary candidate file in front of a primary one

use anyhow::{Context, Result};
use forkwatch::results;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Run the blend command. Lines of the two files are paired by position.
pub fn run(primary: &Path, secondary: &Path, lead: usize, n: usize, output: Option<PathBuf>) -> Result<()> {
    let main = results::read_candidate_lines(primary)
        .with_context(|| format!("Failed to read {}", primary.display()))?;
    let extra = results::read_candidate_lines(secondary)
        .with_context(|| format!("Failed to read {}", secondary.display()))?;
    if extra.len() < main.len() {
        warn!(
            "{} has {} lines, {} has {}",
            secondary.display(),
            extra.len(),
            primary.display(),
            main.len()
        );
    }

    let blended = results::blend(&main, &extra, lead, n);

    match output {
        Some(path) => {
            results::write_candidate_lines(&blended, &path, n)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Blended {} users into {}", blended.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            for (user, repos) in &blended {
                writeln!(stdout, "{}", results::format_line(*user, repos, n))?;
            }
        }
    }

    Ok(())
}
