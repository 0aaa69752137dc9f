// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - shows the effective configuration

use anyhow::{Context, Result};
use forkwatch::config::Config;

/// Print the whole configuration as TOML, or a single key's value
pub fn run(config: &Config, key: Option<&str>) -> Result<()> {
    let rendered = toml::Value::try_from(config).context("Failed to serialize configuration")?;

    match key {
        None => {
            let text = toml::to_string_pretty(&rendered).context("Failed to render configuration")?;
            print!("{text}");
        }
        Some(key) => {
            let value = rendered
                .get(key)
                .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
            match value {
                toml::Value::String(s) => println!("{s}"),
                other => println!("{other}"),
            }
        }
    }

    Ok(())
}
