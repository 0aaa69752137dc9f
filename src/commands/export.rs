// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Export command - exports the fork lineage graph to various formats

use anyhow::{Context, Result};
use forkwatch::config::Config;
use forkwatch::pipeline;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Graphviz DOT format
    Dot,
    /// JSON format
    Json,
}

impl ExportFormat {
    /// Parse format from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dot" | "graphviz" => Some(Self::Dot),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get file extension for format
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Json => "json",
        }
    }
}

/// Run the export command
pub fn run(config: &Config, format: &str, output: Option<PathBuf>, repo: Option<&str>) -> Result<()> {
    info!("Exporting lineage to {}", format);

    let export_format = ExportFormat::parse(format)
        .ok_or_else(|| anyhow::anyhow!("Unknown export format: {}. Supported: dot, json", format))?;

    let graph = pipeline::load_repos(config, false)
        .with_context(|| format!("Failed to load repo table from {}", config.derived_dir.display()))?;

    let focus = match repo {
        Some(query) => Some(super::lineage::resolve_repo(&graph, query)?),
        None => None,
    };

    let content = match export_format {
        ExportFormat::Dot => graph.to_dot(focus),
        ExportFormat::Json => graph.to_json(focus)?,
    };

    match output {
        Some(path) => {
            let path = if path.extension().is_none() {
                path.with_extension(export_format.extension())
            } else {
                path
            };
            fs::write(&path, &content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
