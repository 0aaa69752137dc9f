// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Lineage command - shows the fork ancestry of a repository

use anyhow::{Context, Result};
use forkwatch::config::Config;
use forkwatch::graph::RepoGraph;
use forkwatch::pipeline;
use forkwatch::types::RepoId;
use owo_colors::OwoColorize;

/// Run the lineage command
pub fn run(config: &Config, query: &str, color: bool) -> Result<()> {
    let graph = pipeline::load_repos(config, false)
        .with_context(|| format!("Failed to load repo table from {}", config.derived_dir.display()))?;

    let id = resolve_repo(&graph, query)?;
    let Some(repo) = graph.get(id) else {
        anyhow::bail!("Repo not found: {}", query);
    };

    let heading = format!("{} ({})", repo.full_name(), repo.id);
    if color {
        println!("{}", heading.bold());
    } else {
        println!("{heading}");
    }
    println!("  created: {}", repo.created.format("%Y-%m-%d"));
    if let Some(origin) = repo.fork_of {
        println!("  forked from: {}", describe(&graph, origin));
    }

    for (label, ids) in [("ancestors", &repo.ancestors), ("descendants", &repo.descendants)] {
        println!("  {} ({}):", label, ids.len());
        for &other in ids {
            let line = describe(&graph, other);
            if color {
                println!("    {}", line.cyan());
            } else {
                println!("    {line}");
            }
        }
    }

    if !repo.languages.is_empty() {
        println!("  languages:");
        for lang in &repo.languages {
            println!("    {} {} lines ({:.1}%)", lang.name, lang.lines, lang.fraction * 100.0);
        }
    }

    Ok(())
}

fn describe(graph: &RepoGraph, id: RepoId) -> String {
    graph
        .get(id)
        .map_or_else(|| id.to_string(), |r| format!("{} ({})", r.full_name(), r.id))
}

/// Resolve a repository id, `owner/name`, or unique bare name to an id
pub fn resolve_repo(graph: &RepoGraph, query: &str) -> Result<RepoId> {
    let matches = graph.find(query);
    match matches.len() {
        0 => anyhow::bail!("No repo found matching: {}", query),
        1 => Ok(matches[0].id),
        _ => {
            eprintln!("Multiple repos match '{}':", query);
            for r in &matches {
                eprintln!("  {} ({})", r.full_name(), r.id);
            }
            anyhow::bail!("Ambiguous repo name. Use the numeric id or owner/name.");
        }
    }
}
