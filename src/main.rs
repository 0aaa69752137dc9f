// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Forkwatch CLI - repository recommendations from fork lineage and co-watch statistics

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use forkwatch::config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "forkwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "FORKWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Raw input directory override
    #[arg(long, global = true)]
    source_dir: Option<PathBuf>,

    /// Derived artifact directory override
    #[arg(long, global = true)]
    derived_dir: Option<PathBuf>,

    /// Recommendations per user
    #[arg(short = 'n', long, global = true)]
    candidates: Option<usize>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the repository, watch and co-watch tables
    Build {
        /// Rebuild even when the tables already exist
        #[arg(short, long)]
        force: bool,
    },

    /// Write probabilistic seed candidates for the test users
    Seed {
        /// Output file (defaults to the derived directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the candidate funnel over a seed file
    Fill {
        /// Seed candidate file
        #[arg(short, long)]
        seed: Option<PathBuf>,

        /// Output file (defaults to the derived directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every phase whose output is missing
    Run {
        /// Recompute every phase
        #[arg(short, long)]
        force: bool,
    },

    /// Put the head of one candidate file in front of another
    Blend {
        /// Candidate file that fills the tail of each list
        primary: PathBuf,

        /// Candidate file whose first entries lead each list
        secondary: PathBuf,

        /// Entries taken from the secondary file
        #[arg(long, default_value_t = 5)]
        lead: usize,

        /// Maximum entries per user
        #[arg(long, default_value_t = 10)]
        max: usize,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the fork ancestry of a repository
    Lineage {
        /// Repository id, owner/name or name
        repo: String,
    },

    /// List repositories co-watched with a repository
    Related {
        /// Repository id, owner/name or name
        repo: String,

        /// Maximum entries shown
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Export the fork lineage graph
    Export {
        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only the lineage of this repository
        #[arg(long)]
        repo: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Configuration key (omit to show everything)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.source_dir {
        config.source_dir = dir;
    }
    if let Some(dir) = cli.derived_dir {
        config.derived_dir = dir;
    }
    if let Some(n) = cli.candidates {
        config.candidates = n;
    }

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color;

    // Execute command
    match cli.command {
        Commands::Build { force } => commands::build::run(&config, force),
        Commands::Seed { output } => commands::seed::run(&config, output),
        Commands::Fill { seed, output } => commands::fill::run(&config, seed, output),
        Commands::Run { force } => commands::run::run(&config, force),
        Commands::Blend { primary, secondary, lead, max, output } => {
            commands::blend::run(&primary, &secondary, lead, max, output)
        }
        Commands::Lineage { repo } => commands::lineage::run(&config, &repo, color),
        Commands::Related { repo, limit } => commands::related::run(&config, &repo, limit),
        Commands::Export { format, output, repo } => {
            commands::export::run(&config, &format, output, repo.as_deref())
        }
        Commands::Config { key } => commands::config::run(&config, key.as_deref()),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}
