// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FORKWATCH";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the raw inputs (repos.txt, lang.txt, data.txt, test.txt)
    pub source_dir: PathBuf,
    /// Directory for derived artifacts (tables, candidate files)
    pub derived_dir: PathBuf,
    /// Number of recommendations per user
    pub candidates: usize,
    /// Skip already-watched repositories in the global popularity fallback too
    pub fallback_excludes_watched: bool,
    /// Deadline for the co-watch build, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_timeout_secs: Option<u64>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = directories::ProjectDirs::from("com", "hyperpolymath", "forkwatch");
        Self {
            source_dir: dirs
                .as_ref()
                .map(|d| d.data_dir().join("source"))
                .unwrap_or_else(|| PathBuf::from("data")),
            derived_dir: dirs
                .as_ref()
                .map(|d| d.cache_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("calc")),
            candidates: 20,
            fallback_excludes_watched: false,
            build_timeout_secs: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Raw repository records
    #[must_use]
    pub fn repos_input(&self) -> PathBuf {
        self.source_dir.join("repos.txt")
    }

    /// Raw language records
    #[must_use]
    pub fn languages_input(&self) -> PathBuf {
        self.source_dir.join("lang.txt")
    }

    /// Raw watch records
    #[must_use]
    pub fn watches_input(&self) -> PathBuf {
        self.source_dir.join("data.txt")
    }

    /// Test user id list
    #[must_use]
    pub fn test_users_input(&self) -> PathBuf {
        self.source_dir.join("test.txt")
    }

    /// Persisted repository table
    #[must_use]
    pub fn repo_table(&self) -> PathBuf {
        self.derived_dir.join("repos.json")
    }

    /// Persisted watch table
    #[must_use]
    pub fn watch_table(&self) -> PathBuf {
        self.derived_dir.join("watches.json")
    }

    /// Persisted co-watch probability table
    #[must_use]
    pub fn cowatch_table(&self) -> PathBuf {
        self.derived_dir.join("cowatch.sqlite3")
    }

    /// Candidate file produced by the probabilistic seed phase
    #[must_use]
    pub fn seed_candidates(&self) -> PathBuf {
        self.derived_dir
            .join(format!("results-prob-{}.txt", self.candidates))
    }

    /// Candidate file produced by the full funnel
    #[must_use]
    pub fn filled_candidates(&self) -> PathBuf {
        self.derived_dir
            .join(format!("results-filled-{}.txt", self.candidates))
    }

    /// Build deadline as a duration
    #[must_use]
    pub fn build_timeout(&self) -> Option<std::time::Duration> {
        self.build_timeout_secs.map(std::time::Duration::from_secs)
    }
}

/// Load configuration: defaults, then the optional TOML file, then `FORKWATCH_*` variables
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut builder = ::config::Config::builder()
        .add_source(::config::Config::try_from(&Config::default())?);

    if let Some(path) = path {
        builder = builder.add_source(
            ::config::File::from(path)
                .format(::config::FileFormat::Toml)
                .required(true),
        );
    }

    let settings = builder
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.candidates, 20);
        assert!(!config.fallback_excludes_watched);
        assert!(config.build_timeout().is_none());
        assert!(config.repos_input().ends_with("repos.txt"));
        assert!(config.seed_candidates().ends_with("results-prob-20.txt"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forkwatch.toml");
        fs::write(
            &path,
            "source_dir = \"/srv/ghc/raw\"\ncandidates = 10\nbuild_timeout_secs = 600\n",
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();

        assert_eq!(config.source_dir, PathBuf::from("/srv/ghc/raw"));
        assert_eq!(config.candidates, 10);
        assert_eq!(config.build_timeout_secs, Some(600));
        assert_eq!(config.filled_candidates().file_name().unwrap(), "results-filled-10.txt");
    }
}
