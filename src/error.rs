// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error taxonomy for the build and query phases

use crate::types::RepoId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the library
#[derive(Debug, Error)]
pub enum Error {
    /// A fork was reached before its origin had its own ancestry established.
    /// The input data is misordered or malformed and must be fixed upstream.
    #[error("forked repository {repo} processed before the ancestry of its origin {origin} was established")]
    Integrity {
        /// The fork being processed
        repo: RepoId,
        /// The forked origin with an empty ancestor set
        origin: RepoId,
    },

    /// The fork pointers form a cycle
    #[error("fork pointers form a cycle through repository {0}")]
    ForkCycle(RepoId),

    /// A raw input line could not be parsed
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// A raw input file is missing, so a derived artifact cannot be rebuilt
    #[error("raw input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// The co-watch build ran past its configured deadline
    #[error("co-watch build exceeded its deadline")]
    DeadlineExceeded,

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error for a persisted table
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Co-watch table storage error
    #[error("sqlite error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Library result type
pub type Result<T> = std::result::Result<T, Error>;
