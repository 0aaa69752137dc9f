// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Raw input parsing
//!
//! All four inputs are line oriented:
//!
//! * repositories: `id:owner/name,YYYY-MM-DD[,forkOfId]`
//! * languages: `repoId:lang;lines,lang;lines,...`
//! * watches: `userId:repoId`
//! * test users: one user id per line
//!
//! Blank lines are ignored everywhere.

use crate::error::{Error, Result};
use crate::types::{Repo, RepoId, UserId};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Language entries of one repository, before fractions are computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRecord {
    /// Repository the record refers to
    pub repo: RepoId,
    /// `(language, raw line count)` in input order
    pub entries: Vec<(String, u64)>,
}

impl LanguageRecord {
    /// Sum of the raw line counts
    #[must_use]
    pub fn total_lines(&self) -> u64 {
        self.entries.iter().map(|(_, lines)| lines).sum()
    }
}

/// Read repository records
pub fn read_repos(path: &Path) -> Result<Vec<Repo>> {
    read_lines(path, parse_repo_line)
}

/// Read language records
pub fn read_languages(path: &Path) -> Result<Vec<LanguageRecord>> {
    read_lines(path, parse_language_line)
}

/// Read watch edges as `(user, repo)` pairs
pub fn read_watches(path: &Path) -> Result<Vec<(UserId, RepoId)>> {
    read_lines(path, parse_watch_line)
}

/// Read the ids of the users to recommend for
pub fn read_test_users(path: &Path) -> Result<Vec<UserId>> {
    read_lines(path, |line| parse_id(line, "user id"))
}

/// Apply `parse` to every non-blank line, attaching file and line number to failures
fn read_lines<T>(path: &Path, parse: impl Fn(&str) -> std::result::Result<T, String>) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::MissingInput(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    debug!("Reading {}", path.display());

    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = parse(line).map_err(|reason| Error::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
        out.push(value);
    }

    debug!("Read {} records from {}", out.len(), path.display());
    Ok(out)
}

/// Parse `id:owner/name,YYYY-MM-DD[,forkOfId]`
pub fn parse_repo_line(line: &str) -> std::result::Result<Repo, String> {
    let (id, rest) = line
        .split_once(':')
        .ok_or_else(|| format!("missing ':' in repository record {line:?}"))?;
    let id = parse_id(id, "repository id")?;

    let mut fields = rest.split(',');
    let full_name = fields.next().unwrap_or_default();
    let (owner, name) = full_name
        .split_once('/')
        .ok_or_else(|| format!("expected owner/name, got {full_name:?}"))?;

    let created = fields
        .next()
        .ok_or_else(|| format!("missing creation date for repository {id}"))?;
    let created = NaiveDate::parse_from_str(created.trim(), "%Y-%m-%d")
        .map_err(|e| format!("bad creation date {created:?}: {e}"))?;

    let fork_of = fields
        .next()
        .map(|f| parse_id(f, "fork origin id"))
        .transpose()?;

    if fields.next().is_some() {
        return Err(format!("trailing fields in repository record {line:?}"));
    }

    Ok(Repo::new(id, owner, name, created, fork_of))
}

/// Parse `repoId:lang;lines,lang;lines,...`
pub fn parse_language_line(line: &str) -> std::result::Result<LanguageRecord, String> {
    let (repo, rest) = line
        .split_once(':')
        .ok_or_else(|| format!("missing ':' in language record {line:?}"))?;
    let repo = parse_id(repo, "repository id")?;

    let entries = rest
        .split(',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (lang, lines) = pair
                .split_once(';')
                .ok_or_else(|| format!("expected lang;lines, got {pair:?}"))?;
            let lines = lines
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("bad line count {lines:?}: {e}"))?;
            Ok((lang.to_string(), lines))
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;

    Ok(LanguageRecord { repo, entries })
}

/// Parse `userId:repoId`
pub fn parse_watch_line(line: &str) -> std::result::Result<(UserId, RepoId), String> {
    let (user, repo) = line
        .split_once(':')
        .ok_or_else(|| format!("missing ':' in watch record {line:?}"))?;
    Ok((parse_id(user, "user id")?, parse_id(repo, "repository id")?))
}

fn parse_id(s: &str, what: &str) -> std::result::Result<u32, String> {
    s.trim()
        .parse::<u32>()
        .map_err(|e| format!("bad {what} {s:?}: {e}"))
}
