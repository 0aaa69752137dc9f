// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Candidate files
//!
//! One line per user, `userId:repo1,repo2,...`; an empty list is `userId:`.

use crate::error::{Error, Result};
use crate::types::{CandidateList, RepoId, UserId};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Candidate lists keyed by user
pub type CandidateMap = BTreeMap<UserId, CandidateList>;

/// Render one candidate line, keeping at most `n` entries
#[must_use]
pub fn format_line(user: UserId, repos: &[RepoId], n: usize) -> String {
    let list = repos
        .iter()
        .take(n)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{user}:{list}")
}

/// Parse one candidate line
pub fn parse_line(line: &str) -> std::result::Result<(UserId, CandidateList), String> {
    let (user, repos) = line
        .split_once(':')
        .ok_or_else(|| format!("missing ':' in candidate line {line:?}"))?;
    let user = user
        .trim()
        .parse::<UserId>()
        .map_err(|e| format!("bad user id {user:?}: {e}"))?;

    let repos = repos.trim();
    if repos.is_empty() {
        return Ok((user, Vec::new()));
    }

    let list = repos
        .split(',')
        .map(|r| {
            r.trim()
                .parse::<RepoId>()
                .map_err(|e| format!("bad repository id {r:?}: {e}"))
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;
    Ok((user, list))
}

/// One candidate file line: a user and its ordered list
pub type CandidateLine = (UserId, CandidateList);

/// Write candidate lists sorted by user id, at most `n` entries each
pub fn write_candidates(candidates: &CandidateMap, path: &Path, n: usize) -> Result<()> {
    write_lines(candidates.iter().map(|(user, repos)| (*user, repos.as_slice())), path, n)
}

/// Write candidate lines in the given order, at most `n` entries each
pub fn write_candidate_lines(lines: &[CandidateLine], path: &Path, n: usize) -> Result<()> {
    write_lines(lines.iter().map(|(user, repos)| (*user, repos.as_slice())), path, n)
}

fn write_lines<'a>(
    lines: impl Iterator<Item = (UserId, &'a [RepoId])>,
    path: &Path,
    n: usize,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("Writing results to {}", path.display());
    let mut out = std::io::BufWriter::new(fs::File::create(path)?);
    let mut written = 0usize;
    for (user, repos) in lines {
        writeln!(out, "{}", format_line(user, repos, n))?;
        written += 1;
    }
    out.flush()?;
    debug!("Wrote {} candidate lines to {}", written, path.display());
    Ok(())
}

/// Read a candidate file keyed by user
pub fn read_candidates(path: &Path) -> Result<CandidateMap> {
    Ok(read_candidate_lines(path)?.into_iter().collect())
}

/// Read a candidate file keeping line order
pub fn read_candidate_lines(path: &Path) -> Result<Vec<CandidateLine>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::MissingInput(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    debug!("Reading candidates from {}", path.display());
    let mut lines = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = parse_line(line).map_err(|reason| Error::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
        lines.push(parsed);
    }
    Ok(lines)
}

/// Put up to `lead` entries of the `secondary` line in front of the `primary`
/// line at the same position, skip repeats, and cut the result to `n` entries.
///
/// Lines are paired by position, not by user id; the user of each output line
/// is the primary one. Primary lines without a secondary counterpart are only
/// truncated, and surplus secondary lines are dropped.
#[must_use]
pub fn blend(primary: &[CandidateLine], secondary: &[CandidateLine], lead: usize, n: usize) -> Vec<CandidateLine> {
    primary
        .iter()
        .enumerate()
        .map(|(idx, (user, main))| {
            let front = secondary
                .get(idx)
                .map_or(&[][..], |(_, s)| &s[..s.len().min(lead)]);

            let mut seen = HashSet::new();
            let merged = front
                .iter()
                .chain(main.iter())
                .copied()
                .filter(|r| seen.insert(*r))
                .take(n)
                .collect();
            (*user, merged)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(7, &[1, 2, 3], 2), "7:1,2");
        assert_eq!(format_line(7, &[], 10), "7:");
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("7:1,2").unwrap(), (7, vec![1, 2]));
        assert_eq!(parse_line("7:").unwrap(), (7, vec![]));
        assert!(parse_line("7").is_err());
        assert!(parse_line("7:1,x").is_err());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("results.txt");

        let mut candidates = CandidateMap::new();
        candidates.insert(20, vec![5, 6, 7]);
        candidates.insert(3, vec![]);

        write_candidates(&candidates, &path, 2).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "3:\n20:5,6\n");

        let read = read_candidates(&path).unwrap();
        assert_eq!(read.get(&20), Some(&vec![5, 6]));
        assert_eq!(read.get(&3), Some(&vec![]));
    }

    #[test]
    fn test_read_keeps_line_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.txt");
        fs::write(&path, "20:5\n\n3:\n").unwrap();

        let lines = read_candidate_lines(&path).unwrap();
        assert_eq!(lines, vec![(20, vec![5]), (3, vec![])]);

        write_candidate_lines(&lines, &path, 10).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "20:5\n3:\n");
    }

    #[test]
    fn test_blend() {
        let primary = vec![(1, (100..120).collect()), (2, vec![1, 2, 3])];
        let secondary = vec![(1, vec![50, 101, 51, 52, 53, 54, 55])];

        let blended = blend(&primary, &secondary, 5, 10);

        assert_eq!(blended[0], (1, vec![50, 101, 51, 52, 53, 100, 102, 103, 104, 105]));
        assert_eq!(blended[1], (2, vec![1, 2, 3]));
        assert_eq!(blended.len(), 2);
    }

    #[test]
    fn test_blend_pairs_lines_by_position() {
        // The secondary file names other users; only the line position counts
        let primary = vec![(7, vec![1, 2]), (3, vec![4])];
        let secondary = vec![(99, vec![9]), (98, vec![8, 4]), (97, vec![6])];

        let blended = blend(&primary, &secondary, 5, 10);

        assert_eq!(blended, vec![(7, vec![9, 1, 2]), (3, vec![8, 4])]);
    }
}
