// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Co-watch probability table
//!
//! The build phase counts, for every ordered pair `(i, j)` of repositories
//! watched by the same user, how many users watch both, and derives
//! `P(watch j | watch i) = co_freq / popularity(i)`. The persisted table is a
//! SQLite `WITHOUT ROWID` table clustered on `(src, dst)`, so scanning every
//! edge of one source repository is a contiguous range read.

use crate::error::{Error, Result};
use crate::types::{CoWatchEdge, RelatedRepo, RepoId};
use crate::watches::WatchStore;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Edges with a lower conditional probability are not persisted
pub const MIN_PROBABILITY: f64 = 0.001;

/// Upper bound on edges read per source repository; effectively "all"
pub const SCAN_LIMIT: usize = 1_000_000;

/// Round a probability to the four decimals kept in the persisted table
#[must_use]
pub fn round_probability(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}

/// Anything that can enumerate co-watch edges by their first repository
pub trait CoWatchSource {
    /// Edges whose first component is `src`, ordered by second component,
    /// at most `limit` of them
    fn edges_from(&self, src: RepoId, limit: usize) -> Result<Vec<CoWatchEdge>>;

    /// Every edge leaving any of `sources`, except edges pointing back into
    /// `sources`. A related repository reachable from several sources appears
    /// once per source.
    fn related_repos(&self, sources: &BTreeSet<RepoId>) -> Result<Vec<RelatedRepo>> {
        let mut related = Vec::new();
        for &src in sources {
            related.extend(
                self.edges_from(src, SCAN_LIMIT)?
                    .into_iter()
                    .filter(|edge| !sources.contains(&edge.dst))
                    .map(RelatedRepo::from),
            );
        }
        debug!("Retrieved {} related repos for {} sources", related.len(), sources.len());
        Ok(related)
    }
}

// =============================================================================
// Build phase
// =============================================================================

/// Unrounded, unfiltered co-watch statistics held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoWatchMatrix {
    edges: BTreeMap<(RepoId, RepoId), CoWatchEdge>,
}

impl CoWatchMatrix {
    /// Count co-watches over every user with more than one watched repository.
    ///
    /// The accumulation is quadratic in each user's watch-set size; when a
    /// `timeout` is given the build fails with [`Error::DeadlineExceeded`]
    /// once it is exceeded.
    pub fn compute(watches: &WatchStore, timeout: Option<Duration>) -> Result<Self> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        Self::compute_until(watches, deadline)
    }

    fn compute_until(watches: &WatchStore, deadline: Option<Instant>) -> Result<Self> {
        let lists: Vec<&BTreeSet<RepoId>> = watches
            .users()
            .map(|(_, repos)| repos)
            .filter(|repos| repos.len() > 1)
            .collect();

        info!("Computing co-watch counts over {} watch lists", lists.len());

        let mut counts: HashMap<(RepoId, RepoId), u32> = HashMap::new();
        for (done, repos) in lists.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Error::DeadlineExceeded);
            }
            if done % 10_000 == 0 {
                debug!("Processing watch list {} of {}", done + 1, lists.len());
            }

            for &i in *repos {
                for &j in *repos {
                    if i != j {
                        *counts.entry((i, j)).or_default() += 1;
                    }
                }
            }
        }

        let edges = counts
            .into_iter()
            .map(|((src, dst), co_freq)| {
                let cond_prob = f64::from(co_freq) / f64::from(watches.watch_count(src));
                (
                    (src, dst),
                    CoWatchEdge {
                        src,
                        dst,
                        co_freq,
                        cond_prob,
                    },
                )
            })
            .collect();

        Ok(Self { edges })
    }

    /// Exact lookup of the ordered pair `(src, dst)`
    #[must_use]
    pub fn get(&self, src: RepoId, dst: RepoId) -> Option<&CoWatchEdge> {
        self.edges.get(&(src, dst))
    }

    /// All edges ordered by `(src, dst)`
    pub fn edges(&self) -> impl Iterator<Item = &CoWatchEdge> {
        self.edges.values()
    }

    /// Number of ordered pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether no pair was co-watched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl CoWatchSource for CoWatchMatrix {
    fn edges_from(&self, src: RepoId, limit: usize) -> Result<Vec<CoWatchEdge>> {
        Ok(self
            .edges
            .range((src, RepoId::MIN)..=(src, RepoId::MAX))
            .map(|(_, edge)| *edge)
            .take(limit)
            .collect())
    }
}

// =============================================================================
// Persisted table
// =============================================================================

/// Handle on the persisted co-watch table. The connection closes on drop.
pub struct CoWatchTable {
    conn: Connection,
}

impl CoWatchTable {
    /// Whether a persisted table exists at `path`
    #[must_use]
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Create an empty table at `path`, discarding any previous one
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if path.exists() {
            fs::remove_file(path)?;
        }

        let conn = Connection::open(path)?;
        let table = Self { conn };
        table.init()?;
        Ok(table)
    }

    /// Open an existing table for queries only
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open an empty in-memory table
    pub fn open_in_memory() -> Result<Self> {
        let table = Self {
            conn: Connection::open_in_memory()?,
        };
        table.init()?;
        Ok(table)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            PRAGMA synchronous = OFF;

            CREATE TABLE IF NOT EXISTS cowatch (
                src INTEGER NOT NULL,
                dst INTEGER NOT NULL,
                co_freq INTEGER NOT NULL,
                cond_prob REAL NOT NULL,
                PRIMARY KEY (src, dst)
            ) WITHOUT ROWID;
            ",
        )?;
        Ok(())
    }

    /// Write edges with a probability of at least [`MIN_PROBABILITY`],
    /// rounded to four decimals. Returns the number of rows written.
    pub fn write_edges<'a>(&mut self, edges: impl IntoIterator<Item = &'a CoWatchEdge>) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO cowatch (src, dst, co_freq, cond_prob) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for edge in edges {
                if edge.src == edge.dst || edge.cond_prob < MIN_PROBABILITY {
                    continue;
                }
                stmt.execute(params![
                    edge.src,
                    edge.dst,
                    edge.co_freq,
                    round_probability(edge.cond_prob)
                ])?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Build the co-watch statistics and persist them to a fresh table at `path`.
    ///
    /// Rows are written to a staging file next to `path`, which only replaces
    /// `path` once every row is committed. A failed or interrupted build never
    /// leaves a table at `path`.
    pub fn build(path: &Path, watches: &WatchStore, timeout: Option<Duration>) -> Result<usize> {
        let matrix = CoWatchMatrix::compute(watches, timeout)?;
        let staging = staging_path(path);
        info!("Persisting co-watch probabilities to {}", staging.display());

        let mut table = Self::create(&staging)?;
        let written = table.write_edges(matrix.edges())?;
        drop(table);

        fs::rename(&staging, path)?;
        info!("Wrote {} of {} co-watch pairs to {}", written, matrix.len(), path.display());
        Ok(written)
    }

    /// Exact lookup of the ordered pair `(src, dst)`
    pub fn get(&self, src: RepoId, dst: RepoId) -> Result<Option<CoWatchEdge>> {
        let edge = self
            .conn
            .prepare_cached("SELECT src, dst, co_freq, cond_prob FROM cowatch WHERE src = ?1 AND dst = ?2")?
            .query_row(params![src, dst], |row| {
                Ok(CoWatchEdge {
                    src: row.get(0)?,
                    dst: row.get(1)?,
                    co_freq: row.get(2)?,
                    cond_prob: row.get(3)?,
                })
            })
            .optional()?;
        Ok(edge)
    }

    /// Number of persisted edges
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cowatch", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Whether the table holds no edges
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Sibling of `path` that a build writes before it is moved into place
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl CoWatchSource for CoWatchTable {
    fn edges_from(&self, src: RepoId, limit: usize) -> Result<Vec<CoWatchEdge>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT src, dst, co_freq, cond_prob FROM cowatch WHERE src = ?1 ORDER BY dst LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![src, limit], |row| {
            Ok(CoWatchEdge {
                src: row.get(0)?,
                dst: row.get(1)?,
                co_freq: row.get(2)?,
                cond_prob: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
