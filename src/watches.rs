// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! User watch store and repository popularity

use crate::error::Result;
use crate::types::{Popularity, RepoId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Watched repositories per user, with popularity derived from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchStore {
    watches: BTreeMap<UserId, BTreeSet<RepoId>>,
    popularity: BTreeMap<RepoId, Popularity>,
    total_watches: u64,
}

impl WatchStore {
    /// Build from `(user, repo)` watch edges; duplicate edges count once
    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = (UserId, RepoId)>) -> Self {
        let mut watches: BTreeMap<UserId, BTreeSet<RepoId>> = BTreeMap::new();
        for (user, repo) in edges {
            watches.entry(user).or_default().insert(repo);
        }
        Self::from_watches(watches)
    }

    /// Build from per-user watch sets
    #[must_use]
    pub fn from_watches(watches: BTreeMap<UserId, BTreeSet<RepoId>>) -> Self {
        let total_watches: u64 = watches.values().map(|w| w.len() as u64).sum();
        debug!("Total watches is {}", total_watches);

        let mut counts: BTreeMap<RepoId, u32> = BTreeMap::new();
        for repo in watches.values().flatten() {
            *counts.entry(*repo).or_default() += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let popularity = counts
            .into_iter()
            .map(|(repo, count)| {
                let relative = f64::from(count) / total_watches as f64;
                (repo, Popularity { count, relative })
            })
            .collect();

        Self {
            watches,
            popularity,
            total_watches,
        }
    }

    /// Repositories watched by a user; empty for unknown users
    #[must_use]
    pub fn watched(&self, user: UserId) -> &BTreeSet<RepoId> {
        static EMPTY: BTreeSet<RepoId> = BTreeSet::new();
        self.watches.get(&user).unwrap_or(&EMPTY)
    }

    /// Iterate over every user and their watch set, ordered by user id
    pub fn users(&self) -> impl Iterator<Item = (UserId, &BTreeSet<RepoId>)> {
        self.watches.iter().map(|(user, repos)| (*user, repos))
    }

    /// Number of users with at least one watch
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.watches.len()
    }

    /// Total number of watch edges
    #[must_use]
    pub fn total_watches(&self) -> u64 {
        self.total_watches
    }

    /// Popularity record of a repository
    #[must_use]
    pub fn popularity(&self, repo: RepoId) -> Option<Popularity> {
        self.popularity.get(&repo).copied()
    }

    /// Absolute watch count of a repository; zero when never watched
    #[must_use]
    pub fn watch_count(&self, repo: RepoId) -> u32 {
        self.popularity.get(&repo).map_or(0, |p| p.count)
    }

    /// Sort repositories by watch count descending, then id ascending
    pub fn sort_by_popularity(&self, repos: &mut [RepoId]) {
        repos.sort_by(|a, b| {
            self.watch_count(*b)
                .cmp(&self.watch_count(*a))
                .then_with(|| a.cmp(b))
        });
    }

    /// Every watched repository, most popular first (ties by id)
    #[must_use]
    pub fn top_repos(&self) -> Vec<RepoId> {
        let mut repos: Vec<RepoId> = self.popularity.keys().copied().collect();
        self.sort_by_popularity(&mut repos);
        repos
    }

    /// Load a persisted watch table; `None` when the file is absent
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!("Loading watch table {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Persist the watch table
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        debug!("Wrote watch table {}", path.display());
        Ok(())
    }
}
