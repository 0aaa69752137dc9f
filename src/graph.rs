// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Repository store and fork lineage construction
//!
//! Repositories live in an arena indexed by position, with a side map from
//! repository id to arena slot. Ancestor and descendant sets hold repository
//! ids and are only written by [`RepoGraph::build_lineage`].

use crate::error::{Error, Result};
use crate::ingest::LanguageRecord;
use crate::types::{LanguageShare, Repo, RepoId};
use chrono::NaiveDate;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// One component of a repository's lineage sort key.
///
/// A key is the chain of `(created, forked)` stamps from the repository down
/// to its root origin, followed by the ids along that chain from the root
/// back up to the repository itself. Comparing keys lexicographically orders
/// by date, then roots before forks, then recursively by fork origin, then by
/// id, and always places an origin before its same-day forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Stamp(NaiveDate, bool),
    Id(RepoId),
}

/// The repository store with resolved fork lineage
#[derive(Debug, Clone, Default)]
pub struct RepoGraph {
    repos: Vec<Repo>,
    index: HashMap<RepoId, usize>,
}

impl RepoGraph {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the store from raw records: lineage first, then languages
    pub fn build(repos: Vec<Repo>, languages: &[LanguageRecord]) -> Result<Self> {
        let mut graph = Self::new();
        for repo in repos {
            graph.add_repo(repo);
        }
        graph.build_lineage()?;
        graph.apply_languages(languages);
        Ok(graph)
    }

    /// Add a repository, replacing any previous entry with the same id
    pub fn add_repo(&mut self, repo: Repo) {
        if let Some(&slot) = self.index.get(&repo.id) {
            self.repos[slot] = repo;
        } else {
            self.index.insert(repo.id, self.repos.len());
            self.repos.push(repo);
        }
    }

    /// Get a repo by id
    #[must_use]
    pub fn get(&self, id: RepoId) -> Option<&Repo> {
        self.index.get(&id).map(|&slot| &self.repos[slot])
    }

    /// Whether the store knows this id
    #[must_use]
    pub fn contains(&self, id: RepoId) -> bool {
        self.index.contains_key(&id)
    }

    /// All repositories in insertion order
    #[must_use]
    pub fn repos(&self) -> &[Repo] {
        &self.repos
    }

    /// Number of repositories
    #[must_use]
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Ancestors and descendants of a repository combined
    #[must_use]
    pub fn relatives(&self, id: RepoId) -> BTreeSet<RepoId> {
        self.get(id)
            .map(|r| r.ancestors.union(&r.descendants).copied().collect())
            .unwrap_or_default()
    }

    /// Find repositories by numeric id, `owner/name`, or bare name
    #[must_use]
    pub fn find(&self, query: &str) -> Vec<&Repo> {
        if let Ok(id) = query.parse::<RepoId>() {
            return self.get(id).into_iter().collect();
        }
        if query.contains('/') {
            return self.repos.iter().filter(|r| r.full_name() == query).collect();
        }
        self.repos.iter().filter(|r| r.name == query).collect()
    }

    /// Order in which lineage is resolved: every origin precedes its forks
    /// whenever the creation dates allow it
    pub fn lineage_order(&self) -> Result<Vec<RepoId>> {
        self.check_acyclic()?;
        let mut slots: Vec<usize> = (0..self.repos.len()).collect();
        slots.sort_by_cached_key(|&slot| self.lineage_key(slot));
        Ok(slots.into_iter().map(|slot| self.repos[slot].id).collect())
    }

    fn lineage_key(&self, slot: usize) -> Vec<KeyPart> {
        let mut chain = vec![slot];
        let mut current = slot;
        while let Some(origin) = self.repos[current].fork_of.and_then(|id| self.index.get(&id)) {
            chain.push(*origin);
            current = *origin;
        }

        let mut key: Vec<KeyPart> = chain
            .iter()
            .map(|&s| KeyPart::Stamp(self.repos[s].created, self.repos[s].is_forked()))
            .collect();
        key.extend(chain.iter().rev().map(|&s| KeyPart::Id(self.repos[s].id)));
        key
    }

    /// Fork pointers as a directed graph (origin -> fork), node index == arena slot
    fn fork_forest(&self) -> DiGraph<RepoId, ()> {
        let mut forest = DiGraph::with_capacity(self.repos.len(), self.repos.len());
        for repo in &self.repos {
            forest.add_node(repo.id);
        }
        for (slot, repo) in self.repos.iter().enumerate() {
            if let Some(origin) = repo.fork_of.and_then(|id| self.index.get(&id)) {
                forest.add_edge(NodeIndex::new(*origin), NodeIndex::new(slot), ());
            }
        }
        forest
    }

    fn check_acyclic(&self) -> Result<()> {
        let forest = self.fork_forest();
        toposort(&forest, None)
            .map(|_| ())
            .map_err(|cycle| Error::ForkCycle(forest[cycle.node_id()]))
    }

    /// Resolve ancestors and descendants for every repository.
    ///
    /// Fork pointers to unknown repositories are logged and dropped. Fails with
    /// [`Error::Integrity`] when a fork is reached before its forked origin has
    /// any ancestry, and with [`Error::ForkCycle`] when fork pointers loop.
    pub fn build_lineage(&mut self) -> Result<()> {
        for repo in &mut self.repos {
            repo.ancestors.clear();
            repo.descendants.clear();
            if let Some(origin) = repo.fork_of {
                if !self.index.contains_key(&origin) {
                    warn!("Repo {} is forked from unknown repo {}, treating as root", repo.id, origin);
                    repo.fork_of = None;
                }
            }
        }

        let order = self.lineage_order()?;
        info!("Resolving lineage for {} repos", order.len());

        for id in order {
            let slot = self.index[&id];
            let Some(origin_id) = self.repos[slot].fork_of else {
                continue;
            };
            let origin = self.index[&origin_id];

            self.repos[slot].ancestors.insert(origin_id);
            self.repos[origin].descendants.insert(id);

            // Walk the origin's own ancestry and register the new fork along it
            let mut pending = vec![origin];
            let mut visited = HashSet::new();
            while let Some(current) = pending.pop() {
                if !self.repos[current].is_forked() || !visited.insert(current) {
                    continue;
                }
                if self.repos[current].ancestors.is_empty() {
                    return Err(Error::Integrity {
                        repo: id,
                        origin: self.repos[current].id,
                    });
                }

                let inherited: Vec<RepoId> = self.repos[current].ancestors.iter().copied().collect();
                for ancestor in inherited {
                    let ancestor_slot = self.index[&ancestor];
                    self.repos[slot].ancestors.insert(ancestor);
                    self.repos[ancestor_slot].descendants.insert(id);
                    if self.repos[ancestor_slot].is_forked() {
                        pending.push(ancestor_slot);
                    }
                }
            }
        }

        Ok(())
    }

    /// Attach language breakdowns. Zero-line records are ignored; records for
    /// unknown repositories are logged and skipped.
    #[allow(clippy::cast_precision_loss)]
    pub fn apply_languages(&mut self, records: &[LanguageRecord]) {
        for record in records {
            let total = record.total_lines();
            if total == 0 {
                continue;
            }

            let Some(&slot) = self.index.get(&record.repo) else {
                debug!("Could not find repo {} while setting languages", record.repo);
                continue;
            };

            self.repos[slot]
                .languages
                .extend(record.entries.iter().map(|(name, lines)| LanguageShare {
                    name: name.clone(),
                    lines: *lines,
                    fraction: *lines as f64 / total as f64,
                }));
        }
    }

    /// Load a persisted repository table; `None` when the file is absent
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        debug!("Loading repo table {}", path.display());
        let content = fs::read_to_string(path)?;
        let repos: Vec<Repo> = serde_json::from_str(&content)?;

        let mut graph = Self::new();
        for repo in repos {
            graph.add_repo(repo);
        }
        Ok(Some(graph))
    }

    /// Persist the repository table, sorted by id
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut sorted: Vec<&Repo> = self.repos.iter().collect();
        sorted.sort_by_key(|r| r.id);

        fs::write(path, serde_json::to_string_pretty(&sorted)?)?;
        debug!("Wrote repo table {}", path.display());
        Ok(())
    }

    /// Export the fork lineage to DOT format for Graphviz.
    ///
    /// With `focus`, only that repository and its relatives are emitted.
    #[must_use]
    pub fn to_dot(&self, focus: Option<RepoId>) -> String {
        let members: Option<BTreeSet<RepoId>> = focus.map(|id| {
            let mut set = self.relatives(id);
            set.insert(id);
            set
        });
        let included = |id: RepoId| members.as_ref().map_or(true, |m| m.contains(&id));

        let mut dot = String::from("digraph lineage {\n");
        dot.push_str("  rankdir=BT;\n");
        dot.push_str("  node [shape=box, style=rounded];\n\n");

        let mut sorted: Vec<&Repo> = self.repos.iter().filter(|r| included(r.id)).collect();
        sorted.sort_by_key(|r| r.id);

        for repo in &sorted {
            let _ = writeln!(
                dot,
                "  \"{}\" [label=\"{}\\n{}\"];",
                repo.id,
                repo.full_name(),
                repo.created.format("%Y-%m-%d")
            );
        }

        dot.push('\n');

        for repo in &sorted {
            if let Some(origin) = repo.fork_of.filter(|&o| included(o)) {
                let _ = writeln!(dot, "  \"{}\" -> \"{}\" [label=\"fork\"];", repo.id, origin);
            }
        }

        dot.push_str("}\n");
        dot
    }

    /// Export to JSON, sorted by id
    pub fn to_json(&self, focus: Option<RepoId>) -> Result<String> {
        let members = focus.map(|id| {
            let mut set = self.relatives(id);
            set.insert(id);
            set
        });
        let mut sorted: Vec<&Repo> = self
            .repos
            .iter()
            .filter(|r| members.as_ref().map_or(true, |m| m.contains(&r.id)))
            .collect();
        sorted.sort_by_key(|r| r.id);
        Ok(serde_json::to_string_pretty(&sorted)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn repo(id: RepoId, created: &str, fork_of: Option<RepoId>) -> Repo {
        Repo::new(id, "owner", format!("repo{id}"), date(created), fork_of)
    }

    fn set(ids: &[RepoId]) -> BTreeSet<RepoId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_same_day_fork() {
        let graph = RepoGraph::build(
            vec![repo(2, "2020-01-01", Some(1)), repo(1, "2020-01-01", None)],
            &[],
        )
        .unwrap();

        assert_eq!(graph.get(2).unwrap().ancestors, set(&[1]));
        assert_eq!(graph.get(1).unwrap().descendants, set(&[2]));
        assert!(graph.get(1).unwrap().ancestors.is_empty());
    }

    #[test]
    fn test_three_way_same_day_chain() {
        let mut graph = RepoGraph::new();
        graph.add_repo(repo(3, "2020-05-01", Some(2)));
        graph.add_repo(repo(2, "2020-05-01", Some(1)));
        graph.add_repo(repo(1, "2020-05-01", None));

        assert_eq!(graph.lineage_order().unwrap(), vec![1, 2, 3]);

        graph.build_lineage().unwrap();
        assert_eq!(graph.get(3).unwrap().ancestors, set(&[1, 2]));
        assert_eq!(graph.get(1).unwrap().descendants, set(&[2, 3]));
        assert_eq!(graph.get(2).unwrap().descendants, set(&[3]));
    }

    #[test]
    fn test_order_prefers_roots_then_origin_then_id() {
        let mut graph = RepoGraph::new();
        // 40 forks 10, 30 forks 20, both on the same day as a root 50
        graph.add_repo(repo(40, "2020-02-02", Some(10)));
        graph.add_repo(repo(30, "2020-02-02", Some(20)));
        graph.add_repo(repo(50, "2020-02-02", None));
        graph.add_repo(repo(20, "2020-01-01", None));
        graph.add_repo(repo(10, "2020-01-01", None));
        // Siblings of 10 on the same day break on their own id
        graph.add_repo(repo(45, "2020-02-02", Some(10)));

        assert_eq!(graph.lineage_order().unwrap(), vec![10, 20, 50, 40, 45, 30]);
    }

    #[test]
    fn test_deep_chain_propagates_everywhere() {
        let repos: Vec<Repo> = (1..=200)
            .rev()
            .map(|id| repo(id, "2011-03-03", if id == 1 { None } else { Some(id - 1) }))
            .collect();
        let graph = RepoGraph::build(repos, &[]).unwrap();

        assert_eq!(graph.get(200).unwrap().ancestors.len(), 199);
        assert_eq!(graph.get(1).unwrap().descendants.len(), 199);
        assert_eq!(graph.get(100).unwrap().ancestors, (1..100).collect::<BTreeSet<_>>());
        assert_eq!(graph.get(100).unwrap().descendants, (101..=200).collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_fork_dated_before_forked_origin_is_integrity_error() {
        let result = RepoGraph::build(
            vec![
                repo(1, "2020-01-01", None),
                repo(2, "2020-01-05", Some(1)),
                repo(3, "2020-01-02", Some(2)),
            ],
            &[],
        );

        match result {
            Err(Error::Integrity { repo, origin }) => {
                assert_eq!(repo, 3);
                assert_eq!(origin, 2);
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
    }

    #[test]
    fn test_fork_dated_before_root_origin_is_fine() {
        let graph = RepoGraph::build(
            vec![repo(1, "2020-01-05", None), repo(2, "2020-01-01", Some(1))],
            &[],
        )
        .unwrap();
        assert_eq!(graph.get(2).unwrap().ancestors, set(&[1]));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let result = RepoGraph::build(
            vec![repo(1, "2020-01-01", Some(2)), repo(2, "2020-01-01", Some(1))],
            &[],
        );
        assert!(matches!(result, Err(Error::ForkCycle(_))));
    }

    #[test]
    fn test_unknown_origin_becomes_root() {
        let graph = RepoGraph::build(vec![repo(5, "2020-01-01", Some(99))], &[]).unwrap();
        let r = graph.get(5).unwrap();
        assert!(!r.is_forked());
        assert!(r.ancestors.is_empty());
    }

    #[test]
    fn test_languages() {
        let records = vec![
            LanguageRecord { repo: 1, entries: vec![("C".into(), 25), ("Ruby".into(), 75)] },
            LanguageRecord { repo: 2, entries: vec![("C".into(), 0)] },
            LanguageRecord { repo: 77, entries: vec![("Go".into(), 10)] },
        ];
        let graph = RepoGraph::build(
            vec![repo(1, "2020-01-01", None), repo(2, "2020-01-01", None)],
            &records,
        )
        .unwrap();

        let langs = &graph.get(1).unwrap().languages;
        assert_eq!(langs.len(), 2);
        assert_eq!(langs[1].name, "Ruby");
        assert!((langs[1].fraction - 0.75).abs() < f64::EPSILON);
        assert!(graph.get(2).unwrap().languages.is_empty());
    }

    #[test]
    fn test_find() {
        let mut graph = RepoGraph::new();
        graph.add_repo(Repo::new(1, "rails", "rails", date("2008-01-01"), None));
        graph.add_repo(Repo::new(2, "someone", "rails", date("2008-02-01"), Some(1)));

        assert_eq!(graph.find("2").len(), 1);
        assert_eq!(graph.find("rails").len(), 2);
        assert_eq!(graph.find("someone/rails")[0].id, 2);
        assert!(graph.find("missing").is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("calc").join("repos.json");

        assert!(RepoGraph::load(&path).unwrap().is_none());

        let graph = RepoGraph::build(
            vec![repo(1, "2020-01-01", None), repo(2, "2020-01-02", Some(1))],
            &[],
        )
        .unwrap();
        graph.save(&path).unwrap();

        let loaded = RepoGraph::load(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(2), graph.get(2));
    }

    #[test]
    fn test_to_dot_focus() {
        let graph = RepoGraph::build(
            vec![
                repo(1, "2020-01-01", None),
                repo(2, "2020-01-02", Some(1)),
                repo(3, "2020-01-03", None),
            ],
            &[],
        )
        .unwrap();

        let dot = graph.to_dot(Some(2));
        assert!(dot.contains("digraph lineage"));
        assert!(dot.contains("\"2\" -> \"1\""));
        assert!(!dot.contains("\"3\""));
    }
}
