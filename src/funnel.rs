// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Candidate generation funnel
//!
//! A user's list is filled by a fixed sequence of stages, each one only run
//! while the list is still short of `n` entries:
//!
//! 1. **Seed**: a caller-supplied starting list
//! 2. **Relatives**: fork ancestors and descendants of watched repositories
//! 3. **Probabilistic**: co-watch neighbours of the relatives and current list
//! 4. **Name similarity**: repositories sharing a name token with a watched one
//! 5. **Similarity probabilistic**: co-watch neighbours of those name matches
//! 6. **Global fallback**: the most watched repositories overall

use crate::cowatch::CoWatchSource;
use crate::error::Result;
use crate::graph::RepoGraph;
use crate::types::{CandidateList, RelatedRepo, RepoId, UserId};
use crate::watches::WatchStore;
use regex::RegexBuilder;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// Weight of the log co-frequency term in [`score`]
pub const SCORE_WEIGHT: f64 = 0.15;

/// Rank of a co-watch hit: `(1 + w * ln(co_freq)) * cond_prob`
#[must_use]
pub fn score(related: &RelatedRepo) -> f64 {
    (1.0 + SCORE_WEIGHT * f64::from(related.co_freq.max(1)).ln()) * related.cond_prob
}

/// Order co-watch hits best first. Equal scores fall back to the related
/// repository id, then the source id, both ascending.
pub fn rank_related(related: &mut [RelatedRepo]) {
    related.sort_by(|a, b| {
        score(b)
            .total_cmp(&score(a))
            .then_with(|| a.related.cmp(&b.related))
            .then_with(|| a.src.cmp(&b.src))
    });
}

/// Funnel stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Caller-supplied starting list
    Seed,
    /// Fork ancestors and descendants of watched repositories
    Relatives,
    /// Co-watch neighbours of the relatives and the current list
    Probabilistic,
    /// Repositories whose names share a token with a watched repository
    NameSimilarity,
    /// Co-watch neighbours of the name matches
    SimilarityProbabilistic,
    /// Most watched repositories overall
    GlobalFallback,
}

impl Stage {
    /// The stage that follows this one
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Seed => Some(Self::Relatives),
            Self::Relatives => Some(Self::Probabilistic),
            Self::Probabilistic => Some(Self::NameSimilarity),
            Self::NameSimilarity => Some(Self::SimilarityProbabilistic),
            Self::SimilarityProbabilistic => Some(Self::GlobalFallback),
            Self::GlobalFallback => None,
        }
    }
}

/// Behaviour switches for the funnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunnelOptions {
    /// Also skip watched repositories in the global fallback
    pub fallback_excludes_watched: bool,
}

/// A bounded, duplicate-free list under construction for one user
struct Candidates<'w> {
    list: CandidateList,
    present: HashSet<RepoId>,
    watched: &'w BTreeSet<RepoId>,
    n: usize,
}

impl<'w> Candidates<'w> {
    fn new(watched: &'w BTreeSet<RepoId>, n: usize) -> Self {
        Self {
            list: Vec::with_capacity(n),
            present: HashSet::with_capacity(n),
            watched,
            n,
        }
    }

    fn is_full(&self) -> bool {
        self.list.len() >= self.n
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    /// Append unless full, already present, or watched by the user
    fn push(&mut self, repo: RepoId) -> bool {
        if self.watched.contains(&repo) {
            return false;
        }
        self.push_any(repo)
    }

    /// Append unless full or already present
    fn push_any(&mut self, repo: RepoId) -> bool {
        if self.is_full() || !self.present.insert(repo) {
            return false;
        }
        self.list.push(repo);
        true
    }
}

/// Per-user state carried between stages
#[derive(Default)]
struct StageState {
    relatives: BTreeSet<RepoId>,
    similar: Vec<RepoId>,
}

/// Fills recommendation lists from the stores and a co-watch source
pub struct CandidateGenerator<'a, S: CoWatchSource> {
    repos: &'a RepoGraph,
    watches: &'a WatchStore,
    cowatch: &'a S,
    options: FunnelOptions,
    top_repos: Vec<RepoId>,
}

impl<'a, S: CoWatchSource> CandidateGenerator<'a, S> {
    /// Create a generator over fully built stores
    #[must_use]
    pub fn new(repos: &'a RepoGraph, watches: &'a WatchStore, cowatch: &'a S, options: FunnelOptions) -> Self {
        Self {
            repos,
            watches,
            cowatch,
            options,
            top_repos: watches.top_repos(),
        }
    }

    /// Fill up to `n` entries from the co-watch neighbours of the user's own
    /// watched repositories. This is the list [`Self::generate`] takes as seed.
    pub fn seed(&self, user: UserId, n: usize) -> Result<CandidateList> {
        let watched = self.watches.watched(user);
        let mut candidates = Candidates::new(watched, n);
        self.fill_probabilistic(&mut candidates, watched)?;
        debug!("Gathered {} seed candidates for user {}", candidates.len(), user);
        Ok(candidates.list)
    }

    /// Run the full funnel for one user starting from `seed`
    pub fn generate(&self, user: UserId, seed: &[RepoId], n: usize) -> Result<CandidateList> {
        let watched = self.watches.watched(user);
        let mut candidates = Candidates::new(watched, n);
        let mut state = StageState::default();

        let mut stage = Some(Stage::Seed);
        while let Some(current) = stage {
            if current != Stage::Seed && candidates.is_full() {
                break;
            }

            let before = candidates.len();
            self.run_stage(current, user, seed, &mut candidates, &mut state)?;
            debug!(
                "User {}: {:?} added {} candidates ({} of {})",
                user,
                current,
                candidates.len() - before,
                candidates.len(),
                n
            );

            stage = current.next();
        }

        Ok(candidates.list)
    }

    fn run_stage(
        &self,
        stage: Stage,
        user: UserId,
        seed: &[RepoId],
        candidates: &mut Candidates<'_>,
        state: &mut StageState,
    ) -> Result<()> {
        match stage {
            Stage::Seed => {
                for &repo in seed {
                    candidates.push(repo);
                }
            }
            Stage::Relatives => {
                state.relatives = self.relatives_of(candidates.watched);
                let mut ordered: Vec<RepoId> = state.relatives.iter().copied().collect();
                self.watches.sort_by_popularity(&mut ordered);
                debug!("Found {} relatives for user {}", ordered.len(), user);
                for repo in ordered {
                    if candidates.is_full() {
                        break;
                    }
                    candidates.push(repo);
                }
            }
            Stage::Probabilistic => {
                let mut sources = state.relatives.clone();
                sources.extend(candidates.list.iter().copied());
                self.fill_probabilistic(candidates, &sources)?;
            }
            Stage::NameSimilarity => {
                state.similar = self.similarly_named(candidates.watched);
                debug!("Found {} similarly named repos for user {}", state.similar.len(), user);
                for &repo in &state.similar {
                    if candidates.is_full() {
                        break;
                    }
                    candidates.push(repo);
                }
            }
            Stage::SimilarityProbabilistic => {
                if !state.similar.is_empty() {
                    let sources: BTreeSet<RepoId> = state.similar.iter().copied().collect();
                    self.fill_probabilistic(candidates, &sources)?;
                }
            }
            Stage::GlobalFallback => {
                for &repo in &self.top_repos {
                    if candidates.is_full() {
                        break;
                    }
                    if self.options.fallback_excludes_watched {
                        candidates.push(repo);
                    } else {
                        candidates.push_any(repo);
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the funnel for every user, seeding from `seeds` when present
    pub fn generate_all(
        &self,
        users: &[UserId],
        seeds: &BTreeMap<UserId, CandidateList>,
        n: usize,
    ) -> Result<BTreeMap<UserId, CandidateList>> {
        let mut out = BTreeMap::new();
        for &user in users {
            let seed = seeds.get(&user).map_or(&[][..], Vec::as_slice);
            out.insert(user, self.generate(user, seed, n)?);
        }
        Ok(out)
    }

    /// Compute the seed list for every user
    pub fn seed_all(&self, users: &[UserId], n: usize) -> Result<BTreeMap<UserId, CandidateList>> {
        let mut out = BTreeMap::new();
        for &user in users {
            out.insert(user, self.seed(user, n)?);
        }
        Ok(out)
    }

    /// Union of ancestors and descendants of every watched repository
    fn relatives_of(&self, watched: &BTreeSet<RepoId>) -> BTreeSet<RepoId> {
        let mut relatives = BTreeSet::new();
        for &repo in watched {
            match self.repos.get(repo) {
                Some(r) => {
                    relatives.extend(r.ancestors.iter().copied());
                    relatives.extend(r.descendants.iter().copied());
                }
                None => debug!("Watched repo {} is not in the repo table", repo),
            }
        }
        relatives
    }

    /// Append the best-scoring co-watch neighbours of `sources` until full
    fn fill_probabilistic(&self, candidates: &mut Candidates<'_>, sources: &BTreeSet<RepoId>) -> Result<()> {
        if sources.is_empty() {
            return Ok(());
        }

        let mut related = self.cowatch.related_repos(sources)?;
        rank_related(&mut related);

        for hit in related {
            if candidates.is_full() {
                break;
            }
            candidates.push(hit.related);
        }
        Ok(())
    }

    /// Repositories, other than the watched ones, whose name contains any
    /// alphabetic token of a watched repository's name, most popular first
    fn similarly_named(&self, watched: &BTreeSet<RepoId>) -> Vec<RepoId> {
        let tokens: BTreeSet<String> = watched
            .iter()
            .filter_map(|id| self.repos.get(*id))
            .flat_map(|r| name_tokens(&r.name))
            .collect();

        if tokens.is_empty() {
            return Vec::new();
        }

        let pattern = tokens
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(m) => m,
            Err(e) => {
                warn!("Could not build name matcher from {} tokens: {}", tokens.len(), e);
                return Vec::new();
            }
        };

        let mut similar: Vec<RepoId> = self
            .repos
            .repos()
            .iter()
            .filter(|r| !watched.contains(&r.id) && matcher.is_match(&r.name))
            .map(|r| r.id)
            .collect();
        self.watches.sort_by_popularity(&mut similar);
        similar
    }
}

/// Lowercase runs of ASCII letters in a repository name
#[must_use]
pub fn name_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}
