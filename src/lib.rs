// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Forkwatch library - repository recommendations from watch behaviour and fork lineage
//!
//! This crate learns pairwise co-watch statistics from a user → watched-repository
//! dataset, reconstructs the fork ancestry of every repository, and fills a
//! bounded, ranked recommendation list per user through a staged funnel.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod cowatch;
pub mod error;
pub mod funnel;
pub mod graph;
pub mod ingest;
pub mod pipeline;
pub mod results;
pub mod watches;

pub use error::{Error, Result};

/// Core data types shared by the stores, the co-watch table and the funnel
pub mod types {
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeSet;

    /// Repository identifier as it appears in the raw input
    pub type RepoId = u32;

    /// User identifier as it appears in the raw input
    pub type UserId = u32;

    // =========================================================================
    // Repository
    // =========================================================================

    /// One language entry of a repository's breakdown
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LanguageShare {
        /// Language name as reported by the source data
        pub name: String,
        /// Raw line count
        pub lines: u64,
        /// Fraction of the repository's total line count (0.0 to 1.0)
        pub fraction: f64,
    }

    /// Repository node with its resolved fork lineage
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Repo {
        /// Unique identifier
        pub id: RepoId,
        /// Repository owner/namespace
        pub owner: String,
        /// Repository name
        pub name: String,
        /// Creation date (day resolution)
        pub created: NaiveDate,
        /// Repository this one was forked from, if any
        pub fork_of: Option<RepoId>,
        /// Every direct or transitive fork origin
        #[serde(default)]
        pub ancestors: BTreeSet<RepoId>,
        /// Every direct or transitive fork
        #[serde(default)]
        pub descendants: BTreeSet<RepoId>,
        /// Language breakdown in input order
        #[serde(default)]
        pub languages: Vec<LanguageShare>,
    }

    impl Repo {
        /// Create a repository with empty lineage and no language data
        #[must_use]
        pub fn new(
            id: RepoId,
            owner: impl Into<String>,
            name: impl Into<String>,
            created: NaiveDate,
            fork_of: Option<RepoId>,
        ) -> Self {
            Self {
                id,
                owner: owner.into(),
                name: name.into(),
                created,
                fork_of,
                ancestors: BTreeSet::new(),
                descendants: BTreeSet::new(),
                languages: Vec::new(),
            }
        }

        /// Whether this repository was forked from another one
        #[must_use]
        pub fn is_forked(&self) -> bool {
            self.fork_of.is_some()
        }

        /// `owner/name`
        #[must_use]
        pub fn full_name(&self) -> String {
            format!("{}/{}", self.owner, self.name)
        }
    }

    // =========================================================================
    // Watches
    // =========================================================================

    /// Watch statistics of a single repository
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Popularity {
        /// Number of users watching the repository
        pub count: u32,
        /// `count` divided by the total number of watch edges
        pub relative: f64,
    }

    // =========================================================================
    // Co-watch
    // =========================================================================

    /// Co-watch statistics for the ordered pair `(src, dst)`
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct CoWatchEdge {
        /// First repository of the pair
        pub src: RepoId,
        /// Second repository of the pair
        pub dst: RepoId,
        /// Number of users watching both repositories
        pub co_freq: u32,
        /// `co_freq / popularity(src)`, an estimate of P(watch dst | watch src)
        pub cond_prob: f64,
    }

    /// A co-watch hit returned for a source set: `(src, related, co_freq, cond_prob)`
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct RelatedRepo {
        /// The source repository the edge was found under
        pub src: RepoId,
        /// The related repository
        pub related: RepoId,
        /// Co-watch frequency of the pair
        pub co_freq: u32,
        /// Conditional probability of the pair
        pub cond_prob: f64,
    }

    impl From<CoWatchEdge> for RelatedRepo {
        fn from(edge: CoWatchEdge) -> Self {
            Self {
                src: edge.src,
                related: edge.dst,
                co_freq: edge.co_freq,
                cond_prob: edge.cond_prob,
            }
        }
    }

    // =========================================================================
    // Candidates
    // =========================================================================

    /// Ordered recommendations for a single user
    pub type CandidateList = Vec<RepoId>;
}
