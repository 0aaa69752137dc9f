// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod blend;
pub mod build;
pub mod completions;
pub mod config;
pub mod export;
pub mod fill;
pub mod lineage;
pub mod related;
pub mod run;
pub mod seed;
