//! # SC2 Arena
//!
//! Head-to-head StarCraft II matches between two bot repositories, each match running in its
//! own Docker container.
//!
//! It provides:
//! - Per-match build contexts copied from a repository cache (`provisioner`)
//! - Container launch and completion polling behind the [`ContainerRuntime`] trait
//! - Reconciliation of the replays written by both sides into one winner per match
//! - The [`Orchestrator`] chaining these stages for a whole batch
//!
//! A batch is played in stages: every match is provisioned, then every match is launched, then
//! the orchestrator waits for all of them, then every match is reconciled. The orchestrator is
//! single-threaded, matches run concurrently inside their containers.
//!
//! # Documentation Overview
//!
//! - For the run itself and its failure model, see the [`orchestrator`] module.
//! - For paths, external tools and polling, see [`Configuration`](crate::configuration::Configuration).
//! - For the winner rules, see the [`reconciler`] module.
//! - To plug another repository source, container technology or replay decoder, implement
//!   [`RepositoryCache`], [`ContainerRuntime`] or [`ReplayReader`].
//!
//! # Bot Requirements
//!
//! - The repository root contains `botinfo.json` with string keys `race` and `name`
//! - The in-container launch script reads `sc2_match_id`, `sc2_map_name` and `sc2_races`
//! - Side `s` of match `i` writes its replay to `/replays/{i}_{s}.SC2Replay`
//!
//! [`ContainerRuntime`]: crate::container::ContainerRuntime
//! [`RepositoryCache`]: crate::repo_cache::RepositoryCache
//! [`ReplayReader`]: crate::replay::ReplayReader
//! [`Orchestrator`]: crate::orchestrator::Orchestrator
#![warn(missing_docs)]

pub use anyhow;

pub mod batch;
pub mod bot_info;
pub mod configuration;
pub mod container;
pub mod error;
pub mod launcher;
pub mod logger;
pub mod orchestrator;
pub mod poller;
pub mod provisioner;
pub mod reconciler;
pub mod repo_cache;
pub mod replay;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use sc2_arena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::batch::{validate_repositories, BatchContext, Match};
    pub use crate::configuration::Configuration;
    pub use crate::container::{ContainerRuntime, DockerCli, EnvironmentDescriptor};
    pub use crate::error::{exit_code_of, ArenaError};
    pub use crate::orchestrator::Orchestrator;
    pub use crate::poller::{CancellationToken, WaitPolicy};
    pub use crate::reconciler::MatchRecord;
    pub use crate::repo_cache::{GitRepoCache, RepositoryCache};
    pub use crate::replay::{CommandReplayReader, ReplayReader, Verdict};
}
