//! Core logic running one batch of matches.
//!
//! This module defines the [`Orchestrator`] type. A run goes through four stages, each one
//! completed for the whole batch before the next starts:
//!
//! 1. **Provisioning**: fresh batch directories, one working directory per match holding a
//!    copy of both repositories and the template, then `botinfo.json` of every side.
//! 2. **Launch**: one image and one detached environment per match.
//! 3. **Wait**: poll the runtime until no environment of the batch is running.
//! 4. **Reconciliation**: read both replays of every match, derive the winners and write
//!    `results/results.json`.
//!
//! Any failure stops the run where it happened. Nothing is rolled back: started environments
//! keep running and the batch directories are left as they are.
//!
//! # Example
//!
//! ```no_run
//! use sc2_arena::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::from_env();
//!     let mut orchestrator = Orchestrator::from_config(config);
//!     let repositories = [
//!         "https://github.com/someone/terran-bot".to_owned(),
//!         "https://github.com/someone-else/zerg-bot".to_owned(),
//!     ];
//!     for record in orchestrator.run("AcropolisLE", &repositories)? {
//!         println!("{:?}", record.winner);
//!     }
//!     Ok(())
//! }
//! ```

use std::{io::Write, time::Instant};

use tracing::{info, instrument, trace};

use crate::{
    batch::{build_matches, BatchContext, SIDES},
    configuration::Configuration,
    container::{ContainerRuntime, DockerCli},
    launcher::launch_matches,
    poller::{wait_for_completion, CancellationToken},
    provisioner::{provision_matches, Overlay},
    reconciler::{reconcile_batch, write_results, MatchRecord},
    repo_cache::{GitRepoCache, RepositoryCache},
    replay::{CommandReplayReader, ReplayReader},
};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Runs batches of matches between two repositories.
///
/// # Type Parameters
/// - `C`: where repositories come from
/// - `R`: the container technology running the matches
/// - `P`: how replays are decoded
pub struct Orchestrator<C, R, P> {
    config: Configuration,
    cache: C,
    runtime: R,
    reader: P,
    cancel: Option<CancellationToken>,
}

impl Orchestrator<GitRepoCache, DockerCli, CommandReplayReader> {
    /// Orchestrator using `git`, `docker` and the replay reader named in `config`.
    pub fn from_config(config: Configuration) -> Self {
        let cache = GitRepoCache::new(config.cache_dir());
        let runtime = DockerCli::new(config.docker_bin());
        let reader = CommandReplayReader::new(config.replay_reader());
        Self::new(config, cache, runtime, reader)
    }
}

impl<C: RepositoryCache, R: ContainerRuntime, P: ReplayReader> Orchestrator<C, R, P> {
    /// Create an [`Orchestrator`] from its collaborators.
    #[instrument(skip_all)]
    pub fn new(config: Configuration, cache: C, runtime: R, reader: P) -> Self {
        trace!(?config);
        Self {
            config,
            cache,
            runtime,
            reader,
            cancel: None,
        }
    }

    /// Abort the completion wait when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Play one batch on `map_name` and return one record per match, in match order.
    ///
    /// The result artifact is written only when every match has a result.
    ///
    /// # Errors
    /// Any stage failure. Categorized failures carry an [`ArenaError`](crate::error::ArenaError).
    pub fn run(
        &mut self,
        map_name: &str,
        repositories: &[String; SIDES],
    ) -> anyhow::Result<Vec<MatchRecord>> {
        let start_all = Instant::now();
        let verbose = self.config.verbose;

        let ctx = BatchContext::prepare(&self.config.work_dir, &self.config.game_data_dir)?;
        let matches = build_matches(repositories, self.config.games);
        info!(%map_name, ?repositories, games = matches.len(), "batch started");

        let overlay = Overlay {
            template_dir: self.config.template_dir.clone(),
            extra_context: self.config.extra_context.clone(),
        };
        let cache = &mut self.cache;
        let bots = stage(verbose, "Fetching repositories...", || {
            provision_matches(&ctx, &matches, cache, &overlay)
        })?;

        stage(verbose, "Starting games...", || {
            launch_matches(&self.runtime, &ctx, &matches, &bots, map_name)
        })?;

        stage(verbose, "Running games...", || {
            wait_for_completion(
                &self.runtime,
                ctx.game_data_dir(),
                self.config.wait,
                self.cancel.as_ref(),
            )
        })?;

        let records = stage(verbose, "Collecting results...", || {
            let records = reconcile_batch(&self.reader, &ctx, &matches)?;
            write_results(&ctx.results_file(), &records)?;
            Ok(records)
        })?;

        if verbose {
            println!(
                "Completed (total {:.2}s)",
                start_all.elapsed().as_secs_f64()
            );
        }
        info!(?records, "batch completed");
        Ok(records)
    }
}

/// Run one stage, printing its progress and duration when `verbose`.
fn stage<T>(
    verbose: bool,
    label: &str,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let start = Instant::now();
    if verbose {
        println!("{label}");
        let _ = std::io::stdout().flush();
    }
    let result = f();
    if verbose {
        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(_) => println!("{GREEN}Ok{RESET} ({elapsed:.2}s)"),
            Err(_) => println!("{RED}Failed{RESET} ({elapsed:.2}s)"),
        }
    }
    result
}
