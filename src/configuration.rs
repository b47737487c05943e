//! Config for the orchestrator behaviors
//!
//! This module provides configuration options for controlling where a batch lives on disk,
//! which external tools are invoked, and how the completion wait behaves.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Flags are case-insensitive, set the value to `"true"` to enable one.
//!
//! - `ARENA_VERBOSE` — Print stage progress to stdout (default: `true`)
//! - `ARENA_LOG` — Enable logging to a file (default: `false`)
//! - `ARENA_LOG_DIR` — Directory receiving log files (default: `.`)
//! - `ARENA_WORK_DIR` — Directory holding `containers/`, `results/` and `replays/` (default: `.`)
//! - `ARENA_TEMPLATE_DIR` — Template overlaid into every match directory (default: `template_container`)
//! - `ARENA_GAME_DATA_DIR` — Game installation mounted read-only (default: `StarCraftII`)
//! - `ARENA_EXTRA_CONTEXT` — `:`-separated directories copied into every match directory
//! - `ARENA_CACHE_DIR` — Repository cache (default: `repocache`)
//! - `ARENA_DOCKER_BIN` — Container CLI (default: `docker`)
//! - `ARENA_REPLAY_READER` — Replay decoding command (default: `read_replay`)
//! - `ARENA_POLL_INTERVAL_SECS` — Completion polling interval (default: `3`)
//! - `ARENA_POLL_DEADLINE_SECS` — Completion deadline (default: none, wait forever)
//! - `ARENA_GAMES` — Matches per batch (default: `2`)

use std::{env, path::PathBuf, time::Duration};

use crate::poller::WaitPolicy;

/// Configuration for orchestrator behaviors.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) log_dir: PathBuf,
    pub(crate) work_dir: PathBuf,
    pub(crate) template_dir: PathBuf,
    pub(crate) game_data_dir: PathBuf,
    pub(crate) extra_context: Vec<PathBuf>,
    pub(crate) cache_dir: PathBuf,
    pub(crate) docker_bin: String,
    pub(crate) replay_reader: String,
    pub(crate) wait: WaitPolicy,
    pub(crate) games: usize,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Stage progress is printed to stdout.
    /// - Logging to file is disabled.
    /// - Every path is relative to the current directory.
    /// - `docker` and `read_replay` are looked up in `PATH`.
    /// - Completion is polled every 3 seconds, without deadline.
    /// - A batch contains two matches.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            log_dir: PathBuf::from("."),
            work_dir: PathBuf::from("."),
            template_dir: PathBuf::from("template_container"),
            game_data_dir: PathBuf::from("StarCraftII"),
            extra_context: vec![],
            cache_dir: PathBuf::from("repocache"),
            docker_bin: "docker".to_owned(),
            replay_reader: "read_replay".to_owned(),
            wait: WaitPolicy::default(),
            games: 2,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables. Unset or unparsable values
    /// fall back to the defaults of [`Configuration::new()`].
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_path(var: &str) -> Option<PathBuf> {
            env::var_os(var).map(PathBuf::from)
        }

        fn get_env_secs(var: &str) -> Option<Duration> {
            env::var(var)
                .ok()?
                .parse::<u64>()
                .ok()
                .map(Duration::from_secs)
        }

        let defaults = Self::new();
        let mut wait = defaults.wait;
        if let Some(interval) = get_env_secs("ARENA_POLL_INTERVAL_SECS") {
            wait = wait.with_interval(interval);
        }
        if let Some(deadline) = get_env_secs("ARENA_POLL_DEADLINE_SECS") {
            wait = wait.with_deadline(deadline);
        }

        Self {
            verbose: get_env_flag("ARENA_VERBOSE", defaults.verbose),
            log: get_env_flag("ARENA_LOG", defaults.log),
            log_dir: get_env_path("ARENA_LOG_DIR").unwrap_or(defaults.log_dir),
            work_dir: get_env_path("ARENA_WORK_DIR").unwrap_or(defaults.work_dir),
            template_dir: get_env_path("ARENA_TEMPLATE_DIR").unwrap_or(defaults.template_dir),
            game_data_dir: get_env_path("ARENA_GAME_DATA_DIR").unwrap_or(defaults.game_data_dir),
            extra_context: env::var_os("ARENA_EXTRA_CONTEXT")
                .map(|paths| env::split_paths(&paths).collect())
                .unwrap_or(defaults.extra_context),
            cache_dir: get_env_path("ARENA_CACHE_DIR").unwrap_or(defaults.cache_dir),
            docker_bin: env::var("ARENA_DOCKER_BIN").unwrap_or(defaults.docker_bin),
            replay_reader: env::var("ARENA_REPLAY_READER").unwrap_or(defaults.replay_reader),
            wait,
            games: env::var("ARENA_GAMES")
                .ok()
                .and_then(|games| games.parse().ok())
                .unwrap_or(defaults.games),
        }
    }

    /// Enable or disable stage progress on stdout.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Set the directory receiving log files.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the directory holding the batch roots (`containers/`, `results/`, `replays/`).
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Set the template directory overlaid into every match directory.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Set the game installation mounted read-only into every environment.
    pub fn with_game_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.game_data_dir = dir.into();
        self
    }

    /// Add a directory copied into every match directory, under its own name.
    pub fn with_extra_context(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_context.push(dir.into());
        self
    }

    /// Set the repository cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the container CLI binary.
    pub fn with_docker_bin(mut self, bin: impl Into<String>) -> Self {
        self.docker_bin = bin.into();
        self
    }

    /// Set the replay decoding command.
    pub fn with_replay_reader(mut self, command: impl Into<String>) -> Self {
        self.replay_reader = command.into();
        self
    }

    /// Set the completion wait policy.
    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Set the number of matches in a batch.
    pub fn with_games(mut self, games: usize) -> Self {
        self.games = games;
        self
    }

    /// True when logs go to a file.
    pub fn log_enabled(&self) -> bool {
        self.log
    }

    /// Directory receiving log files.
    pub fn log_dir(&self) -> &std::path::Path {
        &self.log_dir
    }

    /// Directory of the repository cache.
    pub fn cache_dir(&self) -> &std::path::Path {
        &self.cache_dir
    }

    /// Container CLI binary.
    pub fn docker_bin(&self) -> &str {
        &self.docker_bin
    }

    /// Replay decoding command.
    pub fn replay_reader(&self) -> &str {
        &self.replay_reader
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
