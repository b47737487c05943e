//! Isolated execution environments.
//!
//! The orchestrator only needs four capabilities from a container technology, grouped in the
//! [`ContainerRuntime`] trait. [`DockerCli`] implements them by shelling out to the `docker`
//! command line.

mod docker;

pub use docker::DockerCli;

use std::{
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use anyhow::{bail, Context};
use tracing::error;

/// In-environment path of the shared, read-only game installation.
pub const GAME_DATA_TARGET: &str = "/StarCraftII";
/// In-environment path of the shared, writable replay directory.
pub const REPLAYS_TARGET: &str = "/replays";

/// Capabilities the orchestrator uses to run one environment per match.
pub trait ContainerRuntime {
    /// Build `image` using `context` as build context.
    fn build_image(&self, context: &Path, image: &str) -> anyhow::Result<()>;

    /// Remove the (stopped) environment called `name`. Fails if it does not exist.
    fn remove_environment(&self, name: &str) -> anyhow::Result<()>;

    /// Start a detached environment called `name` from `image`. Returns the runtime's id.
    fn start_environment(
        &self,
        image: &str,
        name: &str,
        descriptor: &EnvironmentDescriptor,
    ) -> anyhow::Result<String>;

    /// Ids of the running environments that mount `volume`.
    fn list_running(&self, volume: &Path) -> anyhow::Result<Vec<String>>;
}

impl<R: ContainerRuntime + ?Sized> ContainerRuntime for &R {
    fn build_image(&self, context: &Path, image: &str) -> anyhow::Result<()> {
        (**self).build_image(context, image)
    }

    fn remove_environment(&self, name: &str) -> anyhow::Result<()> {
        (**self).remove_environment(name)
    }

    fn start_environment(
        &self,
        image: &str,
        name: &str,
        descriptor: &EnvironmentDescriptor,
    ) -> anyhow::Result<String> {
        (**self).start_environment(image, name, descriptor)
    }

    fn list_running(&self, volume: &Path) -> anyhow::Result<Vec<String>> {
        (**self).list_running(volume)
    }
}

/// A host directory bound into an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Absolute host path.
    pub source: PathBuf,
    /// Path inside the environment.
    pub target: &'static str,
    /// Mounted read-only.
    pub readonly: bool,
}

impl BindMount {
    /// `--mount` argument for this bind.
    pub fn to_mount_arg(&self) -> String {
        let consistency = if self.readonly { "cached" } else { "consistent" };
        format!(
            "type=bind,source={},destination={},readonly={},consistency={consistency}",
            self.source.display(),
            self.target,
            self.readonly,
        )
    }
}

/// Everything injected into the environment of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    /// Zero-based match index.
    pub match_index: usize,
    /// Map the game is played on.
    pub map_name: String,
    /// Race of each side, in side order.
    pub races: Vec<String>,
    /// Read-only game installation.
    pub game_data: BindMount,
    /// Writable replay output directory.
    pub replays: BindMount,
}

impl EnvironmentDescriptor {
    /// Create the descriptor of match `match_index`.
    ///
    /// `game_data_dir` and `replays_dir` must be absolute.
    pub fn new(
        match_index: usize,
        map_name: &str,
        races: Vec<String>,
        game_data_dir: &Path,
        replays_dir: &Path,
    ) -> Self {
        Self {
            match_index,
            map_name: map_name.to_owned(),
            races,
            game_data: BindMount {
                source: game_data_dir.to_path_buf(),
                target: GAME_DATA_TARGET,
                readonly: true,
            },
            replays: BindMount {
                source: replays_dir.to_path_buf(),
                target: REPLAYS_TARGET,
                readonly: false,
            },
        }
    }

    /// Environment variables read by the in-container launch script.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sc2_match_id", self.match_index.to_string()),
            ("sc2_map_name", self.map_name.clone()),
            ("sc2_races", self.races.join(",")),
        ]
    }

    /// Bind mounts, game data first.
    pub fn mounts(&self) -> [&BindMount; 2] {
        [&self.game_data, &self.replays]
    }
}

/// Run `cmd` to completion with captured output.
///
/// A non-zero exit status is an error carrying the first line of stderr; the full stderr is
/// logged.
pub(crate) fn run_captured(mut cmd: Command) -> anyhow::Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("command '{program}' not found"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        error!("'{program}' failed ({}): {stderr}", output.status);
        bail!(
            "'{program}' failed ({}): {}",
            output.status,
            stderr.lines().next().unwrap_or_default()
        );
    }
    Ok(output)
}
