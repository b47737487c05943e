use std::{path::Path, process::Command};

use anyhow::{bail, Context};
use tracing::{debug, instrument, trace};

use super::{run_captured, ContainerRuntime, EnvironmentDescriptor};

/// [`ContainerRuntime`] backed by the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    /// Use `bin` as the docker executable (usually `"docker"`).
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn command(&self) -> Command {
        Command::new(&self.bin)
    }

    pub(crate) fn build_args(image: &str) -> Vec<String> {
        ["build", "-t", image, "."].map(str::to_owned).to_vec()
    }

    pub(crate) fn run_args(image: &str, name: &str, descriptor: &EnvironmentDescriptor) -> Vec<String> {
        let mut args = vec!["run".to_owned(), "-d".to_owned()];
        for (key, value) in descriptor.env_vars() {
            args.push("--env".to_owned());
            args.push(format!("{key}={value}"));
        }
        for mount in descriptor.mounts() {
            args.push("--mount".to_owned());
            args.push(mount.to_mount_arg());
        }
        args.push("--name".to_owned());
        args.push(name.to_owned());
        args.push(image.to_owned());
        args
    }

    pub(crate) fn ps_args(volume: &Path) -> Vec<String> {
        vec![
            "ps".to_owned(),
            "-q".to_owned(),
            "--filter".to_owned(),
            format!("volume={}", volume.display()),
        ]
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl ContainerRuntime for DockerCli {
    #[instrument(skip(self))]
    fn build_image(&self, context: &Path, image: &str) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.args(Self::build_args(image)).current_dir(context);
        let output = run_captured(cmd).with_context(|| format!("could not build image {image}"))?;
        trace!(build_log = %String::from_utf8_lossy(&output.stdout));
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove_environment(&self, name: &str) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.args(["rm", name]);
        run_captured(cmd).with_context(|| format!("could not remove {name}"))?;
        Ok(())
    }

    #[instrument(skip(self, descriptor), fields(match_index = descriptor.match_index))]
    fn start_environment(
        &self,
        image: &str,
        name: &str,
        descriptor: &EnvironmentDescriptor,
    ) -> anyhow::Result<String> {
        let mut cmd = self.command();
        cmd.args(Self::run_args(image, name, descriptor));
        let output = run_captured(cmd).with_context(|| format!("could not start {name}"))?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if id.is_empty() {
            bail!("docker did not report an id for {name}");
        }
        debug!(%id, "environment started");
        Ok(id)
    }

    fn list_running(&self, volume: &Path) -> anyhow::Result<Vec<String>> {
        let mut cmd = self.command();
        cmd.args(Self::ps_args(volume));
        let output = run_captured(cmd).context("could not list running containers")?;
        Ok(parse_ids(&output.stdout))
    }
}

/// Container ids printed one per line by `docker ps -q`.
fn parse_ids(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}
