//! Local snapshots of remote repositories.

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::container::run_captured;

/// Maps a repository identifier to a local directory holding its contents.
pub trait RepositoryCache {
    /// Local snapshot of `identifier`. Repeated calls return the same directory.
    fn resolve(&mut self, identifier: &str) -> anyhow::Result<PathBuf>;
}

/// [`RepositoryCache`] cloning with `git` into a cache directory.
///
/// A snapshot already present on disk is reused, even across runs: delete its directory to
/// fetch the repository again.
#[derive(Debug)]
pub struct GitRepoCache {
    root: PathBuf,
    resolved: HashMap<String, PathBuf>,
}

impl GitRepoCache {
    /// Cache stored under `root`, created on first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            resolved: HashMap::new(),
        }
    }

    /// Directory name of `identifier` inside the cache.
    ///
    /// A readable prefix followed by a hash of the full identifier, so identifiers that
    /// sanitize to the same prefix still get their own directory.
    fn entry_name(identifier: &str) -> String {
        let readable: String = identifier
            .strip_prefix("https://")
            .unwrap_or(identifier)
            .trim_end_matches('/')
            .trim_end_matches(".git")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();

        let mut hasher = DefaultHasher::new();
        identifier.hash(&mut hasher);
        format!("{readable}-{:016x}", hasher.finish())
    }

    #[instrument(skip(self))]
    fn clone_into(&self, identifier: &str, dest: &Path) -> anyhow::Result<()> {
        info!("cloning repository");
        let staging = dest.with_extension("partial");
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .with_context(|| format!("could not remove '{}'", staging.display()))?;
        }
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--depth", "1", "--quiet", identifier])
            .arg(&staging);
        run_captured(cmd).with_context(|| format!("could not clone {identifier}"))?;
        fs::rename(&staging, dest)
            .with_context(|| format!("could not move clone to '{}'", dest.display()))
    }
}

impl RepositoryCache for GitRepoCache {
    fn resolve(&mut self, identifier: &str) -> anyhow::Result<PathBuf> {
        if let Some(path) = self.resolved.get(identifier) {
            return Ok(path.clone());
        }

        fs::create_dir_all(&self.root)
            .with_context(|| format!("could not create cache '{}'", self.root.display()))?;
        let dest = self.root.join(Self::entry_name(identifier));
        if dest.is_dir() {
            debug!(%identifier, path = %dest.display(), "cache hit");
        } else {
            self.clone_into(identifier, &dest)?;
        }

        self.resolved.insert(identifier.to_owned(), dest.clone());
        Ok(dest)
    }
}
