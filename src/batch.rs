//! Batch-scoped state: the matches to play and the directories they live in.

use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use tracing::{debug, instrument};

use crate::error::ArenaError;

/// Number of sides in every match.
pub const SIDES: usize = 2;

/// File extension of replays written by the game.
pub const REPLAY_EXTENSION: &str = "SC2Replay";

/// One contest between two repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    index: usize,
    repositories: [String; SIDES],
}

impl Match {
    /// Match number `index` of the batch, sides in the given order.
    pub fn new(index: usize, repositories: [String; SIDES]) -> Self {
        Self {
            index,
            repositories,
        }
    }

    /// Zero-based index inside the batch.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Repository of each side, in side order.
    pub fn repositories(&self) -> &[String; SIDES] {
        &self.repositories
    }

    /// Name of the image built for this match.
    pub fn image_name(&self) -> String {
        format!("sc2_match{}_image", self.index)
    }

    /// Name of the environment running this match.
    pub fn environment_name(&self) -> String {
        format!("sc2_match{}", self.index)
    }
}

impl Display for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "match{}", self.index)
    }
}

/// Check the repository identifiers given on the command line.
///
/// Exactly two `https://` URLs are accepted. Nothing touches the filesystem.
pub fn validate_repositories(repositories: &[String]) -> Result<[String; SIDES], ArenaError> {
    let [first, second] = repositories else {
        return Err(ArenaError::WrongRepositoryCount(repositories.len()));
    };
    for repo in [first, second] {
        if !repo.starts_with("https://") {
            return Err(ArenaError::InsecureRepository(repo.clone()));
        }
    }
    Ok([first.clone(), second.clone()])
}

/// Build a batch of `games` matches, each with the sides in the given order.
pub fn build_matches(repositories: &[String; SIDES], games: usize) -> Vec<Match> {
    (0..games)
        .map(|index| Match::new(index, repositories.clone()))
        .collect()
}

/// Directories of one orchestrator run.
///
/// Created once per run by [`BatchContext::prepare`] and passed to every stage. Nothing is
/// removed at the end of a run, so the directories stay around for inspection.
#[derive(Debug, Clone)]
pub struct BatchContext {
    containers: PathBuf,
    results: PathBuf,
    replays: PathBuf,
    game_data: PathBuf,
}

impl BatchContext {
    /// Recreate empty `containers/`, `results/` and `replays/` under `work_dir`.
    ///
    /// Whatever a previous run left there is destroyed. `game_data_dir` must exist, it is
    /// resolved to an absolute path because it is bind-mounted and used to find running
    /// environments.
    #[instrument]
    pub fn prepare(work_dir: &Path, game_data_dir: &Path) -> anyhow::Result<Self> {
        if !game_data_dir.is_dir() {
            bail!("game data directory '{}' does not exist", game_data_dir.display());
        }
        let game_data = game_data_dir
            .canonicalize()
            .with_context(|| format!("could not resolve '{}'", game_data_dir.display()))?;

        let ctx = Self {
            containers: fresh_root(work_dir, "containers")?,
            results: fresh_root(work_dir, "results")?,
            replays: fresh_root(work_dir, "replays")?,
            game_data,
        };
        debug!(?ctx, "batch directories ready");
        Ok(ctx)
    }

    /// Working directory of match `index`.
    pub fn match_dir(&self, index: usize) -> PathBuf {
        self.containers.join(format!("match{index}"))
    }

    /// Snapshot directory of one side of match `index`.
    pub fn side_dir(&self, index: usize, side: usize) -> PathBuf {
        self.match_dir(index).join(format!("repo{side}"))
    }

    /// Replay written by `side` of match `index`.
    pub fn replay_path(&self, index: usize, side: usize) -> PathBuf {
        self.replays
            .join(format!("{index}_{side}.{REPLAY_EXTENSION}"))
    }

    /// Location of the result artifact.
    pub fn results_file(&self) -> PathBuf {
        self.results.join("results.json")
    }

    /// Absolute shared replay directory.
    pub fn replays_dir(&self) -> &Path {
        &self.replays
    }

    /// Absolute shared game installation.
    pub fn game_data_dir(&self) -> &Path {
        &self.game_data
    }
}

/// Empty `work_dir/name`, returned as an absolute path.
fn fresh_root(work_dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let dir = work_dir.join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir).with_context(|| format!("could not remove '{}'", dir.display()))?;
    }
    fs::create_dir_all(&dir).with_context(|| format!("could not create '{}'", dir.display()))?;
    dir.canonicalize()
        .with_context(|| format!("could not resolve '{}'", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repos(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_two_https_repositories() {
        let ok = validate_repositories(&repos(&["https://a/x", "https://b/y"])).unwrap();
        assert_eq!(ok, ["https://a/x".to_owned(), "https://b/y".to_owned()]);
    }

    #[test]
    fn rejects_wrong_count() {
        let err = validate_repositories(&repos(&["https://a/x"])).unwrap_err();
        assert!(matches!(err, ArenaError::WrongRepositoryCount(1)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_other_schemes() {
        let err = validate_repositories(&repos(&["https://a/x", "git@github.com:b/y"])).unwrap_err();
        assert!(matches!(err, ArenaError::InsecureRepository(ref r) if r == "git@github.com:b/y"));
        let err = validate_repositories(&repos(&["http://a/x", "https://b/y"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn matches_keep_side_order_and_unique_names() {
        let matches = build_matches(&["https://a".into(), "https://b".into()], 3);
        assert_eq!(matches.len(), 3);
        for (i, m) in matches.iter().enumerate() {
            assert_eq!(m.index(), i);
            assert_eq!(m.repositories()[0], "https://a");
            assert_eq!(m.environment_name(), format!("sc2_match{i}"));
            assert_eq!(m.image_name(), format!("sc2_match{i}_image"));
        }
    }

    #[test]
    fn prepare_wipes_previous_run() {
        let work = tempfile::tempdir().unwrap();
        let data = work.path().join("StarCraftII");
        fs::create_dir(&data).unwrap();
        fs::create_dir_all(work.path().join("replays")).unwrap();
        fs::write(work.path().join("replays/0_0.SC2Replay"), b"old").unwrap();

        let ctx = BatchContext::prepare(work.path(), &data).unwrap();

        assert_eq!(fs::read_dir(ctx.replays_dir()).unwrap().count(), 0);
        assert!(ctx.results_file().parent().unwrap().is_dir());
        assert!(ctx.replay_path(1, 0).ends_with("1_0.SC2Replay"));
        assert_ne!(ctx.side_dir(0, 0), ctx.side_dir(1, 0));
        assert!(ctx.game_data_dir().is_absolute());
    }

    #[test]
    fn prepare_requires_game_data() {
        let work = tempfile::tempdir().unwrap();
        assert!(BatchContext::prepare(work.path(), &work.path().join("missing")).is_err());
        assert!(!work.path().join("containers").exists());
    }
}
