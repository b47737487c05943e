//! Per-match working directories.
//!
//! Every match gets its own directory under the batch `containers/` root:
//!
//! ```text
//! containers/match{i}/
//!     repo0/          full copy of the first repository
//!     repo1/          full copy of the second repository
//!     Dockerfile ...  template overlay
//!     <extra>/        extra build context directories, by name
//! ```
//!
//! The directory is the build context of the match image, so nothing in it is shared with
//! another match or with the repository cache.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::{debug, info, instrument};

use crate::{
    batch::{BatchContext, Match},
    bot_info::BotInfo,
    repo_cache::RepositoryCache,
};

pub mod fs_utils;

/// Bot metadata of both sides of a match, in side order.
pub type MatchBots = [BotInfo; 2];

/// Content added to every match directory on top of the repositories.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    /// Directory whose entries are copied into the match root.
    pub template_dir: PathBuf,
    /// Directories copied into the match root under their own name.
    pub extra_context: Vec<PathBuf>,
}

impl Overlay {
    /// Overlay of `template_dir` only.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            extra_context: vec![],
        }
    }

    /// Add an extra build context directory.
    pub fn with_extra_context(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_context.push(dir.into());
        self
    }

    fn apply(&self, match_dir: &Path) -> anyhow::Result<()> {
        if !self.template_dir.is_dir() {
            bail!(
                "template directory '{}' does not exist",
                self.template_dir.display()
            );
        }
        fs_utils::copy_contents(&self.template_dir, match_dir)
            .context("could not overlay template")?;

        for extra in &self.extra_context {
            let Some(name) = extra.file_name() else {
                bail!("extra context '{}' has no directory name", extra.display());
            };
            fs_utils::copy_tree(extra, &match_dir.join(name))
                .with_context(|| format!("could not copy extra context '{}'", extra.display()))?;
        }
        Ok(())
    }
}

/// Build the working directory of every match, then read the metadata of every side.
///
/// Sides are copied in the order of the match's repository pair. The first invalid
/// `botinfo.json` stops everything, before any environment exists.
#[instrument(skip_all, fields(matches = matches.len()))]
pub fn provision_matches<C: RepositoryCache + ?Sized>(
    ctx: &BatchContext,
    matches: &[Match],
    cache: &mut C,
    overlay: &Overlay,
) -> anyhow::Result<Vec<MatchBots>> {
    for m in matches {
        for (side, repo) in m.repositories().iter().enumerate() {
            let snapshot = cache
                .resolve(repo)
                .with_context(|| format!("could not fetch {repo}"))?;
            let dest = ctx.side_dir(m.index(), side);
            debug!(%repo, from = %snapshot.display(), to = %dest.display(), "copying snapshot");
            fs_utils::copy_tree(&snapshot, &dest)
                .with_context(|| format!("could not copy {repo} into {m}"))?;
        }
        overlay
            .apply(&ctx.match_dir(m.index()))
            .with_context(|| format!("could not prepare {m}"))?;
        info!("{m} provisioned");
    }

    matches
        .iter()
        .map(|m| collect_bots(ctx, m).with_context(|| format!("invalid bot in {m}")))
        .collect()
}

fn collect_bots(ctx: &BatchContext, m: &Match) -> anyhow::Result<MatchBots> {
    let [first, second] = [0, 1].map(|side| BotInfo::load(&ctx.side_dir(m.index(), side), side));
    let bots = [first?, second?];
    debug!(match_index = m.index(), ?bots);
    Ok(bots)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use super::*;
    use crate::{batch::build_matches, error::exit_code_of};

    struct DirCache(HashMap<String, PathBuf>);

    impl RepositoryCache for DirCache {
        fn resolve(&mut self, identifier: &str) -> anyhow::Result<PathBuf> {
            self.0
                .get(identifier)
                .cloned()
                .with_context(|| format!("unknown {identifier}"))
        }
    }

    fn bot_repo(root: &Path, name: &str, botinfo: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("botinfo.json"), botinfo).unwrap();
        fs::write(dir.join("src/bot.py"), name).unwrap();
        dir
    }

    fn setup(second_botinfo: &str) -> (tempfile::TempDir, BatchContext, DirCache, Overlay) {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("StarCraftII");
        fs::create_dir(&data).unwrap();
        let template = tmp.path().join("template");
        fs::create_dir(&template).unwrap();
        fs::write(template.join("Dockerfile"), "FROM scratch").unwrap();

        let cache = DirCache(HashMap::from([
            (
                "https://x/a".to_owned(),
                bot_repo(tmp.path(), "a", r#"{"race": "Terran", "name": "A"}"#),
            ),
            ("https://x/b".to_owned(), bot_repo(tmp.path(), "b", second_botinfo)),
        ]));
        let ctx = BatchContext::prepare(tmp.path(), &data).unwrap();
        (tmp, ctx, cache, Overlay::new(template))
    }

    #[test]
    fn every_match_gets_its_own_copy() {
        let (_tmp, ctx, mut cache, overlay) = setup(r#"{"race": "Zerg", "name": "B"}"#);
        let matches = build_matches(&["https://x/a".into(), "https://x/b".into()], 2);

        let bots = provision_matches(&ctx, &matches, &mut cache, &overlay).unwrap();

        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0][0].race, "Terran");
        assert_eq!(bots[0][1].race, "Zerg");
        for i in 0..2 {
            assert!(ctx.match_dir(i).join("Dockerfile").is_file());
            assert_eq!(
                fs::read_to_string(ctx.side_dir(i, 1).join("src/bot.py")).unwrap(),
                "b"
            );
        }
        fs::write(ctx.side_dir(0, 0).join("src/bot.py"), "changed").unwrap();
        assert_eq!(
            fs::read_to_string(ctx.side_dir(1, 0).join("src/bot.py")).unwrap(),
            "a"
        );
    }

    #[test]
    fn missing_race_is_a_metadata_error() {
        let (_tmp, ctx, mut cache, overlay) = setup(r#"{"name": "B"}"#);
        let matches = build_matches(&["https://x/a".into(), "https://x/b".into()], 1);

        let err = provision_matches(&ctx, &matches, &mut cache, &overlay).unwrap_err();

        assert_eq!(exit_code_of(&err), 3);
    }

    #[test]
    fn extra_context_is_copied_by_name() {
        let (tmp, ctx, mut cache, overlay) = setup(r#"{"race": "Zerg", "name": "B"}"#);
        let lib = tmp.path().join("python-sc2");
        fs::create_dir(&lib).unwrap();
        fs::write(lib.join("setup.py"), "").unwrap();
        let overlay = overlay.with_extra_context(&lib);
        let matches = build_matches(&["https://x/a".into(), "https://x/b".into()], 1);

        provision_matches(&ctx, &matches, &mut cache, &overlay).unwrap();

        assert!(ctx.match_dir(0).join("python-sc2/setup.py").is_file());
    }
}
