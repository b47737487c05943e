//! Fake collaborators and a scratch arena shared by the integration tests.
#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use sc2_arena::{anyhow, prelude::*};
use tracing::Level;

pub const REPO_A: &str = "https://github.com/arena/terran-bot";
pub const REPO_B: &str = "https://github.com/arena/zerg-bot";

/// Replay content written by each side of a match, `None` when the side records nothing.
pub type Script = [Option<&'static str>; 2];

pub const P0_WINS: Option<&str> = Some(r#"{"0": true, "1": false}"#);
pub const P1_WINS: Option<&str> = Some(r#"{"0": false, "1": true}"#);
pub const TIE: Option<&str> = Some(r#"{"0": false, "1": false}"#);
pub const GARBAGE: Option<&str> = Some("not a replay");

/// Container runtime that "plays" a match by writing the scripted replays when started.
#[derive(Default)]
pub struct FakeRuntime {
    pub scripts: HashMap<usize, Script>,
    pub fail_build_of: Option<usize>,
    pub polls_until_done: Cell<usize>,
    pub built: RefCell<Vec<(PathBuf, String)>>,
    pub removed: RefCell<Vec<String>>,
    pub started: RefCell<Vec<(String, String, EnvironmentDescriptor)>>,
    pub polled_volumes: RefCell<Vec<PathBuf>>,
}

impl FakeRuntime {
    pub fn with_scripts(scripts: impl IntoIterator<Item = (usize, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            polls_until_done: Cell::new(2),
            ..Default::default()
        }
    }
}

impl ContainerRuntime for FakeRuntime {
    fn build_image(&self, context: &Path, image: &str) -> anyhow::Result<()> {
        let index = self.built.borrow().len();
        if self.fail_build_of == Some(index) {
            anyhow::bail!("docker build failed for {image}");
        }
        self.built
            .borrow_mut()
            .push((context.to_path_buf(), image.to_owned()));
        Ok(())
    }

    fn remove_environment(&self, name: &str) -> anyhow::Result<()> {
        self.removed.borrow_mut().push(name.to_owned());
        anyhow::bail!("Error response from daemon: No such container: {name}")
    }

    fn start_environment(
        &self,
        image: &str,
        name: &str,
        descriptor: &EnvironmentDescriptor,
    ) -> anyhow::Result<String> {
        let script = self
            .scripts
            .get(&descriptor.match_index)
            .copied()
            .unwrap_or([None, None]);
        for (side, content) in script.iter().enumerate() {
            if let Some(content) = content {
                let path = descriptor
                    .replays
                    .source
                    .join(format!("{}_{side}.SC2Replay", descriptor.match_index));
                fs::write(path, content)?;
            }
        }
        self.started
            .borrow_mut()
            .push((image.to_owned(), name.to_owned(), descriptor.clone()));
        Ok(format!("id-{name}"))
    }

    fn list_running(&self, volume: &Path) -> anyhow::Result<Vec<String>> {
        self.polled_volumes.borrow_mut().push(volume.to_path_buf());
        let left = self.polls_until_done.get();
        if left == 0 {
            return Ok(vec![]);
        }
        self.polls_until_done.set(left - 1);
        Ok(self
            .started
            .borrow()
            .iter()
            .map(|(_, name, _)| format!("id-{name}"))
            .collect())
    }
}

/// Replay reader for fake replays holding the decoded JSON verdict.
pub struct JsonReplayReader;

impl ReplayReader for JsonReplayReader {
    fn read_verdict(&self, path: &Path) -> anyhow::Result<Verdict> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Repository cache over local directories.
pub struct DirCache {
    pub dirs: HashMap<String, PathBuf>,
    pub calls: usize,
}

impl RepositoryCache for DirCache {
    fn resolve(&mut self, identifier: &str) -> anyhow::Result<PathBuf> {
        self.calls += 1;
        self.dirs
            .get(identifier)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("cannot fetch {identifier}"))
    }
}

/// Scratch directory with a game installation, a template and two bot repositories.
pub struct Arena {
    pub tmp: tempfile::TempDir,
}

impl Arena {
    pub fn new() -> Self {
        Self::with_botinfo(
            r#"{"race": "Terran", "name": "Marine"}"#,
            r#"{"race": "Zerg", "name": "Zergling"}"#,
        )
    }

    pub fn with_botinfo(first: &str, second: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("StarCraftII/Maps")).unwrap();
        fs::create_dir_all(root.join("template_container")).unwrap();
        fs::write(root.join("template_container/Dockerfile"), "FROM python:3.11\n").unwrap();
        fs::write(root.join("template_container/startup.py"), "import os\n").unwrap();

        for (name, botinfo) in [("bot_a", first), ("bot_b", second)] {
            let repo = root.join("repos").join(name);
            fs::create_dir_all(&repo).unwrap();
            fs::write(repo.join("botinfo.json"), botinfo).unwrap();
            fs::write(repo.join("start_bot.py"), format!("# {name}\n")).unwrap();
        }
        Self { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn config(&self, games: usize) -> Configuration {
        Configuration::new()
            .with_verbose(false)
            .with_work_dir(self.root())
            .with_template_dir(self.root().join("template_container"))
            .with_game_data_dir(self.root().join("StarCraftII"))
            .with_wait_policy(WaitPolicy::new(Duration::from_millis(1)))
            .with_games(games)
    }

    pub fn cache(&self) -> DirCache {
        DirCache {
            dirs: HashMap::from([
                (REPO_A.to_owned(), self.root().join("repos/bot_a")),
                (REPO_B.to_owned(), self.root().join("repos/bot_b")),
            ]),
            calls: 0,
        }
    }

    pub fn repositories() -> [String; 2] {
        [REPO_A.to_owned(), REPO_B.to_owned()]
    }

    pub fn results_file(&self) -> PathBuf {
        self.root().join("results/results.json")
    }

    /// Play a batch of `games` matches with the given runtime.
    pub fn play(&self, runtime: &FakeRuntime, games: usize) -> anyhow::Result<Vec<MatchRecord>> {
        let mut orchestrator =
            Orchestrator::new(self.config(games), self.cache(), runtime, JsonReplayReader);
        orchestrator.run("AcropolisLE", &Self::repositories())
    }
}

/// In-memory sink for the events emitted while a closure runs.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber recording warnings, return its output and the recorded text.
pub fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
    (out, text)
}
