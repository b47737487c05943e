//! Victory flags recorded in replay files.

use std::{collections::BTreeMap, fmt::Display, path::Path, process::Command};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::container::run_captured;

/// Player id as numbered by the replay.
pub type PlayerId = u32;

/// Victory flag of every player of one replay, ordered by player id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Verdict(BTreeMap<PlayerId, bool>);

impl Verdict {
    /// Build a verdict from `(player, victory)` pairs.
    pub fn new(flags: impl IntoIterator<Item = (PlayerId, bool)>) -> Self {
        Self(flags.into_iter().collect())
    }

    /// Player whose victory flag is set, `None` for a tie.
    ///
    /// A replay should set at most one flag. If several are set, the lowest player id is
    /// returned and a warning is logged.
    pub fn winner(&self) -> Option<PlayerId> {
        let mut victors = self.0.iter().filter(|(_, victory)| **victory).map(|(&id, _)| id);
        let winner = victors.next();
        if let Some(other) = victors.next() {
            warn!(?winner, other, "several players flagged as victorious");
        }
        winner
    }

    /// Player ids present in the replay.
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.0.keys().copied()
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = self
            .0
            .iter()
            .map(|(id, victory)| format!("{id}: {victory}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{flags}}}")
    }
}

/// Extracts the victory flags of a replay file.
pub trait ReplayReader {
    /// Verdict recorded in the replay at `path`, which exists.
    fn read_verdict(&self, path: &Path) -> anyhow::Result<Verdict>;
}

impl<P: ReplayReader + ?Sized> ReplayReader for &P {
    fn read_verdict(&self, path: &Path) -> anyhow::Result<Verdict> {
        (**self).read_verdict(path)
    }
}

/// [`ReplayReader`] delegating the decoding to an external program.
///
/// The program is called as `<program> <replay path>` and must print a JSON object mapping
/// player ids to victory flags, e.g. `{"0": true, "1": false}`.
#[derive(Debug, Clone)]
pub struct CommandReplayReader {
    program: String,
}

impl CommandReplayReader {
    /// Use `program` to decode replays.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ReplayReader for CommandReplayReader {
    #[instrument(skip(self))]
    fn read_verdict(&self, path: &Path) -> anyhow::Result<Verdict> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(path);
        let output = run_captured(cmd)
            .with_context(|| format!("could not decode '{}'", path.display()))?;
        serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "'{}' printed an invalid verdict for '{}'",
                self.program,
                path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_flag_wins() {
        assert_eq!(Verdict::new([(0, true), (1, false)]).winner(), Some(0));
        assert_eq!(Verdict::new([(0, false), (1, true)]).winner(), Some(1));
    }

    #[test]
    fn no_flag_is_a_tie() {
        assert_eq!(Verdict::new([(0, false), (1, false)]).winner(), None);
        assert_eq!(Verdict::default().winner(), None);
    }

    #[test]
    fn lowest_player_wins_when_data_is_inconsistent() {
        assert_eq!(Verdict::new([(2, true), (1, true)]).winner(), Some(1));
    }

    #[test]
    fn parses_reader_output() {
        let verdict: Verdict = serde_json::from_str(r#"{"1": false, "0": true}"#).unwrap();
        assert_eq!(verdict, Verdict::new([(0, true), (1, false)]));
        assert_eq!(verdict.to_string(), "{0: true, 1: false}");
    }

    #[cfg(unix)]
    #[test]
    fn command_reader_parses_program_output() {
        let dir = tempfile::tempdir().unwrap();
        let replay = dir.path().join("0_0.SC2Replay");
        std::fs::write(&replay, r#"{"0": false, "1": true}"#).unwrap();

        // `cat` prints the fake replay, which already holds the decoded verdict
        let reader = CommandReplayReader::new("cat");
        assert_eq!(reader.read_verdict(&replay).unwrap().winner(), Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn command_reader_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let replay = dir.path().join("0_0.SC2Replay");
        std::fs::write(&replay, b"MPQ\x1a binary").unwrap();

        assert!(CommandReplayReader::new("cat").read_verdict(&replay).is_err());
    }
}
