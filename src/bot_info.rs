//! `botinfo.json`, the metadata file of a bot repository.

use std::path::Path;

use serde_json::Value;
use tracing::instrument;

use crate::error::ArenaError;

/// File every bot repository carries at its root.
pub const BOT_INFO_FILE: &str = "botinfo.json";

/// Metadata a bot repository declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotInfo {
    /// Race played, passed to the game as is (`Terran`, `Zerg`, `Protoss`, `Random`).
    pub race: String,
    /// Display name.
    pub name: String,
}

impl BotInfo {
    /// Read `botinfo.json` from the snapshot of `side`.
    ///
    /// Every failure is a [`ArenaError`] naming the side, so the run can stop with the
    /// metadata exit code.
    #[instrument]
    pub fn load(repo_dir: &Path, side: usize) -> Result<BotInfo, ArenaError> {
        let path = repo_dir.join(BOT_INFO_FILE);
        let content = std::fs::read_to_string(&path)
            .map_err(|_| ArenaError::BotInfoMissing { side, path })?;
        Self::parse(&content, side)
    }

    /// Parse the content of a `botinfo.json`.
    ///
    /// Keys other than `race` and `name` are ignored.
    pub fn parse(content: &str, side: usize) -> Result<BotInfo, ArenaError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ArenaError::BotInfoMalformed {
                side,
                reason: e.to_string(),
            })?;
        let Value::Object(object) = value else {
            return Err(ArenaError::BotInfoMalformed {
                side,
                reason: "not a JSON object".to_owned(),
            });
        };

        let required_string = |key: &'static str| match object.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(ArenaError::BotInfoKey {
                side,
                key,
                expected: "string",
            }),
        };

        Ok(BotInfo {
            race: required_string("race")?,
            name: required_string("name")?,
        })
    }
}
