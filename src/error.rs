//! Categorized fatal conditions and their process exit codes.
//!
//! Everything else in the crate propagates `anyhow::Error`. The binary walks the error chain
//! looking for an [`ArenaError`] to pick the exit code; any other failure exits with
//! [`ArenaError::GENERIC_EXIT_CODE`].

use std::path::PathBuf;

use thiserror::Error;

/// A fatal condition with a dedicated exit code.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The command line did not name exactly two repositories.
    #[error("There must be exactly two repositories (got {0}).")]
    WrongRepositoryCount(usize),

    /// A repository identifier does not use the `https://` scheme.
    #[error("Please use https url to repo, and not {0}")]
    InsecureRepository(String),

    /// `botinfo.json` is absent from one side's snapshot.
    #[error("File botinfo.json is missing for repo{side}")]
    BotInfoMissing {
        /// Side index inside the match.
        side: usize,
        /// Path that was looked up.
        path: PathBuf,
    },

    /// `botinfo.json` exists but is not a JSON object.
    #[error("Invalid botinfo.json for repo{side}: {reason}")]
    BotInfoMalformed {
        /// Side index inside the match.
        side: usize,
        /// Parser message.
        reason: String,
    },

    /// A required key is absent or has the wrong JSON type.
    #[error("Invalid botinfo.json for repo{side}: key '{key}' missing, or type is not {expected}")]
    BotInfoKey {
        /// Side index inside the match.
        side: usize,
        /// Offending key.
        key: &'static str,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// Neither side of a match recorded a readable replay.
    #[error("No replays were recorded by either client of match{0}")]
    NoVerdict(usize),

    /// The completion wait ran past its deadline.
    #[error("environments still running after {0:?}")]
    WaitTimedOut(std::time::Duration),

    /// The completion wait was cancelled through its token.
    #[error("completion wait cancelled")]
    WaitCancelled,
}

impl ArenaError {
    /// Exit code for failures that are not an [`ArenaError`].
    pub const GENERIC_EXIT_CODE: i32 = 1;

    /// Process exit code associated with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ArenaError::WrongRepositoryCount(_) | ArenaError::InsecureRepository(_) => 2,
            ArenaError::BotInfoMissing { .. }
            | ArenaError::BotInfoMalformed { .. }
            | ArenaError::BotInfoKey { .. } => 3,
            ArenaError::NoVerdict(_) | ArenaError::WaitTimedOut(_) | ArenaError::WaitCancelled => 1,
        }
    }
}

/// Exit code for any error produced by the crate.
pub fn exit_code_of(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ArenaError>())
        .map(ArenaError::exit_code)
        .unwrap_or(ArenaError::GENERIC_EXIT_CODE)
}
