//! Turning replays into match results.
//!
//! Both sides of a match record their own replay, so a match has up to two verdicts. They
//! should agree. The reconciler keeps the first verdict found (in side order), reports any
//! later verdict that disagrees, and only gives up when no side recorded anything.
//!
//! Player ids are assumed to be side indices (player 0 is `repo0`). This is not verified, a
//! verdict naming other players is reported but still used.

use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    batch::{BatchContext, Match, SIDES},
    error::ArenaError,
    replay::{PlayerId, ReplayReader, Verdict},
};

/// Result of one match, as written to the result artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Winning player, `None` for a tie.
    pub winner: Option<PlayerId>,
    /// Repositories of the match, in side order.
    pub repositories: [String; SIDES],
}

/// Merge the verdicts of every side of match `match_index` into a winner.
///
/// `verdicts` yields, in side order, the verdict each side recorded (`None` when it recorded
/// nothing usable).
pub fn reconcile_verdicts(
    match_index: usize,
    verdicts: impl IntoIterator<Item = (usize, Option<Verdict>)>,
) -> Result<Option<PlayerId>, ArenaError> {
    let mut working: Option<(usize, Verdict)> = None;
    for (side, verdict) in verdicts {
        let Some(verdict) = verdict else {
            continue;
        };
        if let Some((first_side, first)) = &working {
            if *first != verdict {
                warn!(
                    "Conflicting winner information (match{match_index}:repo{side}): \
                     repo{side} recorded {verdict}, repo{first_side} recorded {first}"
                );
            }
            continue;
        }
        working = Some((side, verdict));
    }

    let Some((side, verdict)) = working else {
        return Err(ArenaError::NoVerdict(match_index));
    };
    if let Some(stranger) = verdict.players().find(|&id| id as usize >= SIDES) {
        warn!(
            "match{match_index}: replay of repo{side} names player {stranger}, \
             player ids are expected to be side indices"
        );
    }
    Ok(verdict.winner())
}

/// Verdict recorded by `side` of `m`, `None` if the replay is missing or unreadable.
fn read_side<P: ReplayReader + ?Sized>(
    reader: &P,
    ctx: &BatchContext,
    m: &Match,
    side: usize,
) -> Option<Verdict> {
    let path = ctx.replay_path(m.index(), side);
    if !path.is_file() {
        warn!("Process {m}:repo{side} didn't record a replay");
        return None;
    }
    match reader.read_verdict(&path) {
        Ok(verdict) => {
            debug!(%verdict, "{m}:repo{side}");
            Some(verdict)
        }
        Err(e) => {
            warn!("Process {m}:repo{side} recorded an unreadable replay: {e:#}");
            None
        }
    }
}

/// Reconcile one match from the replays in the batch replay directory.
pub fn reconcile_match<P: ReplayReader + ?Sized>(
    reader: &P,
    ctx: &BatchContext,
    m: &Match,
) -> anyhow::Result<MatchRecord> {
    let verdicts = (0..SIDES).map(|side| (side, read_side(reader, ctx, m, side)));
    let winner = reconcile_verdicts(m.index(), verdicts)?;
    info!(?winner, "{m} reconciled");
    Ok(MatchRecord {
        winner,
        repositories: m.repositories().clone(),
    })
}

/// Reconcile every match, in batch order.
///
/// Stops at the first match without any verdict: no record is returned for the batch.
#[instrument(skip_all, fields(matches = matches.len()))]
pub fn reconcile_batch<P: ReplayReader + ?Sized>(
    reader: &P,
    ctx: &BatchContext,
    matches: &[Match],
) -> anyhow::Result<Vec<MatchRecord>> {
    matches
        .iter()
        .map(|m| reconcile_match(reader, ctx, m))
        .collect()
}

/// Write the result artifact, replacing any previous one.
pub fn write_results(path: &Path, records: &[MatchRecord]) -> anyhow::Result<()> {
    let json = serde_json::to_string(records).context("could not serialize results")?;
    fs::write(path, json).with_context(|| format!("could not write '{}'", path.display()))
}
