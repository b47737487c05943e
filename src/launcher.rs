//! Image build and start of every match environment.

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::{
    batch::{BatchContext, Match},
    container::{ContainerRuntime, EnvironmentDescriptor},
    provisioner::MatchBots,
};

/// Build and start the environment of every match, in batch order.
///
/// A stale environment with the same name is removed before starting; failing to remove it
/// is only logged. Any build or start failure stops the batch, environments already started keep
/// running.
#[instrument(skip_all, fields(map_name = %map_name))]
pub fn launch_matches<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    ctx: &BatchContext,
    matches: &[Match],
    bots: &[MatchBots],
    map_name: &str,
) -> anyhow::Result<Vec<String>> {
    matches
        .iter()
        .zip(bots)
        .map(|(m, bots)| {
            let descriptor = EnvironmentDescriptor::new(
                m.index(),
                map_name,
                bots.iter().map(|bot| bot.race.clone()).collect(),
                ctx.game_data_dir(),
                ctx.replays_dir(),
            );
            launch_match(runtime, ctx, m, &descriptor).with_context(|| format!("could not launch {m}"))
        })
        .collect()
}

fn launch_match<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    ctx: &BatchContext,
    m: &Match,
    descriptor: &EnvironmentDescriptor,
) -> anyhow::Result<String> {
    let image = m.image_name();
    let name = m.environment_name();

    runtime.build_image(&ctx.match_dir(m.index()), &image)?;
    if let Err(e) = runtime.remove_environment(&name) {
        debug!("no stale environment removed for {m}: {e:#}");
    }
    let id = runtime.start_environment(&image, &name, descriptor)?;
    info!(%id, races = ?descriptor.races, "{m} started");
    Ok(id)
}
