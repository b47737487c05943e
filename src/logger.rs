//! Tracing subscribers for the `rungame` binary.

use std::{fs::File, path::Path};

use anyhow::Context;
use time::{
    format_description::{self, parse},
    OffsetDateTime,
};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{
    fmt::{
        time::{FormatTime, OffsetTime},
        writer::BoxMakeWriter,
    },
    FmtSubscriber,
};

/// Send every event to a new timestamped file in `log_dir`.
pub fn init_file_logger(log_dir: &Path) -> anyhow::Result<()> {
    let path = log_dir.join(get_log_file_name()?);
    let file = File::create(&path)
        .with_context(|| format!("could not create log file '{}'", path.display()))?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_timer(local_timer()?)
        .with_writer(BoxMakeWriter::new(file))
        .finish();

    set_global_default(subscriber).context(
        "Could not set global default tracing subscriber. Consider disabling logs if you are already setting a subscriber.",
    )
}

/// Send warnings and errors to stderr.
pub fn init_stderr_logger() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    set_global_default(subscriber).context("Could not set global default tracing subscriber")
}

fn local_timer() -> anyhow::Result<impl FormatTime> {
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let format = format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
        .context("invalid timestamp format")?;
    Ok(OffsetTime::new(local_offset, format))
}

fn get_log_file_name() -> anyhow::Result<String> {
    let format = parse("[year]-[month]-[day]_[hour]:[minute]:[second]_log.txt")
        .context("invalid log file name format")?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&format).context("could not format log file name")
}
