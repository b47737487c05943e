//! `rungame`: play a batch of matches between two bot repositories.
//!
//! ```text
//! rungame [--realtime] [--games N] <MAP_NAME> <REPO>...
//! ```
//!
//! Paths and external tools are configured through `ARENA_*` environment variables, see
//! [`sc2_arena::configuration`].

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use sc2_arena::{logger, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "rungame")]
#[command(about = "Run StarCraft II bot matches between two repositories", long_about = None)]
struct Args {
    /// Run in realtime mode (reserved, currently ignored)
    #[arg(long)]
    realtime: bool,

    /// Number of matches to play (overrides ARENA_GAMES)
    #[arg(long)]
    games: Option<usize>,

    /// Map name
    map_name: String,

    /// Exactly two https repository URLs
    #[arg(required = true)]
    repo: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // no filesystem side effect before the usage checks
    let repositories = match validate_repositories(&args.repo) {
        Ok(repositories) => repositories,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let mut config = Configuration::from_env();
    if let Some(games) = args.games {
        config = config.with_games(games);
    }

    let log_to_file = config.log_enabled();
    let logging = if log_to_file {
        logger::init_file_logger(config.log_dir())
    } else {
        logger::init_stderr_logger()
    };
    if let Err(e) = logging {
        eprintln!("{e:#}");
    }

    if args.realtime {
        debug!("realtime mode requested, not supported yet");
    }

    let mut orchestrator = Orchestrator::from_config(config);
    match orchestrator.run(&args.map_name, &repositories) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if log_to_file {
                error!("{e:#}");
            }
            eprintln!("{e:#}");
            ExitCode::from(exit_code_of(&e) as u8)
        }
    }
}
