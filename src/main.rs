mod cli;
mod completion;

use anyhow::{Context, Result};
use awed::config::{self, EngineConfig};
use awed::playlist::Playlist;
use awed::probe::ProbeBackend;
use awed::sequencer::Sequencer;
use awed::{logging, report, session};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use path_absolutize::Absolutize;
use std::io;
use std::path::Path;

/// Main entry point for the Awed application.
///
/// Logging goes to `awed.log` in the data directory and is controlled via
/// `RUST_LOG`:
/// - `RUST_LOG=debug awed pick ~/Music` - Enable debug logging
/// - `RUST_LOG=awed::sampling=trace awed pick ~/Music` - Module-specific logging
fn main() -> Result<()> {
    let log_path = config::get_log_path().ok();
    logging::init(log_path.as_deref());

    let args = cli::Args::parse();
    let engine_config = match &args.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    debug!("Using {engine_config:?}");

    match args.command {
        cli::Command::Pick { dir, count } => {
            let mut playlist = open(&dir, engine_config)?;
            for _ in 0..count {
                let id = playlist.pick_track()?;
                if let Some(track) = playlist.track(id) {
                    println!("{}", track.path().display());
                }
            }
        }
        cli::Command::Weights { dir } => {
            let playlist = open(&dir, engine_config)?;
            print!("{}", report::render_tree(playlist.root()));
        }
        cli::Command::Rate { dir, track, rating } => {
            let mut playlist = open(&dir, engine_config)?;
            let track_path = track
                .absolutize()
                .with_context(|| format!("Invalid track path {}", track.display()))?;
            let id = playlist
                .find_track_by_path(&track_path)
                .with_context(|| format!("{} is not a track below {}", track.display(), dir.display()))?;

            match rating {
                cli::Rating::Favorite => playlist.favorite(id)?,
                cli::Rating::Skip => playlist.skip(id)?,
                cli::Rating::Never => playlist.never_play(id)?,
            }
            playlist.rebalance();
            if let Some(track) = playlist.track(id) {
                println!("{}: weight {}", track.name(), track.weight());
            }
        }
        cli::Command::Session { dir } => {
            let playlist = open(&dir, engine_config)?;
            let mut sequencer = Sequencer::start(playlist, ProbeBackend::new())?;
            let stdin = io::stdin();
            session::run(&mut sequencer, stdin.lock(), &mut io::stdout())?;
            sequencer.close();
            info!("Session ended");
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}

fn open(dir: &Path, engine_config: EngineConfig) -> Result<Playlist> {
    info!("Loading weights below {}", dir.display());
    Playlist::open(dir, engine_config).with_context(|| format!("Cannot play {}", dir.display()))
}
