//! # Command-Line Interface Module
//!
//! Clap definitions for the `awed` binary.
//!
//! ## Commands
//!
//! - `pick`: Open a folder and print weighted picks
//! - `weights`: Show every folder's effective weights and selection shares
//! - `rate`: Favorite, skip or never-play one track
//! - `session`: Interactive session driven by stdin
//! - `completion`: Shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! awed pick ~/Music -n 10
//! awed rate ~/Music ~/Music/Album/song.flac favorite
//! awed session ~/Music
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Feedback that can be given for a single track.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Rating {
    /// Double the track's weight
    Favorite,
    /// Halve the track's weight
    Skip,
    /// Never pick the track again
    Never,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "awed")]
#[command(about = "Awed: weighted shuffle over a folder of music, remembering what you like")]
#[command(version)]
pub struct Args {
    /// Configuration file (defaults to config.json in the data directory)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a folder and print weighted picks
    ///
    /// Weight files are created or refreshed in every folder below DIR.
    Pick {
        /// Folder holding at least three playable tracks
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,

        /// Number of tracks to pick
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Show the weighted tree
    ///
    /// Prints every folder and track with its stored weight and its share of
    /// its parent's selection range.
    Weights {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,
    },

    /// Give feedback for one track and save it
    Rate {
        /// Folder the track is played from
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,

        /// Path of the track inside DIR
        #[arg(value_hint = clap::ValueHint::FilePath)]
        track: PathBuf,

        rating: Rating,
    },

    /// Interactive session reading commands from stdin
    ///
    /// Commands: next, skip, prev, fav, never, pause, seek <ratio>, status,
    /// quit. Tracks are only checked for readability; nothing is played
    /// through speakers.
    Session {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,
    },

    /// Generate shell completions
    ///
    /// Usage: awed completion bash > ~/.local/share/bash-completion/completions/awed
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
