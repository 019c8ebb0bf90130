//! Weighted shuffle over a folder tree that remembers what you like.
//!
//! Core modules:
//! - [`playlist`] - Open a folder, give feedback, pick tracks
//! - [`node`] / [`source`] - The folder tree and its aggregate weights
//! - [`sampling`] - Inverse-CDF descent and the no-repeat rule
//! - [`weight_store`] - Per-folder `awed.txt` weight files
//! - [`sequencer`] - Previous/current/next slots over a playback backend
//!
//! ### Supporting Modules
//!
//! - [`config`] - Configuration and data directory management
//! - [`error`] - Error types
//! - [`logging`] - Logger setup
//! - [`probe`] - A silent backend that only checks files can be read
//! - [`report`] - Text view of a weighted tree
//! - [`session`] - Line driven sequencer control
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use awed::config::EngineConfig;
//! use awed::playlist::Playlist;
//! use std::path::Path;
//!
//! let mut playlist = Playlist::open(Path::new("/home/me/Music"), EngineConfig::default())?;
//! let id = playlist.pick_track()?;
//! println!("Now playing {}", playlist.track(id).unwrap().title());
//!
//! // Twice as likely from now on; saved next to the music before the next pick.
//! playlist.favorite(id)?;
//! # Ok::<(), awed::error::EngineError>(())
//! ```
//!
//! ## How weights work
//!
//! Every track has a weight, `1.0` by default. A folder's chance of being
//! picked is the sum of its tracks' weights, so big folders are not drowned
//! out by small ones and a favorite track also lifts its album a little.
//!
//! - **favorite**: weight times 2
//! - **skip**: weight times 0.5
//! - **never**: weight 0, the track is kept but never picked
//!
//! A track that cannot be opened is dropped for the rest of the session.
//! Folders with fewer than three playable tracks are never picked from.
//!
//! Weights are written to `awed.txt` in every folder, keyed by file name, so
//! moving or renaming the music folder itself keeps its history.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod playlist;
pub mod probe;
pub mod report;
pub mod sampling;
pub mod sequencer;
pub mod session;
pub mod source;
pub mod weight_store;
