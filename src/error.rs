//! Error types for the weighted playlist engine.
//!
//! Only [`EngineError`] ever reaches a caller. [`PersistenceError`] is logged
//! and swallowed by the sidecar code, and [`MediaOpenError`] is recovered by
//! the sequencer, which invalidates the track and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The path handed to [`crate::playlist::Playlist::open`] is not a folder
    #[error("A folder containing songs must be selected to play: {0}")]
    NotADirectory(PathBuf),

    /// Fewer selectable tracks than the configured minimum
    #[error("Invalid playlist {path}: found {found} playable tracks, need at least {required}")]
    EmptyFolder {
        path: PathBuf,
        found: usize,
        required: usize,
    },

    /// The tree has no track left to pick. A tree invariant was broken.
    #[error("No selectable track left in the playlist")]
    NoSelectableTrack,

    /// A track id that does not belong to this tree
    #[error("Unknown track id: {0}")]
    UnknownTrack(u32),

    /// Playback could not be started at all
    #[error(transparent)]
    MediaOpen(#[from] MediaOpenError),
}

/// The playback collaborator could not prepare or start a track.
#[derive(Debug, Error)]
#[error("Cannot open media {path}: {reason}")]
pub struct MediaOpenError {
    pub path: PathBuf,
    pub reason: String,
}

impl MediaOpenError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Reading or writing a sidecar weight file failed.
#[derive(Debug, Error)]
#[error("Sidecar file {path}: {source}")]
pub struct PersistenceError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl PersistenceError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
