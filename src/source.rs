//! Audio sources: the leaves ([`Track`]) and the tagged union
//! ([`AudioSource`]) every recursive tree operation dispatches on.

use crate::node::Node;
use crate::weight_store;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a track within one [`crate::playlist::Playlist`].
///
/// Ids are handed out in construction order and are never reused while the
/// tree lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub(crate) u32);

impl TrackId {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single playable file.
///
/// A track starts out valid. Once the playback collaborator fails to open it,
/// it is invalidated for good: its weight becomes NaN and it drops out of
/// every count and sum.
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    name: String,
    path: PathBuf,
    weight: f64,
    valid: bool,
    cumulative_weight: f64,
}

impl Track {
    pub(crate) fn new(id: TrackId, path: PathBuf, weight: f64) -> Self {
        let name = entry_name(&path);
        let valid = weight.is_finite() && weight >= 0.0;
        Self {
            id,
            name,
            path,
            weight: if valid { weight } else { f64::NAN },
            valid,
            cumulative_weight: f64::NAN,
        }
    }

    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// File name of the track, as listed in its folder.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without its last extension.
    #[must_use]
    pub fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Own weight. NaN once the track is invalid.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Permanently exclude this track from selection.
    pub(crate) fn invalidate(&mut self) {
        if self.valid {
            log::warn!("Track {} can not be played and is excluded from now on", self.path.display());
        }
        self.valid = false;
        self.weight = f64::NAN;
    }

    fn count(&self) -> usize {
        usize::from(self.valid)
    }

    fn total_weight(&self) -> f64 {
        if self.valid {
            self.weight
        } else {
            0.0
        }
    }

    pub(crate) fn rescale_weight(&mut self, multiplier: f64) {
        if self.valid {
            self.set_weight(self.weight * multiplier);
        }
    }

    fn set_weight(&mut self, weight: f64) {
        if !self.valid {
            return;
        }
        if weight.is_finite() && weight >= 0.0 {
            self.weight = weight;
        } else {
            log::debug!("Ignoring weight {weight} for {}", self.name);
        }
    }
}

/// Either a track or a folder in the weighted tree.
#[derive(Debug)]
pub enum AudioSource {
    Track(Track),
    Node(Node),
}

impl AudioSource {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Track(track) => track.name(),
            Self::Node(node) => node.name(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Track(track) => track.path(),
            Self::Node(node) => node.path(),
        }
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Node(_))
    }

    /// Position of this source's upper bound within its parent's `[0, 1]`
    /// range. NaN until the parent has normalized its children.
    #[must_use]
    pub fn cumulative_weight(&self) -> f64 {
        match self {
            Self::Track(track) => track.cumulative_weight,
            Self::Node(node) => node.cumulative_weight,
        }
    }

    pub(crate) fn set_cumulative_weight(&mut self, value: f64) {
        match self {
            Self::Track(track) => track.cumulative_weight = value,
            Self::Node(node) => node.cumulative_weight = value,
        }
    }

    /// Number of valid tracks at or below this source.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Track(track) => track.count(),
            Self::Node(node) => node.count(),
        }
    }

    /// Sum of the weights of all valid tracks at or below this source.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        match self {
            Self::Track(track) => track.total_weight(),
            Self::Node(node) => node.total_weight(),
        }
    }

    /// Multiply every valid track weight at or below this source.
    pub fn rescale_weight(&mut self, multiplier: f64) {
        match self {
            Self::Track(track) => track.rescale_weight(multiplier),
            Self::Node(node) => node.rescale_weight(multiplier),
        }
    }

    /// Make [`Self::total_weight`] equal `target`, keeping relative weights.
    pub fn set_aggregate_weight(&mut self, target: f64) {
        match self {
            Self::Track(track) => track.set_weight(target),
            Self::Node(node) => node.set_aggregate_weight(target),
        }
    }

    #[must_use]
    pub fn is_selectable(&self) -> bool {
        match self {
            Self::Track(track) => track.is_valid(),
            Self::Node(node) => node.is_selectable(),
        }
    }

    /// Descend to a track. A track returns itself whatever the residual.
    #[must_use]
    pub fn sample(&self, residual: f64) -> Option<&Track> {
        match self {
            Self::Track(track) => track.is_valid().then_some(track),
            Self::Node(node) => node.sample(residual),
        }
    }

    /// Refresh cumulative weights below this source and return the weight it
    /// contributes to its parent.
    pub fn recompute_cumulative(&mut self) -> f64 {
        match self {
            Self::Track(track) => track.total_weight(),
            Self::Node(node) => node.recompute_cumulative(),
        }
    }

    /// Weight as stored in the parent's sidecar file: the average per-track
    /// weight for folders, the raw weight for tracks.
    #[must_use]
    pub fn normalized_weight(&self) -> f64 {
        match self {
            Self::Track(track) => track.weight(),
            Self::Node(node) => node.normalized_weight(),
        }
    }

    /// `"<weight> <name>"` line for the parent's sidecar file.
    #[must_use]
    pub fn serialized_weight_line(&self) -> String {
        weight_store::format_line(self.normalized_weight(), self.name())
    }
}

/// Last path component, as the file system lists it.
pub(crate) fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
