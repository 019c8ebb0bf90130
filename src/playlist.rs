//! The root of a weighted tree: opening a folder, feedback on tracks, and
//! the lazy rebalance that runs before the next pick.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::node::{BuildContext, Node};
use crate::source::{Track, TrackId};
use crate::weight_store;
use path_absolutize::Absolutize;
use rand::Rng;
use std::path::Path;

/// A folder opened for weighted playback.
#[derive(Debug)]
pub struct Playlist {
    root: Node,
    config: EngineConfig,
    stale: bool,
}

impl Playlist {
    /// Build the tree under `dir`, merge the recorded weights and persist the
    /// result.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotADirectory`] if `dir` is not a folder
    /// - [`EngineError::EmptyFolder`] if fewer than
    ///   [`EngineConfig::min_selectable`] tracks can be picked
    pub fn open(dir: &Path, config: EngineConfig) -> Result<Self> {
        if !dir.is_dir() {
            return Err(EngineError::NotADirectory(dir.to_path_buf()));
        }
        let dir = dir
            .absolutize()
            .map_err(|_| EngineError::NotADirectory(dir.to_path_buf()))?
            .into_owned();

        log::info!("Opening playlist {}", dir.display());
        let own_weight = weight_store::read_own_weight(&dir, &config.sidecar_name)
            .unwrap_or(weight_store::NEUTRAL_WEIGHT);

        let mut ctx = BuildContext::new(&config);
        let mut root = Node::build(&dir, own_weight, &[], &mut ctx);
        if !root.is_selectable() {
            return Err(EngineError::EmptyFolder {
                path: dir,
                found: root.selectable_tracks(),
                required: config.min_selectable,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        root.set_aggregate_weight(root.count() as f64);
        ctx.apply_recorded_weights(&mut root);

        let mut playlist = Self {
            root,
            config,
            stale: true,
        };
        playlist.rebalance();
        log::info!(
            "Playlist {} ready with {} tracks",
            playlist.root.path().display(),
            playlist.root.count()
        );
        Ok(playlist)
    }

    /// Renormalize, persist and refresh cumulative weights.
    ///
    /// The root's total is pinned to its recorded average times its track
    /// count, so absolute weights stay comparable across sessions.
    pub fn rebalance(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let target = self.root.average_weight() * self.root.count() as f64;
        self.root.set_aggregate_weight(target);

        let failures = weight_store::save_tree(&self.root);
        if failures > 0 {
            log::warn!("{failures} weight files could not be saved");
        }

        self.root.recompute_cumulative();
        self.stale = false;
        log::debug!("Rebalanced {} to total weight {target}", self.root.name());
    }

    fn rebalance_if_stale(&mut self) {
        if self.stale {
            self.rebalance();
        }
    }

    /// Pick the next track with the thread-local generator.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoSelectableTrack`] once every track is gone.
    pub fn pick_track(&mut self) -> Result<TrackId> {
        self.pick_track_with(&mut rand::thread_rng())
    }

    /// Pick the next track with a caller-supplied generator.
    ///
    /// Pending feedback is applied first. A pick that repeats one of the two
    /// previous picks is redrawn up to
    /// [`EngineConfig::max_repeat_retries`] times, after which the repeat is
    /// accepted.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoSelectableTrack`] once every track is gone.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use awed::config::EngineConfig;
    /// use awed::playlist::Playlist;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use std::path::Path;
    ///
    /// let mut playlist = Playlist::open(Path::new("/music"), EngineConfig::default())?;
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let first = playlist.pick_track_with(&mut rng)?;
    /// let second = playlist.pick_track_with(&mut rng)?;
    /// assert_ne!(first, second);
    /// # Ok::<(), awed::error::EngineError>(())
    /// ```
    pub fn pick_track_with<R: Rng>(&mut self, rng: &mut R) -> Result<TrackId> {
        self.rebalance_if_stale();
        self.root.pick_track(rng, self.config.max_repeat_retries)
    }

    /// Resolve a fixed residual without touching the pick history.
    pub fn sample_at(&mut self, residual: f64) -> Option<TrackId> {
        self.rebalance_if_stale();
        self.root.sample(residual).map(Track::id)
    }

    /// Multiply one track's weight. Takes effect at the next pick.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownTrack`] if `id` is not part of this tree.
    pub fn rescale_track(&mut self, id: TrackId, multiplier: f64) -> Result<()> {
        let track = self
            .root
            .find_track_mut(id)
            .ok_or(EngineError::UnknownTrack(id.get()))?;
        track.rescale_weight(multiplier);
        log::debug!("Weight of {} multiplied by {multiplier}", track.name());
        self.stale = true;
        Ok(())
    }

    /// Multiply the track's weight by [`EngineConfig::favorite_multiplier`]
    /// (2.0 by default). Saved at the next rebalance.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownTrack`] if `id` is not part of this tree.
    pub fn favorite(&mut self, id: TrackId) -> Result<()> {
        self.rescale_track(id, self.config.favorite_multiplier)
    }

    /// Multiply the track's weight by [`EngineConfig::skip_multiplier`]
    /// (0.5 by default). Saved at the next rebalance.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownTrack`] if `id` is not part of this tree.
    pub fn skip(&mut self, id: TrackId) -> Result<()> {
        self.rescale_track(id, self.config.skip_multiplier)
    }

    /// Zero the weight. The track stays in the tree and in every count.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownTrack`] if `id` is not part of this tree.
    pub fn never_play(&mut self, id: TrackId) -> Result<()> {
        self.rescale_track(id, self.config.never_play_multiplier)
    }

    /// The track could not be opened: exclude it for the rest of the session.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownTrack`] if `id` is not part of this tree.
    pub fn invalidate(&mut self, id: TrackId) -> Result<()> {
        self.root
            .find_track_mut(id)
            .ok_or(EngineError::UnknownTrack(id.get()))?
            .invalidate();
        self.stale = true;
        Ok(())
    }

    #[must_use]
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.root.find_track(id)
    }

    /// Find a track by absolute path (relative paths are resolved against
    /// the working directory).
    #[must_use]
    pub fn find_track_by_path(&self, path: &Path) -> Option<TrackId> {
        let path = path.absolutize().ok()?;
        self.root.find_track_by_path(&path).map(Track::id)
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// True when feedback arrived since the last rebalance.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.root.count()
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.root.total_weight()
    }

    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.root.is_selectable()
    }
}
