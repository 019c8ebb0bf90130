//! # Playback Sequencer
//!
//! Keeps three loaded tracks around the play head and talks to whatever
//! actually produces sound through [`PlaybackBackend`]:
//!
//! ```text
//! last played <- [previous] [current] [next] <- up next / fresh pick
//! ```
//!
//! Advancing releases `previous` into the "last played" history; going back
//! pushes `next` onto the front of "up next". Only ids are kept in those
//! queues; handles are prepared again when a track comes back.

use crate::error::{EngineError, MediaOpenError, Result};
use crate::playlist::Playlist;
use crate::source::{Track, TrackId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;

/// The external playback collaborator.
pub trait PlaybackBackend {
    /// Whatever the backend needs to play one track.
    type Handle;

    /// Open `track` for playback.
    fn prepare(&mut self, track: &Track) -> std::result::Result<Self::Handle, MediaOpenError>;
    fn release(&mut self, handle: Self::Handle);
    /// Start or resume playback. A failure here means the media is unusable.
    fn play(&mut self, handle: &Self::Handle) -> std::result::Result<(), MediaOpenError>;
    fn pause(&mut self, handle: &Self::Handle);
    /// Stop and rewind.
    fn stop(&mut self, handle: &Self::Handle);
    fn is_playing(&self, handle: &Self::Handle) -> bool;
    /// Jump to `ratio` of the track's duration, already clamped to `[0, 1]`.
    fn seek(&mut self, handle: &Self::Handle, ratio: f64);
    /// Position divided by duration.
    fn progress_ratio(&self, handle: &Self::Handle) -> f64;
}

#[derive(Debug)]
struct Loaded<H> {
    id: TrackId,
    handle: H,
}

/// Drives a [`Playlist`] through a [`PlaybackBackend`].
pub struct Sequencer<B: PlaybackBackend> {
    playlist: Playlist,
    backend: B,
    rng: StdRng,
    previous: Option<Loaded<B::Handle>>,
    current: Option<Loaded<B::Handle>>,
    next: Option<Loaded<B::Handle>>,
    up_next: VecDeque<TrackId>,
    last_played: VecDeque<TrackId>,
}

impl<B: PlaybackBackend> Sequencer<B> {
    /// Fill all three slots and start playing.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoSelectableTrack`] if every track fails to open.
    pub fn start(playlist: Playlist, backend: B) -> Result<Self> {
        Self::start_with_rng(playlist, backend, StdRng::from_entropy())
    }

    pub fn start_with_rng(playlist: Playlist, backend: B, rng: StdRng) -> Result<Self> {
        let mut sequencer = Self {
            playlist,
            backend,
            rng,
            previous: None,
            current: None,
            next: None,
            up_next: VecDeque::new(),
            last_played: VecDeque::new(),
        };
        sequencer.previous = Some(sequencer.get_valid_track()?);
        sequencer.current = Some(sequencer.get_valid_track()?);
        sequencer.next = Some(sequencer.get_valid_track()?);
        sequencer.play()?;
        Ok(sequencer)
    }

    /// Pick tracks until one can be prepared. Tracks that fail are
    /// invalidated on the way.
    fn get_valid_track(&mut self) -> Result<Loaded<B::Handle>> {
        loop {
            let id = self.playlist.pick_track_with(&mut self.rng)?;
            if let Some(loaded) = self.load(id)? {
                return Ok(loaded);
            }
        }
    }

    /// Prepare a known track. `None` if it is gone or fails to open.
    fn load(&mut self, id: TrackId) -> Result<Option<Loaded<B::Handle>>> {
        let track = self.playlist.track(id).ok_or(EngineError::UnknownTrack(id.get()))?;
        if !track.is_valid() {
            return Ok(None);
        }
        match self.backend.prepare(track) {
            Ok(handle) => Ok(Some(Loaded { id, handle })),
            Err(e) => {
                log::warn!("{e}");
                self.playlist.invalidate(id)?;
                Ok(None)
            }
        }
    }

    fn refill_next(&mut self) -> Result<Loaded<B::Handle>> {
        while let Some(id) = self.up_next.pop_front() {
            if let Some(loaded) = self.load(id)? {
                return Ok(loaded);
            }
        }
        self.get_valid_track()
    }

    fn refill_previous(&mut self) -> Result<Option<Loaded<B::Handle>>> {
        while let Some(id) = self.last_played.pop_front() {
            if let Some(loaded) = self.load(id)? {
                return Ok(Some(loaded));
            }
        }
        Ok(None)
    }

    fn remember(&mut self, id: TrackId) {
        self.last_played.push_front(id);
        self.last_played.truncate(self.playlist.config().history_size);
    }

    /// Play the current track. A track the backend refuses is invalidated
    /// and the next one takes its place.
    pub fn play(&mut self) -> Result<()> {
        loop {
            let current = self.current.as_ref().ok_or(EngineError::NoSelectableTrack)?;
            match self.backend.play(&current.handle) {
                Ok(()) => {
                    log::info!("Playing {}", self.current_title().unwrap_or_default());
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("{e}");
                    self.drop_current()?;
                }
            }
        }
    }

    /// Invalidate the current track and promote the next one.
    fn drop_current(&mut self) -> Result<()> {
        if let Some(failed) = self.current.take() {
            self.backend.release(failed.handle);
            self.playlist.invalidate(failed.id)?;
        }
        self.current = self.next.take();
        self.next = Some(self.refill_next()?);
        Ok(())
    }

    pub fn play_pause(&mut self) -> Result<()> {
        match &self.current {
            Some(current) if self.backend.is_playing(&current.handle) => {
                self.backend.pause(&current.handle);
                Ok(())
            }
            _ => self.play(),
        }
    }

    /// Advance without touching any weight.
    pub fn play_next(&mut self) -> Result<()> {
        if let Some(current) = &self.current {
            self.backend.stop(&current.handle);
        }
        if let Some(previous) = self.previous.take() {
            self.backend.release(previous.handle);
            self.remember(previous.id);
        }
        self.previous = self.current.take();
        self.current = self.next.take();
        self.next = Some(self.refill_next()?);
        self.play()
    }

    /// Lower the current track's weight and advance.
    pub fn skip_next(&mut self) -> Result<()> {
        if let Some(id) = self.current_id() {
            self.playlist.skip(id)?;
        }
        self.play_next()
    }

    /// Go back one track. Returns `false` when there is nothing to go back to.
    pub fn previous(&mut self) -> Result<bool> {
        let Some(previous) = self.previous.take() else {
            return Ok(false);
        };
        if let Some(current) = &self.current {
            self.backend.stop(&current.handle);
        }
        if let Some(next) = self.next.take() {
            self.backend.release(next.handle);
            self.up_next.push_front(next.id);
        }
        self.next = self.current.take();
        self.current = Some(previous);
        self.previous = self.refill_previous()?;
        self.play()?;
        Ok(true)
    }

    /// Raise the current track's weight. Playback continues.
    pub fn favorite_current(&mut self) -> Result<()> {
        match self.current_id() {
            Some(id) => self.playlist.favorite(id),
            None => Ok(()),
        }
    }

    /// Zero the current track's weight and advance.
    pub fn never_play_current(&mut self) -> Result<()> {
        if let Some(id) = self.current_id() {
            self.playlist.never_play(id)?;
        }
        self.play_next()
    }

    pub fn seek(&mut self, ratio: f64) {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        if let Some(current) = &self.current {
            self.backend.seek(&current.handle, ratio);
        }
    }

    #[must_use]
    pub fn current_progress_ratio(&self) -> f64 {
        self.current
            .as_ref()
            .map_or(0.0, |current| self.backend.progress_ratio(&current.handle))
    }

    /// Queue a track to play after the current one, ahead of random picks.
    pub fn enqueue(&mut self, id: TrackId) -> Result<()> {
        self.playlist.track(id).ok_or(EngineError::UnknownTrack(id.get()))?;
        self.up_next.push_back(id);
        Ok(())
    }

    #[must_use]
    pub fn current_id(&self) -> Option<TrackId> {
        self.current.as_ref().map(|loaded| loaded.id)
    }

    #[must_use]
    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.track(self.current_id()?)
    }

    #[must_use]
    pub fn previous_track(&self) -> Option<&Track> {
        self.playlist.track(self.previous.as_ref()?.id)
    }

    #[must_use]
    pub fn next_track(&self) -> Option<&Track> {
        self.playlist.track(self.next.as_ref()?.id)
    }

    #[must_use]
    pub fn current_title(&self) -> Option<String> {
        self.current_track().map(Track::title)
    }

    /// Most recent first.
    pub fn last_played(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.last_played.iter().copied()
    }

    #[must_use]
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stop playback, release every handle and hand the playlist back.
    pub fn close(mut self) -> Playlist {
        if let Some(current) = &self.current {
            self.backend.stop(&current.handle);
        }
        for loaded in [self.previous.take(), self.current.take(), self.next.take()]
            .into_iter()
            .flatten()
        {
            self.backend.release(loaded.handle);
        }
        if self.playlist.is_stale() {
            self.playlist.rebalance();
        }
        self.playlist
    }
}

impl<B> Sequencer<B>
where
    B: PlaybackBackend,
    B::Handle: PartialEq,
{
    /// The backend finished a track. Stale reports for other handles are
    /// ignored.
    pub fn report_playback_finished(&mut self, handle: &B::Handle) -> Result<()> {
        if self.is_current(handle) {
            self.play_next()
        } else {
            log::debug!("Ignoring finish report for a track that is not current");
            Ok(())
        }
    }

    /// The backend could not play a track after all: drop it for good.
    pub fn report_playback_failed(&mut self, handle: &B::Handle) -> Result<()> {
        if !self.is_current(handle) {
            log::debug!("Ignoring failure report for a track that is not current");
            return Ok(());
        }
        self.drop_current()?;
        self.play()
    }

    fn is_current(&self, handle: &B::Handle) -> bool {
        self.current.as_ref().is_some_and(|current| current.handle == *handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockBackend {
        next_handle: u32,
        open: HashMap<u32, PathBuf>,
        playing: Option<u32>,
        positions: HashMap<u32, f64>,
        broken: HashSet<String>,
        unplayable: HashSet<String>,
    }

    impl MockBackend {
        fn playing_name(&self) -> Option<String> {
            let path = self.open.get(&self.playing?)?;
            Some(path.file_name()?.to_string_lossy().into_owned())
        }
    }

    impl PlaybackBackend for MockBackend {
        type Handle = u32;

        fn prepare(&mut self, track: &Track) -> std::result::Result<u32, MediaOpenError> {
            if self.broken.contains(track.name()) {
                return Err(MediaOpenError::new(track.path(), "corrupt"));
            }
            self.next_handle += 1;
            self.open.insert(self.next_handle, track.path().to_path_buf());
            Ok(self.next_handle)
        }

        fn release(&mut self, handle: u32) {
            assert!(self.open.remove(&handle).is_some(), "double release");
            if self.playing == Some(handle) {
                self.playing = None;
            }
        }

        fn play(&mut self, handle: &u32) -> std::result::Result<(), MediaOpenError> {
            let path = self.open.get(handle).expect("prepared").clone();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if self.unplayable.contains(&name) {
                return Err(MediaOpenError::new(&path, "no decoder"));
            }
            self.playing = Some(*handle);
            Ok(())
        }

        fn pause(&mut self, handle: &u32) {
            if self.playing == Some(*handle) {
                self.playing = None;
            }
        }

        fn stop(&mut self, handle: &u32) {
            self.pause(handle);
            self.positions.remove(handle);
        }

        fn is_playing(&self, handle: &u32) -> bool {
            self.playing == Some(*handle)
        }

        fn seek(&mut self, handle: &u32, ratio: f64) {
            self.positions.insert(*handle, ratio);
        }

        fn progress_ratio(&self, handle: &u32) -> f64 {
            self.positions.get(handle).copied().unwrap_or(0.0)
        }
    }

    fn library(names: &[&str]) -> (TempDir, Playlist) {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"audio").unwrap();
        }
        let playlist = Playlist::open(dir.path(), EngineConfig::default()).unwrap();
        (dir, playlist)
    }

    fn start(playlist: Playlist, backend: MockBackend) -> Sequencer<MockBackend> {
        Sequencer::start_with_rng(playlist, backend, StdRng::seed_from_u64(42)).unwrap()
    }

    fn slots(sequencer: &Sequencer<MockBackend>) -> (TrackId, TrackId, TrackId) {
        (
            sequencer.previous_track().unwrap().id(),
            sequencer.current_track().unwrap().id(),
            sequencer.next_track().unwrap().id(),
        )
    }

    #[test]
    fn test_start_fills_three_distinct_slots() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
        let sequencer = start(playlist, MockBackend::default());

        let (previous, current, next) = slots(&sequencer);
        assert_ne!(previous, current);
        assert_ne!(current, next);
        assert_ne!(previous, next);
        assert!(sequencer.backend().is_playing(&sequencer.current.as_ref().unwrap().handle));
        assert_eq!(sequencer.backend().open.len(), 3);
    }

    #[test]
    fn test_play_next_shifts_slots() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3", "e.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());
        let (previous, current, next) = slots(&sequencer);

        sequencer.play_next().unwrap();

        assert_eq!(sequencer.previous_track().unwrap().id(), current);
        assert_eq!(sequencer.current_track().unwrap().id(), next);
        assert_eq!(sequencer.last_played().collect::<Vec<_>>(), vec![previous]);
        assert_eq!(sequencer.backend().open.len(), 3, "old previous released");
        assert_eq!(
            sequencer.backend().playing_name().as_deref(),
            Some(sequencer.current_track().unwrap().name())
        );
    }

    #[test]
    fn test_previous_walks_back_through_history() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3", "e.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());
        let (first_previous, first_current, first_next) = slots(&sequencer);
        sequencer.play_next().unwrap();
        let fresh = sequencer.next_track().unwrap().id();

        assert!(sequencer.previous().unwrap());
        assert_eq!(slots(&sequencer), (first_previous, first_current, first_next));
        assert_eq!(sequencer.last_played().count(), 0);

        sequencer.play_next().unwrap();
        assert_eq!(sequencer.current_track().unwrap().id(), first_next);
        assert_eq!(sequencer.next_track().unwrap().id(), fresh, "up next is used before a new pick");
    }

    #[test]
    fn test_previous_without_history_is_refused() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());

        assert!(sequencer.previous().unwrap());
        assert!(sequencer.previous_track().is_none());
        assert!(!sequencer.previous().unwrap());
    }

    #[test]
    fn test_history_is_bounded() {
        let (dir, _) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
        let config = EngineConfig {
            history_size: 3,
            ..EngineConfig::default()
        };
        let playlist = Playlist::open(dir.path(), config).unwrap();
        let mut sequencer = start(playlist, MockBackend::default());

        for _ in 0..10 {
            sequencer.play_next().unwrap();
        }
        assert_eq!(sequencer.last_played().count(), 3);
    }

    #[test]
    fn test_tracks_failing_to_prepare_are_invalidated() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "bad.mp3", "c.mp3"]);
        let backend = MockBackend {
            broken: HashSet::from(["bad.mp3".to_string()]),
            ..MockBackend::default()
        };
        let mut sequencer = start(playlist, backend);

        for _ in 0..30 {
            assert_ne!(sequencer.current_track().unwrap().name(), "bad.mp3");
            sequencer.play_next().unwrap();
        }
        let bad = sequencer.playlist().root().tracks().into_iter().find(|t| t.name() == "bad.mp3");
        assert!(!bad.unwrap().is_valid(), "picked at least once in 30 rounds");
        assert_eq!(sequencer.playlist().count(), 3);
    }

    #[test]
    fn test_play_failure_promotes_next() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3", "mute.mp3"]);
        let backend = MockBackend {
            unplayable: HashSet::from(["mute.mp3".to_string()]),
            ..MockBackend::default()
        };
        let mut sequencer = start(playlist, backend);

        for _ in 0..30 {
            let playing = sequencer.backend().playing_name();
            assert!(playing.is_some());
            assert_ne!(playing.as_deref(), Some("mute.mp3"));
            sequencer.play_next().unwrap();
        }
    }

    #[test]
    fn test_skip_and_never_play_change_weights() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());

        let skipped = sequencer.current_id().unwrap();
        sequencer.skip_next().unwrap();
        let never = sequencer.current_id().unwrap();
        sequencer.never_play_current().unwrap();

        let playlist = sequencer.close();
        let skipped = playlist.track(skipped).unwrap().weight();
        let never = playlist.track(never).unwrap().weight();
        assert_eq!(never, 0.0);
        assert!(skipped > 0.0);
        let others: Vec<f64> = playlist
            .root()
            .tracks()
            .iter()
            .map(|t| t.weight())
            .filter(|w| *w > skipped)
            .collect();
        assert_eq!(others.len(), 2, "skipped track is lighter than untouched ones");
    }

    #[test]
    fn test_favorite_does_not_advance() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());
        let current = sequencer.current_id().unwrap();

        sequencer.favorite_current().unwrap();
        assert_eq!(sequencer.current_id(), Some(current));
        assert!(sequencer.playlist().is_stale());
    }

    #[test]
    fn test_play_pause_toggles() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());

        sequencer.play_pause().unwrap();
        assert!(sequencer.backend().playing.is_none());
        sequencer.play_pause().unwrap();
        assert!(sequencer.backend().playing.is_some());
    }

    #[test]
    fn test_seek_clamps_ratio() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());

        sequencer.seek(1.7);
        assert_eq!(sequencer.current_progress_ratio(), 1.0);
        sequencer.seek(-0.2);
        assert_eq!(sequencer.current_progress_ratio(), 0.0);
        sequencer.seek(0.25);
        assert_eq!(sequencer.current_progress_ratio(), 0.25);
    }

    #[test]
    fn test_finished_report_advances_only_for_current() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());
        let (_, current, next) = slots(&sequencer);

        sequencer.report_playback_finished(&9_999).unwrap();
        assert_eq!(sequencer.current_id(), Some(current));

        let handle = sequencer.current.as_ref().unwrap().handle;
        sequencer.report_playback_finished(&handle).unwrap();
        assert_eq!(sequencer.current_id(), Some(next));
    }

    #[test]
    fn test_failed_report_invalidates_current() {
        let (_dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());
        let (_, current, next) = slots(&sequencer);

        let handle = sequencer.current.as_ref().unwrap().handle;
        sequencer.report_playback_failed(&handle).unwrap();

        assert_eq!(sequencer.current_id(), Some(next));
        assert!(!sequencer.playlist().track(current).unwrap().is_valid());
        assert_eq!(sequencer.playlist().count(), 3);
    }

    #[test]
    fn test_enqueued_track_plays_after_next() {
        let (dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3", "d.mp3", "e.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());
        let wanted = sequencer
            .playlist()
            .find_track_by_path(&dir.path().join("e.mp3"))
            .unwrap();

        sequencer.enqueue(wanted).unwrap();
        sequencer.play_next().unwrap();
        assert_eq!(sequencer.next_track().unwrap().id(), wanted);
    }

    #[test]
    fn test_close_persists_pending_feedback() {
        let (dir, playlist) = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut sequencer = start(playlist, MockBackend::default());
        let favorite = sequencer.current_track().unwrap().name().to_string();
        sequencer.favorite_current().unwrap();

        let playlist = sequencer.close();
        assert!(!playlist.is_stale());
        let sidecar = fs::read_to_string(dir.path().join("awed.txt")).unwrap();
        assert!(sidecar.starts_with("1.5 "), "{sidecar}");
        assert!(sidecar.lines().next().unwrap().ends_with(&favorite));
    }
}
