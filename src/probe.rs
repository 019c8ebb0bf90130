//! A [`PlaybackBackend`] that never makes a sound.
//!
//! It checks that a track's file can be opened and is not empty, and keeps a
//! simulated play head so the command line session has something to show.

use crate::error::MediaOpenError;
use crate::sequencer::PlaybackBackend;
use crate::source::Track;
use std::fs::File;
use std::path::PathBuf;

/// An opened track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHandle {
    serial: u64,
    path: PathBuf,
    len: u64,
}

impl ProbeHandle {
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// File size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Default)]
pub struct ProbeBackend {
    next_serial: u64,
    active: Option<u64>,
    paused: bool,
    position: f64,
    prepared: usize,
}

impl ProbeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles prepared and not yet released.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.prepared
    }

    fn is_active(&self, handle: &ProbeHandle) -> bool {
        self.active == Some(handle.serial)
    }
}

impl PlaybackBackend for ProbeBackend {
    type Handle = ProbeHandle;

    fn prepare(&mut self, track: &Track) -> Result<ProbeHandle, MediaOpenError> {
        let file = File::open(track.path())
            .map_err(|e| MediaOpenError::new(track.path(), e.to_string()))?;
        let len = file
            .metadata()
            .map_err(|e| MediaOpenError::new(track.path(), e.to_string()))?
            .len();
        if len == 0 {
            return Err(MediaOpenError::new(track.path(), "file is empty"));
        }

        self.next_serial += 1;
        self.prepared += 1;
        log::trace!("Prepared {} ({len} bytes)", track.path().display());
        Ok(ProbeHandle {
            serial: self.next_serial,
            path: track.path().to_path_buf(),
            len,
        })
    }

    fn release(&mut self, handle: ProbeHandle) {
        if self.is_active(&handle) {
            self.active = None;
        }
        self.prepared = self.prepared.saturating_sub(1);
    }

    fn play(&mut self, handle: &ProbeHandle) -> Result<(), MediaOpenError> {
        if !handle.path.is_file() {
            return Err(MediaOpenError::new(&handle.path, "file disappeared"));
        }
        if !self.is_active(handle) {
            self.active = Some(handle.serial);
            self.position = 0.0;
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self, handle: &ProbeHandle) {
        if self.is_active(handle) {
            self.paused = true;
        }
    }

    fn stop(&mut self, handle: &ProbeHandle) {
        if self.is_active(handle) {
            self.active = None;
            self.paused = false;
            self.position = 0.0;
        }
    }

    fn is_playing(&self, handle: &ProbeHandle) -> bool {
        self.is_active(handle) && !self.paused
    }

    fn seek(&mut self, handle: &ProbeHandle, ratio: f64) {
        if self.is_active(handle) {
            self.position = ratio;
        }
    }

    fn progress_ratio(&self, handle: &ProbeHandle) -> f64 {
        if self.is_active(handle) {
            self.position
        } else {
            0.0
        }
    }
}
