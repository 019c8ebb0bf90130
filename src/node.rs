//! Folder nodes of the weighted tree.
//!
//! A [`Node`] owns its children outright; there are no parent pointers. The
//! path of a folder's own sidecar file is derived from the folder itself.
//!
//! Construction is driven by a [`BuildContext`] that lives for exactly one
//! root build. It hands out track ids and remembers, deepest folder first,
//! which sub-folders still need their recorded share applied once the whole
//! tree exists.

use crate::config::EngineConfig;
use crate::sampling::PickHistory;
use crate::source::{entry_name, AudioSource, Track, TrackId};
use crate::weight_store;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Construction state for one root build.
pub(crate) struct BuildContext<'a> {
    config: &'a EngineConfig,
    next_id: u32,
    /// Child-index route from the root and the total weight to assign,
    /// in post-order.
    to_balance: Vec<(Vec<usize>, f64)>,
    /// Canonical paths of the folders built so far.
    visited: HashSet<PathBuf>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            next_id: 0,
            to_balance: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Record `dir` as built. False when it resolves to a folder that is
    /// already in the tree, e.g. through a symlink to an ancestor.
    fn enter(&mut self, dir: &Path) -> bool {
        match dir.canonicalize() {
            Ok(canonical) => self.visited.insert(canonical),
            Err(e) => {
                log::warn!("Cannot resolve folder {}: {e}", dir.display());
                true
            }
        }
    }

    fn next_track_id(&mut self) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Give every sub-folder its recorded share: `count * average weight`.
    ///
    /// Deeper folders come first, so an outer folder rescales its inner
    /// folders uniformly and their relative shares survive.
    pub(crate) fn apply_recorded_weights(self, root: &mut Node) {
        for (route, target) in self.to_balance {
            match root.node_at_mut(&route) {
                Some(node) => node.set_aggregate_weight(target),
                None => log::error!("Lost track of folder at {route:?} while balancing"),
            }
        }
    }
}

/// A folder of tracks and sub-folders.
#[derive(Debug)]
pub struct Node {
    name: String,
    path: PathBuf,
    sidecar_path: PathBuf,
    children: Vec<AudioSource>,
    /// Average per-track weight recorded for this folder in its parent's
    /// sidecar file
    average_weight: f64,
    constructed_valid: bool,
    pub(crate) cumulative_weight: f64,
    pub(crate) history: PickHistory,
}

impl Node {
    /// Recursively build the folder at `dir`.
    ///
    /// `average_weight` is what the parent's sidecar recorded for this
    /// folder; `route` is the child-index path from the root.
    pub(crate) fn build(
        dir: &Path,
        average_weight: f64,
        route: &[usize],
        ctx: &mut BuildContext<'_>,
    ) -> Self {
        if route.is_empty() {
            ctx.enter(dir);
        }
        let sidecar_name = ctx.config.sidecar_name.clone();
        let sidecar_path = dir.join(&sidecar_name);
        let recorded = weight_store::load_weights(&sidecar_path);

        let mut children = Vec::new();
        let listed = match list_entries(dir, &sidecar_name) {
            Ok(entries) => Some(entries),
            Err(e) => {
                log::warn!("Failed to list folder {}: {e}", dir.display());
                None
            }
        };

        for entry in listed.iter().flatten() {
            let name = entry_name(entry);
            let weight = recorded.get(&name).copied().unwrap_or(1.0);

            if entry.is_dir() {
                if !ctx.enter(entry) {
                    log::warn!("Skipping {}: folder is already in the library", entry.display());
                    continue;
                }
                let mut child_route = route.to_vec();
                child_route.push(children.len());
                let node = Self::build(entry, weight, &child_route, ctx);
                #[allow(clippy::cast_precision_loss)]
                let target = node.count() as f64 * weight;
                ctx.to_balance.push((child_route, target));
                children.push(AudioSource::Node(node));
            } else {
                let track = Track::new(ctx.next_track_id(), entry.clone(), weight);
                children.push(AudioSource::Track(track));
            }
        }

        let selectable: usize = children.iter().map(selectable_count).sum();
        let constructed_valid = listed.is_some() && selectable >= ctx.config.min_selectable;
        if !constructed_valid {
            log::debug!(
                "Folder {} has {selectable} selectable tracks and will not be picked from",
                dir.display()
            );
        }

        Self {
            name: entry_name(dir),
            path: dir.to_path_buf(),
            sidecar_path,
            children,
            average_weight: weight_store::sanitize_weight(average_weight),
            constructed_valid,
            cumulative_weight: f64::NAN,
            history: PickHistory::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the folder.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<folder>/awed.txt` (or the configured sidecar name).
    #[must_use]
    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    #[must_use]
    pub fn children(&self) -> &[AudioSource] {
        &self.children
    }

    /// Average per-track weight recorded for this folder by its parent.
    #[must_use]
    pub fn average_weight(&self) -> f64 {
        self.average_weight
    }

    /// Valid tracks anywhere below this folder.
    #[must_use]
    pub fn count(&self) -> usize {
        self.children.iter().map(AudioSource::count).sum()
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.children.iter().map(AudioSource::total_weight).sum()
    }

    /// Average weight of the valid tracks below; NaN for an empty folder.
    #[must_use]
    pub fn normalized_weight(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let count = self.count() as f64;
        self.total_weight() / count
    }

    pub fn rescale_weight(&mut self, multiplier: f64) {
        for child in &mut self.children {
            child.rescale_weight(multiplier);
        }
    }

    /// Scale every track below so the folder's total becomes `target`.
    ///
    /// A folder whose current total is zero has nothing to scale and is left
    /// alone.
    pub fn set_aggregate_weight(&mut self, target: f64) {
        let current = self.total_weight();
        if !(current > 0.0 && current.is_finite()) {
            log::debug!("Folder {} has no weight to redistribute", self.name);
            return;
        }
        if !(target.is_finite() && target >= 0.0) {
            log::warn!("Refusing to set weight {target} on folder {}", self.name);
            return;
        }
        self.rescale_weight(target / current);
    }

    /// Valid tracks reachable through selectable sub-folders.
    #[must_use]
    pub fn selectable_tracks(&self) -> usize {
        self.children.iter().map(selectable_count).sum()
    }

    /// True when the folder was built with enough selectable tracks and
    /// still has at least one selectable child.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.constructed_valid && self.children.iter().any(AudioSource::is_selectable)
    }

    /// Rebuild the normalized prefix sums over the children, bottom-up.
    ///
    /// Returns the absolute weight this folder contributes to its parent.
    /// Children that cannot be selected contribute nothing. When nothing
    /// contributes, the whole range collapses onto the last child.
    pub fn recompute_cumulative(&mut self) -> f64 {
        let mut running = 0.0;
        for child in &mut self.children {
            let contribution = child.recompute_cumulative();
            if child.is_selectable() && contribution.is_finite() && contribution > 0.0 {
                running += contribution;
            }
            child.set_cumulative_weight(running);
        }

        let divisor = if running > 0.0 { running } else { 1.0 };
        if let Some((last, rest)) = self.children.split_last_mut() {
            for child in rest {
                let value = child.cumulative_weight() / divisor;
                child.set_cumulative_weight(value);
            }
            last.set_cumulative_weight(1.0);
        }

        running
    }

    /// Cumulative weights of the direct children, in order.
    #[must_use]
    pub fn cumulative_weights(&self) -> Vec<f64> {
        self.children.iter().map(AudioSource::cumulative_weight).collect()
    }

    #[must_use]
    pub fn find_track(&self, id: TrackId) -> Option<&Track> {
        self.children.iter().find_map(|child| match child {
            AudioSource::Track(track) => (track.id() == id).then_some(track),
            AudioSource::Node(node) => node.find_track(id),
        })
    }

    pub(crate) fn find_track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.children.iter_mut().find_map(|child| match child {
            AudioSource::Track(track) => (track.id() == id).then_some(track),
            AudioSource::Node(node) => node.find_track_mut(id),
        })
    }

    /// Look a track up by its absolute path.
    #[must_use]
    pub fn find_track_by_path(&self, path: &Path) -> Option<&Track> {
        let relative = path.strip_prefix(&self.path).ok()?;
        let mut components = relative.components();
        let first = components.next()?.as_os_str().to_string_lossy();
        let child = self.children.iter().find(|child| child.name() == first)?;

        match child {
            AudioSource::Track(track) => components.next().is_none().then_some(track),
            AudioSource::Node(node) => node.find_track_by_path(path),
        }
    }

    /// Visit every track below this folder in child order.
    pub fn tracks(&self) -> Vec<&Track> {
        let mut out = Vec::new();
        self.collect_tracks(&mut out);
        out
    }

    fn collect_tracks<'a>(&'a self, out: &mut Vec<&'a Track>) {
        for child in &self.children {
            match child {
                AudioSource::Track(track) => out.push(track),
                AudioSource::Node(node) => node.collect_tracks(out),
            }
        }
    }

    fn node_at_mut(&mut self, route: &[usize]) -> Option<&mut Node> {
        let Some((first, rest)) = route.split_first() else {
            return Some(self);
        };
        match self.children.get_mut(*first)? {
            AudioSource::Node(node) => node.node_at_mut(rest),
            AudioSource::Track(_) => None,
        }
    }
}

/// Tracks reachable through selectable folders only.
fn selectable_count(source: &AudioSource) -> usize {
    match source {
        AudioSource::Track(track) => usize::from(track.is_valid()),
        AudioSource::Node(node) if node.constructed_valid => node.selectable_tracks(),
        AudioSource::Node(_) => 0,
    }
}

/// Directory entries in name order, without the sidecar file and
/// half-written sidecar replacements.
fn list_entries(dir: &Path, sidecar_name: &str) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == sidecar_name || name.starts_with(".tmp") {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}
