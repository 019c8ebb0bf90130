//! Weighted track selection.
//!
//! Inverse-CDF sampling over the folder tree without flattening it: a single
//! uniform draw in `[0, 1)` is resolved one level at a time, rescaled into the
//! chosen child's own `[0, 1)` range on every descent.
//!
//! ```text
//! children:     a        b              c
//! cumulative: [0.25]   [0.75]         [1.0]
//! residual 0.5 -> b, rescaled to (0.5 - 0.25) / (0.75 - 0.25) = 0.5
//! ```

use crate::error::{EngineError, Result};
use crate::node::Node;
use crate::source::{Track, TrackId};
use rand::Rng;

/// The two most recent picks made at one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickHistory {
    older: Option<TrackId>,
    newer: Option<TrackId>,
}

impl PickHistory {
    #[must_use]
    pub fn contains(&self, id: TrackId) -> bool {
        self.older == Some(id) || self.newer == Some(id)
    }

    /// Slide the window: the newest pick moves to the older slot.
    pub fn record(&mut self, id: TrackId) {
        self.older = self.newer;
        self.newer = Some(id);
    }

    #[must_use]
    pub fn last(&self) -> Option<TrackId> {
        self.newer
    }
}

impl Node {
    /// Resolve `residual` to a track below this folder.
    ///
    /// The first child whose cumulative weight reaches `residual` is tried
    /// first; unselectable children are skipped in circular order.
    #[must_use]
    pub fn sample(&self, residual: f64) -> Option<&Track> {
        let children = self.children();
        let len = children.len();
        let start = children
            .iter()
            .position(|child| residual <= child.cumulative_weight())
            .unwrap_or(0);

        (0..len)
            .map(|offset| (start + offset) % len)
            .filter(|&index| children[index].is_selectable())
            .find_map(|index| {
                let upper = children[index].cumulative_weight();
                let lower = match index {
                    0 => 0.0,
                    _ => children[index - 1].cumulative_weight(),
                };
                children[index].sample(rescale(residual, lower, upper))
            })
    }

    /// Draw a track, redrawing while it repeats one of the last two picks
    /// made here.
    ///
    /// After `max_retries` redraws the last draw is accepted, so a folder
    /// whose playable tracks dwindled below three at runtime still plays.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoSelectableTrack`] when no track can be reached.
    pub fn pick_track<R: Rng>(&mut self, rng: &mut R, max_retries: usize) -> Result<TrackId> {
        let mut retries = 0;
        let picked = loop {
            let residual: f64 = rng.gen();
            let id = self
                .sample(residual)
                .map(Track::id)
                .ok_or(EngineError::NoSelectableTrack)?;

            if !self.history.contains(id) {
                break id;
            }
            if retries >= max_retries {
                log::warn!(
                    "Accepting repeated pick {id} in {} after {retries} redraws",
                    self.name()
                );
                break id;
            }
            retries += 1;
        };

        log::trace!("Picked {picked} in {} after {retries} redraws", self.name());
        self.history.record(picked);
        Ok(picked)
    }
}

/// Map `residual` from `[lower, upper]` into the child's local `[0, 1]`.
fn rescale(residual: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    if width > 0.0 {
        let local = (residual - lower) / width;
        if local.is_nan() {
            0.0
        } else {
            local.clamp(0.0, 1.0)
        }
    } else {
        0.0
    }
}
