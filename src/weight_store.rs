//! # Sidecar Weight Files
//!
//! Every folder keeps its children's weights in a plain text file next to the
//! music (`awed.txt` by default), one entry per line:
//!
//! ```text
//! 1.25 Some Album
//! 0.8 Another Album
//!
//! 2.0 favourite song.flac
//! 1.0 other song.mp3
//! ```
//!
//! The weight comes first, then a single space, then the entry name verbatim
//! (names may contain spaces). Folders store their average per-track weight,
//! files their absolute weight. Folders come first, heaviest first, then a
//! blank line, then files, heaviest first.
//!
//! Entries are matched by name only, so renaming or adding siblings never
//! invalidates the file. Unknown names are ignored on load and disappear on
//! the next save.
//!
//! Persistence never stops playback: every I/O failure is logged and the
//! caller carries on with defaults.

use crate::error::PersistenceError;
use crate::node::Node;
use crate::source::AudioSource;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Weight given to anything the sidecar does not describe sensibly.
pub const NEUTRAL_WEIGHT: f64 = 1.0;

/// Replace NaN, infinite and negative weights with [`NEUTRAL_WEIGHT`].
#[must_use]
pub fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight >= 0.0 {
        weight
    } else {
        NEUTRAL_WEIGHT
    }
}

/// Split one sidecar line into `(name, weight)`.
///
/// Lines without a space are skipped. An unparsable weight becomes
/// [`NEUTRAL_WEIGHT`].
#[must_use]
pub fn parse_line(line: &str) -> Option<(&str, f64)> {
    let (weight, name) = line.split_once(' ')?;
    let weight = weight.parse::<f64>().map_or(NEUTRAL_WEIGHT, sanitize_weight);
    Some((name, weight))
}

/// Parse a whole sidecar file. Later duplicates win.
#[must_use]
pub fn parse_weights(contents: &str) -> HashMap<String, f64> {
    contents
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .map(|(name, weight)| (name.to_string(), weight))
        .collect()
}

/// Load the weights recorded in `sidecar`.
///
/// A missing file is created empty so the folder's entries get written out
/// on the next save.
pub fn load_weights(sidecar: &Path) -> HashMap<String, f64> {
    match read_sidecar(sidecar) {
        Ok(Some(contents)) => parse_weights(&contents),
        Ok(None) => {
            if let Err(e) = File::create(sidecar) {
                log::warn!("{}", PersistenceError::new(sidecar, e));
            }
            HashMap::new()
        }
        Err(e) => {
            log::warn!("{e}");
            HashMap::new()
        }
    }
}

/// Read the average weight recorded for `dir` in its parent folder's
/// sidecar file. The parent's file is never created.
pub fn read_own_weight(dir: &Path, sidecar_name: &str) -> Option<f64> {
    let parent = dir.parent()?;
    let own_name = dir.file_name()?.to_string_lossy();
    let sidecar = parent.join(sidecar_name);

    match read_sidecar(&sidecar) {
        Ok(contents) => contents?
            .lines()
            .filter_map(parse_line)
            .filter(|(name, _)| *name == own_name)
            .map(|(_, weight)| weight)
            .last(),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}

fn read_sidecar(path: &Path) -> Result<Option<String>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersistenceError::new(path, e)),
    }
}

/// Format a weight as a plain decimal that parses back to the same value.
///
/// Whole numbers keep one decimal place (`1.0`), everything else uses the
/// shortest exact representation. Invalid tracks write `NaN`, which loads
/// back as neutral.
#[must_use]
pub fn format_weight(weight: f64) -> String {
    if weight.is_finite() && weight.fract() == 0.0 {
        format!("{weight:.1}")
    } else {
        format!("{weight}")
    }
}

#[must_use]
pub fn format_line(weight: f64, name: &str) -> String {
    format!("{} {name}", format_weight(weight))
}

/// Render the sidecar contents for `node`'s direct children.
#[must_use]
pub fn render_sidecar(node: &Node) -> String {
    let mut entries: Vec<&AudioSource> = node.children().iter().collect();
    entries.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| sort_weight(b).total_cmp(&sort_weight(a)))
    });

    let mut out = String::new();
    let mut previous_was_folder = false;
    for entry in entries {
        if previous_was_folder && !entry.is_folder() {
            out.push('\n');
        }
        previous_was_folder = entry.is_folder();
        out.push_str(&entry.serialized_weight_line());
        out.push('\n');
    }
    out
}

fn sort_weight(source: &AudioSource) -> f64 {
    let weight = source.normalized_weight();
    if weight.is_nan() {
        f64::NEG_INFINITY
    } else {
        weight
    }
}

/// Replace `path` with `contents` in one step, so a crash never leaves a
/// half-written sidecar behind.
pub fn write_sidecar(path: &Path, contents: &str) -> Result<(), PersistenceError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(|e| PersistenceError::new(path, e))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| PersistenceError::new(path, e))?;
    file.persist(path)
        .map_err(|e| PersistenceError::new(path, e.error))?;
    Ok(())
}

/// Save `node` and every folder below it. Returns how many files could not
/// be written; each failure has already been logged.
pub fn save_tree(node: &Node) -> usize {
    let mut failures = 0;
    for child in node.children() {
        if let AudioSource::Node(folder) = child {
            failures += save_tree(folder);
        }
    }

    match write_sidecar(node.sidecar_path(), &render_sidecar(node)) {
        Ok(()) => log::trace!("Saved {}", node.sidecar_path().display()),
        Err(e) => {
            log::warn!("{e}");
            failures += 1;
        }
    }
    failures
}
