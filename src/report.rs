//! Human readable view of a weighted tree.

use crate::node::Node;
use crate::source::AudioSource;
use crate::weight_store::format_weight;
use std::fmt::Write;

/// One line per folder and track, indented by depth.
///
/// `share` is the fraction of the parent's selection range the entry owns
/// right now; unselectable entries own nothing.
#[must_use]
pub fn render_tree(root: &Node) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}/  {} tracks, total weight {:.3}",
        root.name(),
        root.count(),
        root.total_weight()
    );
    render_children(root, 1, &mut out);
    out
}

fn render_children(node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let mut lower = 0.0;
    for child in node.children() {
        let upper = child.cumulative_weight();
        let share = if child.is_selectable() && upper.is_finite() {
            (upper - lower).max(0.0)
        } else {
            0.0
        };
        if upper.is_finite() {
            lower = upper;
        }

        match child {
            AudioSource::Node(folder) => {
                let _ = writeln!(
                    out,
                    "{indent}{}/  avg {}  share {:.1}%{}",
                    folder.name(),
                    format_weight(folder.normalized_weight()),
                    share * 100.0,
                    if folder.is_selectable() { "" } else { "  (not selectable)" }
                );
                render_children(folder, depth + 1, out);
            }
            AudioSource::Track(track) => {
                let _ = writeln!(
                    out,
                    "{indent}{}  weight {}  share {:.1}%{}",
                    track.name(),
                    format_weight(track.weight()),
                    share * 100.0,
                    if track.is_valid() { "" } else { "  (invalid)" }
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::playlist::Playlist;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_render_shows_weights_and_shares() {
        let dir = TempDir::new().unwrap();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();
        for name in ["a.mp3", "b.mp3", "c.mp3", "d.mp3"] {
            fs::write(music.join(name), b"audio").unwrap();
        }
        let mut playlist = Playlist::open(&music, EngineConfig::default()).unwrap();
        let a = playlist.find_track_by_path(&music.join("a.mp3")).unwrap();
        playlist.favorite(a).unwrap();
        playlist.rebalance();

        let text = render_tree(playlist.root());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "music/  4 tracks, total weight 4.000");
        assert_eq!(lines[1], "  a.mp3  weight 1.6  share 40.0%");
        assert_eq!(lines[2], "  b.mp3  weight 0.8  share 20.0%");
    }

    #[test]
    fn test_render_marks_small_folders() {
        let dir = TempDir::new().unwrap();
        for name in ["a.mp3", "b.mp3", "c.mp3"] {
            fs::write(dir.path().join(name), b"audio").unwrap();
        }
        let tiny = dir.path().join("tiny");
        fs::create_dir(&tiny).unwrap();
        fs::write(tiny.join("x.mp3"), b"audio").unwrap();

        let playlist = Playlist::open(dir.path(), EngineConfig::default()).unwrap();
        let text = render_tree(playlist.root());
        assert!(text.contains("  tiny/  avg 1.0  share 0.0%  (not selectable)"), "{text}");
        assert!(text.contains("    x.mp3  weight 1.0"), "{text}");
    }
}
