//! # Awed Performance Benchmarks
//!
//! - **Tree Build**: Opening a library, including reading and writing weight files
//! - **Rebalance**: Renormalizing and saving after feedback
//! - **Picking**: Weighted descent with the no-repeat rule
//! - **Weight Files**: Parsing and rendering sidecar contents
//!
//! ```bash
//! cargo bench
//! cargo bench picking
//! ```

use awed::config::EngineConfig;
use awed::playlist::Playlist;
use awed::weight_store;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::hint::black_box;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper creating `albums` folders of `tracks` files each
fn create_benchmark_library(albums: usize, tracks: usize) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path().join("Music");
    for album in 0..albums {
        let dir = root.join(format!("Artist {} - Album {album:03}", album % 17));
        fs::create_dir_all(&dir).expect("Failed to create album");
        for track in 0..tracks {
            fs::write(dir.join(format!("{track:02} Track {track}.flac")), b"audio")
                .expect("Failed to create track");
        }
    }
    (temp_dir, root)
}

fn benchmark_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");
    group.sample_size(20);

    for albums in [10, 50, 200] {
        let (_temp_dir, root) = create_benchmark_library(albums, 12);
        Playlist::open(&root, EngineConfig::default()).expect("valid library");

        group.bench_with_input(BenchmarkId::new("open_library", albums), &root, |b, root| {
            b.iter(|| Playlist::open(black_box(root), EngineConfig::default()))
        });
    }

    // No weight files yet: every folder gets its sidecar created.
    group.bench_function("first_open", |b| {
        b.iter_batched(
            || create_benchmark_library(10, 12),
            |(temp_dir, root)| {
                let playlist = Playlist::open(&root, EngineConfig::default());
                (temp_dir, playlist)
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn benchmark_rebalance(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance");
    group.sample_size(20);

    let (_temp_dir, root) = create_benchmark_library(50, 12);
    let mut playlist = Playlist::open(&root, EngineConfig::default()).expect("valid library");
    let ids: Vec<_> = playlist.root().tracks().iter().map(|t| t.id()).collect();
    let mut next = 0;

    group.bench_function("favorite_then_rebalance", |b| {
        b.iter(|| {
            let id = ids[next % ids.len()];
            next += 1;
            playlist.favorite(black_box(id)).expect("known track");
            playlist.rebalance();
        })
    });

    group.finish();
}

fn benchmark_picking(c: &mut Criterion) {
    let mut group = c.benchmark_group("picking");

    for albums in [10, 200] {
        let (_temp_dir, root) = create_benchmark_library(albums, 12);
        let mut playlist = Playlist::open(&root, EngineConfig::default()).expect("valid library");
        let mut rng = StdRng::seed_from_u64(7);

        group.bench_function(BenchmarkId::new("pick_track", albums), |b| {
            b.iter(|| playlist.pick_track_with(&mut rng).expect("selectable"))
        });
        group.bench_function(BenchmarkId::new("sample_at", albums), |b| {
            b.iter(|| playlist.sample_at(black_box(0.618_033)))
        });
    }

    group.finish();
}

fn benchmark_weight_files(c: &mut Criterion) {
    let mut group = c.benchmark_group("weight_files");

    let contents: String = (0..500)
        .map(|i| format!("{} Some Artist - Track {i}.flac\n", 0.5 + f64::from(i) / 250.0))
        .collect();
    group.bench_function("parse_500_lines", |b| {
        b.iter(|| weight_store::parse_weights(black_box(&contents)))
    });

    let (_temp_dir, root) = create_benchmark_library(1, 300);
    let playlist = Playlist::open(&root, EngineConfig::default()).expect("valid library");
    let album = playlist.root().children().first().expect("one album");
    if let awed::source::AudioSource::Node(node) = album {
        group.bench_function("render_300_tracks", |b| {
            b.iter(|| weight_store::render_sidecar(black_box(node)))
        });
    }

    group.bench_function("save_tree", |b| b.iter(|| weight_store::save_tree(playlist.root())));

    group.finish();
}

criterion_group!(
    benches,
    benchmark_tree_build,
    benchmark_rebalance,
    benchmark_picking,
    benchmark_weight_files
);
criterion_main!(benches);
