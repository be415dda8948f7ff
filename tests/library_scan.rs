//! End-to-end tests against real directory trees in a temp dir: walk, prune,
//! sort, search, snapshot round-trip and flag carry-over.

use std::fs;
use std::path::Path;

use tunetree::core::{
    codec,
    fs::{build_tree, MAX_TREE_DEPTH},
    search::{self, FILE_PENALTY},
    sort::{self, natural_compare, SortOrder},
    sync,
    tree::LibraryTree,
};

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"not really audio").unwrap();
}

fn child_names(tree: &LibraryTree, parent: usize) -> Vec<String> {
    tree.children(parent).map(|h| tree.get(h).name.clone()).collect()
}

fn snapshot_rows(tree: &LibraryTree) -> Vec<(u32, String, bool, Option<u32>, Option<String>)> {
    tree.preorder()
        .map(|h| {
            let e = tree.get(h);
            (e.id, e.name.clone(), e.is_dir, e.parent_id, e.full_path.clone())
        })
        .collect()
}

/// `/Music/_Favorites/song1.mp3` and `/Music/Beatles/Abbey Road/01 Come Together.flac`.
fn sample_library() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let music = dir.path().join("Music");
    touch(&music.join("_Favorites").join("song1.mp3"));
    touch(&music.join("Beatles").join("Abbey Road").join("01 Come Together.flac"));
    dir
}

#[test]
fn scan_sort_and_search_sample_library() {
    let dir = sample_library();
    let music = dir.path().join("Music");
    let outcome = build_tree(&music).unwrap();
    let mut tree = outcome.tree;
    assert_eq!(outcome.entries, 5);

    sort::sort_tree(&mut tree, SortOrder::Library);
    assert_eq!(child_names(&tree, tree.root()), ["_Favorites", "Beatles"]);

    let hits = search::ranked(&tree, "abbey", 10, 10);
    let best = hits.first().expect("abbey should match");
    let entry = tree.get(best.handle);
    assert_eq!(entry.name, "Abbey Road");
    assert!(entry.is_dir);
    assert_eq!(best.distance, "Abbey Road".len() - "abbey".len());
    for hit in &hits[1..] {
        assert!(hit.distance >= best.distance);
    }
}

#[test]
fn walk_skips_hidden_and_non_audio_entries() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("Album").join("1.flac"));
    touch(&root.join("Album").join("cover.jpg"));
    touch(&root.join("Album").join(".hidden.mp3"));
    touch(&root.join(".git").join("x.mp3"));
    touch(&root.join("loose.OGG"));

    let outcome = build_tree(root).unwrap();
    let tree = &outcome.tree;
    assert_eq!(child_names(tree, tree.root()), ["Album", "loose.OGG"]);
    let album = tree.find_by_name_path("Album").unwrap();
    assert_eq!(child_names(tree, album), ["1.flac"]);
    assert_eq!(outcome.entries, 3);
}

#[test]
fn directories_without_audio_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("Album").join("1.mp3"));
    touch(&root.join("Scans").join("booklet.pdf"));

    let outcome = build_tree(root).unwrap();
    // Album and 1.mp3 survive; Scans was counted during the walk, then pruned.
    assert_eq!(outcome.entries, 2);
    assert_eq!(child_names(&outcome.tree, outcome.tree.root()), ["Album"]);
}

#[test]
fn siblings_come_out_in_ascending_order_before_sorting() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["c.mp3", "a.mp3", "b.mp3"] {
        touch(&dir.path().join(name));
    }
    let outcome = build_tree(dir.path()).unwrap();
    assert_eq!(child_names(&outcome.tree, outcome.tree.root()), ["a.mp3", "b.mp3", "c.mp3"]);
}

#[cfg(unix)]
#[test]
fn names_that_fail_path_composition_are_not_linked() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("x\\y.mp3"));
    touch(&root.join("ok.mp3"));

    let outcome = build_tree(root).unwrap();
    let tree = &outcome.tree;
    assert_eq!(child_names(tree, tree.root()), ["ok.mp3"]);
    assert_eq!(outcome.entries, 1);
    assert!(tree.preorder().skip(1).all(|h| tree.get(h).full_path.is_some()));
}

#[cfg(unix)]
#[test]
fn symlink_cycles_are_scanned_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("A").join("song.mp3"));
    std::os::unix::fs::symlink(root, root.join("A").join("loop")).unwrap();

    let outcome = build_tree(root).unwrap();
    let tree = &outcome.tree;
    let album = tree.find_by_name_path("A").unwrap();
    // `loop` points back at the root, which was already scanned, so it stays
    // empty and is pruned.
    assert_eq!(child_names(tree, album), ["song.mp3"]);
    assert_eq!(outcome.entries, 2);
}

#[test]
fn walk_stops_descending_at_depth_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("d").join("shallow.mp3"));
    let mut deep = root.to_path_buf();
    for _ in 0..MAX_TREE_DEPTH + 4 {
        deep.push("d");
    }
    touch(&deep.join("deep.mp3"));

    let outcome = build_tree(root).unwrap();
    let tree = &outcome.tree;
    let songs: Vec<String> = tree
        .audio_files(tree.root())
        .map(|h| tree.get(h).name.clone())
        .collect();
    assert_eq!(songs, ["shallow.mp3"]);
    // Everything below `d` held only the unreachable track and was pruned.
    let top = tree.find_by_name_path("d").unwrap();
    assert_eq!(child_names(tree, top), ["shallow.mp3"]);
    assert_eq!(outcome.entries, 2);
}

#[test]
fn missing_root_yields_empty_tree() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = build_tree(&dir.path().join("nope")).unwrap();
    assert_eq!(outcome.entries, 0);
    assert_eq!(outcome.tree.preorder().count(), 1);
}

#[test]
fn snapshot_round_trip_matches_scan() {
    let dir = sample_library();
    let music = dir.path().join("Music");
    let tree = build_tree(&music).unwrap().tree;

    let cache = dir.path().join("cache").join("library.tsv");
    codec::store(&tree, &cache).unwrap();
    let loaded = codec::load(&cache, music.to_str().unwrap()).unwrap();

    assert_eq!(snapshot_rows(&loaded), snapshot_rows(&tree));
    let songs: Vec<_> = loaded
        .audio_files(loaded.root())
        .filter_map(|h| loaded.get(h).full_path.clone())
        .collect();
    assert_eq!(songs.len(), 2);
    assert!(songs.iter().all(|p| Path::new(p).is_file()));
}

#[test]
fn unreadable_snapshot_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(codec::load(&dir.path().join("missing.tsv"), "/music").is_err());
}

#[test]
fn rescan_keeps_queue_markers() {
    let dir = sample_library();
    let music = dir.path().join("Music");
    let mut old = build_tree(&music).unwrap().tree;
    let song = old
        .audio_files(old.root())
        .find(|&h| old.get(h).name == "song1.mp3")
        .unwrap();
    old.set_enqueued(song, true);

    touch(&music.join("Beatles").join("Help!").join("01 Help!.mp3"));
    let mut new = build_tree(&music).unwrap().tree;
    assert_eq!(sync::copy_enqueued_flags(&old, &mut new), 1);

    let path = old.get(song).full_path.clone().unwrap();
    let moved = sync::find_by_path(&new, &path).unwrap();
    assert!(new.is_enqueued(moved));
    assert_eq!(new.preorder().filter(|&h| new.is_enqueued(h)).count(), 1);
}

#[test]
fn ranking_properties() {
    assert!(natural_compare("track2", "track10").is_lt());
    assert!(search::distance("cure", "The Cure", true) < search::distance("cure", "xyzzyabc", true));
    assert_eq!(search::distance("Help!", "help!", false), FILE_PENALTY);
}
