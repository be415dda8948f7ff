//! Filesystem traversal. Walks the library and populates a [`LibraryTree`].
//!
//! Directories are listed one level at a time with the [`ignore`] crate
//! (hidden entries filtered, no ignore-file handling) and the walk itself runs
//! off an explicit worklist, so deeply nested libraries never grow the call
//! stack.  Only audio files survive the filter; directories are always kept
//! during the walk and the ones left empty are pruned afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use ignore::WalkBuilder;
use tracing::{debug, warn};

use super::tree::{LibraryTree, NodeHandle};

/// Deepest directory level the walk and the prune pass will descend to.
pub const MAX_TREE_DEPTH: usize = 1024;

/// File extensions treated as audio, compared case-insensitively.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "m4a", "aac", "ogg", "oga", "opus", "wav", "wv", "webm", "mp4", "m4b",
    "alac", "aiff", "aif", "ape", "wma", "mka",
];

/// Result of a full library walk.
#[derive(Debug)]
pub struct BuildOutcome {
    pub tree: LibraryTree,
    /// Entries kept below the root, after pruning.
    pub entries: usize,
}

/// Does `name` carry one of the [`AUDIO_EXTENSIONS`]?
pub fn is_audio_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => AUDIO_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// Build a fresh [`LibraryTree`] rooted at `root`.
///
/// Unreadable directories and entries that cannot be stat'ed contribute
/// nothing; the walk carries on with the rest of the library.  The only error
/// is a root path that is not valid UTF-8, since no entry path could be
/// composed from it.
pub fn build_tree(root: &Path) -> anyhow::Result<BuildOutcome> {
    let root_str = root
        .to_str()
        .ok_or_else(|| anyhow!("library path {} is not valid UTF-8", root.display()))?;
    let mut tree = LibraryTree::with_root(root_str);
    let mut entries = 0usize;

    if !root.is_dir() {
        warn!("library root {} is not a readable directory", root.display());
        return Ok(BuildOutcome { tree, entries });
    }

    let mut scanned: HashSet<PathBuf> = HashSet::new();
    let mut pending: Vec<(NodeHandle, PathBuf, usize)> = vec![(tree.root(), root.to_path_buf(), 0)];

    'walk: while let Some((dir_handle, dir_path, depth)) = pending.pop() {
        if depth >= MAX_TREE_DEPTH {
            warn!("not descending below depth {depth}: {}", dir_path.display());
            continue;
        }
        // Symlinked directories are followed, but never scanned twice.
        if let Ok(canonical) = std::fs::canonicalize(&dir_path) {
            if !scanned.insert(canonical) {
                debug!("already scanned {}, skipping", dir_path.display());
                continue;
            }
        }

        // Head insertion reverses order, so feed the sorted listing backwards.
        for (name, is_dir) in list_dir(&dir_path).into_iter().rev() {
            let Some(handle) = tree.create_entry(&name, is_dir, dir_handle) else {
                warn!("entry ids exhausted, stopping scan of {}", root.display());
                break 'walk;
            };
            let Some(path) = tree.get(handle).full_path.clone() else {
                tree.discard(handle);
                continue;
            };
            tree.add_child(dir_handle, handle);
            entries += 1;
            if is_dir {
                pending.push((handle, PathBuf::from(path), depth + 1));
            }
        }
    }

    let pruned = remove_empty_directories(&mut tree);
    entries = entries.saturating_sub(pruned);
    debug!(entries = entries, pruned = pruned, "library walk finished");

    Ok(BuildOutcome { tree, entries })
}

/// Immediate children of `dir` worth indexing, sorted by file name:
/// `(name, is_dir)` for every directory and every audio file.
fn list_dir(dir: &Path) -> Vec<(String, bool)> {
    let walker = WalkBuilder::new(dir)
        .max_depth(Some(1)) // only immediate children
        .standard_filters(false)
        .hidden(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut out = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cannot list {}: {e}", dir.display());
                continue;
            }
        };
        // The walker yields the directory itself first.
        if entry.depth() == 0 {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            debug!("skipping non-UTF-8 name in {}", dir.display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        // Follows symlinks, like stat(2).
        let meta = match std::fs::metadata(entry.path()) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("cannot stat {}: {e}", entry.path().display());
                continue;
            }
        };
        if meta.is_dir() {
            out.push((name.to_string(), true));
        } else if is_audio_file(name) {
            out.push((name.to_string(), false));
        }
    }
    out
}

/// Remove every directory left without children, bottom-up, and return how
/// many were removed.  A directory emptied by this pass is removed too.
///
/// Subtrees below [`MAX_TREE_DEPTH`] are left untouched.
pub fn remove_empty_directories(tree: &mut LibraryTree) -> usize {
    let mut removed = 0usize;
    let mut truncated = false;
    // (handle, depth, children already visited)
    let mut stack: Vec<(NodeHandle, usize, bool)> = vec![(tree.root(), 0, false)];

    while let Some((handle, depth, visited)) = stack.pop() {
        if !visited {
            if depth >= MAX_TREE_DEPTH {
                truncated = true;
                continue;
            }
            stack.push((handle, depth, true));
            for child in tree.children(handle) {
                if tree.get(child).is_dir {
                    stack.push((child, depth + 1, false));
                }
            }
            continue;
        }

        let children: Vec<NodeHandle> = tree.children(handle).collect();
        let kept: Vec<NodeHandle> = children
            .iter()
            .copied()
            .filter(|&c| {
                let e = tree.get(c);
                !e.is_dir || e.has_children()
            })
            .collect();
        if kept.len() != children.len() {
            removed += children.len() - kept.len();
            tree.relink_children(handle, &kept);
        }
    }

    if truncated {
        warn!("pruning stopped at depth {MAX_TREE_DEPTH}; deeper empty directories kept");
    }
    removed
}
