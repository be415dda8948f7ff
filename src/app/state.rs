//! The live library: one tree in use plus the bookkeeping for replacing it.
//!
//! Readers borrow [`LibraryState::tree`]; rescans produce a separate tree that
//! is swapped in whole by [`LibraryState::apply`].

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::fs_runtime::RescanUpdate;
use crate::core::{
    codec,
    fs::{self, BuildOutcome},
    sort::{self, SortOrder},
    sync,
    tree::LibraryTree,
};

/// Where a loaded library came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Snapshot,
    Scan,
}

pub struct LibraryState {
    /// Library root every entry path is composed from.
    pub root: PathBuf,
    pub tree: LibraryTree,
    pub sort_order: SortOrder,
    /// Monotonic id used to ignore stale rescan results.
    pub generation: u64,
}

impl LibraryState {
    pub fn new(root: PathBuf, tree: LibraryTree, sort_order: SortOrder) -> Self {
        Self {
            root,
            tree,
            sort_order,
            generation: 0,
        }
    }

    /// Load the snapshot at `cache`, falling back to a full scan of `root`
    /// when there is no usable snapshot.
    pub fn open(root: &Path, cache: &Path, sort_order: SortOrder) -> anyhow::Result<(Self, LoadSource)> {
        let root_str = root
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("library path {} is not valid UTF-8", root.display()))?;

        let (mut tree, source) = match codec::load(cache, root_str) {
            Ok(tree) => (tree, LoadSource::Snapshot),
            Err(e) => {
                info!("no usable snapshot at {} ({e}), scanning", cache.display());
                let BuildOutcome { tree, entries } = fs::build_tree(root)?;
                info!(entries = entries, "library scanned");
                (tree, LoadSource::Scan)
            }
        };
        sort::sort_tree(&mut tree, sort_order);
        Ok((Self::new(root.to_path_buf(), tree, sort_order), source))
    }

    /// Start a new rescan generation; earlier in-flight results become stale.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Swap in a finished rescan.
    ///
    /// Queue markers are copied from the current tree first, then the current
    /// tree is dropped.  Stale or failed rescans leave the library untouched
    /// and return `None`; otherwise returns the new entry count.
    pub fn apply(&mut self, update: RescanUpdate) -> Option<usize> {
        match update {
            RescanUpdate::TreeRebuilt {
                generation,
                root,
                result,
            } => {
                if generation != self.generation || root != self.root {
                    return None;
                }
                match result {
                    Ok(BuildOutcome { mut tree, entries }) => {
                        let carried = sync::copy_enqueued_flags(&self.tree, &mut tree);
                        info!(entries = entries, carried = carried, "library rescanned");
                        let old = std::mem::replace(&mut self.tree, tree);
                        drop(old);
                        Some(entries)
                    }
                    Err(e) => {
                        warn!("rescan of {} failed: {e:#}", root.display());
                        None
                    }
                }
            }
        }
    }
}
