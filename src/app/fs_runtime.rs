//! Background library rescans so the tree in use stays readable meanwhile.
//!
//! A rescan builds and sorts a brand-new tree on a worker thread; nothing of
//! it is visible until [`LibraryState::apply`](super::state::LibraryState::apply)
//! swaps it in.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::{
    fs::{self, BuildOutcome},
    sort::{self, SortOrder},
};

pub enum RescanUpdate {
    TreeRebuilt {
        generation: u64,
        root: PathBuf,
        result: anyhow::Result<BuildOutcome>,
    },
}

pub fn spawn_rescan(
    tx: mpsc::UnboundedSender<RescanUpdate>,
    generation: u64,
    root: PathBuf,
    sort_order: SortOrder,
) {
    std::thread::spawn(move || {
        let t0 = std::time::Instant::now();
        let result = fs::build_tree(&root).map(|mut outcome| {
            sort::sort_tree(&mut outcome.tree, sort_order);
            outcome
        });
        debug!("rescan: {:.2?} root={}", t0.elapsed(), root.display());
        let _ = tx.send(RescanUpdate::TreeRebuilt {
            generation,
            root,
            result,
        });
    });
}
