//! Carry play-queue markers from an old tree to its rebuilt replacement.
//!
//! The two trees share no nodes; entries are matched by `full_path`.

use super::tree::{LibraryTree, NodeHandle};

/// First entry in pre-order whose `full_path` equals `full_path`.
pub fn find_by_path(tree: &LibraryTree, full_path: &str) -> Option<NodeHandle> {
    tree.preorder()
        .find(|&h| tree.get(h).full_path.as_deref() == Some(full_path))
}

/// Set `enqueued` on every entry of `new` whose counterpart in `old` has it.
/// Returns how many flags were carried over.
pub fn copy_enqueued_flags(old: &LibraryTree, new: &mut LibraryTree) -> usize {
    let mut copied = 0;
    for handle in old.preorder() {
        let entry = old.get(handle);
        if !entry.enqueued {
            continue;
        }
        let Some(path) = entry.full_path.as_deref() else {
            continue;
        };
        if let Some(target) = find_by_path(new, path) {
            new.set_enqueued(target, true);
            copied += 1;
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::ChildAppender;

    fn tree_with(songs: &[&str]) -> LibraryTree {
        let mut tree = LibraryTree::with_root("/music");
        let root = tree.root();
        let mut appender = ChildAppender::new();
        let album = tree.create_entry("Album", true, root).unwrap();
        appender.append(&mut tree, root, album);
        for song in songs {
            let h = tree.create_entry(song, false, album).unwrap();
            appender.append(&mut tree, album, h);
        }
        tree
    }

    #[test]
    fn finds_entries_by_full_path() {
        let tree = tree_with(&["a.mp3"]);
        let hit = find_by_path(&tree, "/music/Album/a.mp3").unwrap();
        assert_eq!(tree.get(hit).name, "a.mp3");
        assert_eq!(find_by_path(&tree, "/music"), Some(tree.root()));
        assert!(find_by_path(&tree, "/music/Album/zzz.mp3").is_none());
    }

    #[test]
    fn copies_flags_to_surviving_entries() {
        let mut old = tree_with(&["a.mp3", "b.mp3", "gone.mp3"]);
        for name in ["a.mp3", "gone.mp3"] {
            let h = find_by_path(&old, &format!("/music/Album/{name}")).unwrap();
            old.set_enqueued(h, true);
        }
        // Rebuilt tree: different ids and order, one song removed, one added.
        let mut new = tree_with(&["new.mp3", "b.mp3", "a.mp3"]);

        assert_eq!(copy_enqueued_flags(&old, &mut new), 1);
        let enqueued: Vec<_> = new
            .preorder()
            .filter(|&h| new.is_enqueued(h))
            .map(|h| new.get(h).name.clone())
            .collect();
        assert_eq!(enqueued, ["a.mp3"]);
        // The old tree is left as it was.
        assert_eq!(old.preorder().filter(|&h| old.is_enqueued(h)).count(), 2);
    }
}
