//! In-memory tree data-structure that mirrors the music library layout.
//!
//! Every [`Entry`] lives in a flat arena (the [`LibraryTree`] struct) and links
//! to its relatives by [`NodeHandle`]: a parent back-reference, its first
//! child and its next sibling.  That first-child/next-sibling shape encodes an
//! arbitrary-arity tree without recursive `Box` ownership, so dropping a tree
//! of any depth is a single `Vec` deallocation.
//!
//! Entry ids ([`EntryId`]) are a separate concept from handles: they are the
//! stable integers written to the snapshot file, unique within one tree
//! (one *epoch*) and handed out by the tree's own [`IdCounter`].

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use super::path::{compose_path, is_valid_name};

// ───────────────────────────────────────── ids ───────────────

/// Index into [`LibraryTree::nodes`].
pub type NodeHandle = usize;

/// Persistent entry identifier.
pub type EntryId = u32;

/// Monotonic id source for one tree epoch.  Ids start at 1.
#[derive(Debug, Clone)]
pub struct IdCounter {
    next: EntryId,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdCounter {
    /// Resume counting at `next`, e.g. after decoding a snapshot.
    pub fn starting_at(next: EntryId) -> Self {
        Self { next }
    }

    /// Hand out the next id, or `None` once the id space is exhausted.
    pub fn allocate(&mut self) -> Option<EntryId> {
        if self.next == EntryId::MAX {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(id)
    }
}

// ───────────────────────────────────────── entry ─────────────

/// One file or directory in the library.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    /// Last path component only.
    pub name: String,
    /// Absolute path; `None` when composition was rejected, in which case the
    /// entry must not be used to touch the filesystem.
    pub full_path: Option<String>,
    pub is_dir: bool,
    /// Transient UI marker: the entry is in the play queue.
    pub enqueued: bool,
    /// Id of the owning directory; `None` for the root.
    pub parent_id: Option<EntryId>,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) first_child: Option<NodeHandle>,
    pub(crate) next_sibling: Option<NodeHandle>,
}

impl Entry {
    fn new(id: EntryId, name: String, is_dir: bool) -> Self {
        Self {
            id,
            name,
            full_path: None,
            is_dir,
            enqueued: false,
            parent_id: None,
            parent: None,
            first_child: None,
            next_sibling: None,
        }
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    /// `full_path` as a [`Path`], if it was resolvable.
    pub fn path(&self) -> Option<&Path> {
        self.full_path.as_deref().map(Path::new)
    }
}

// ───────────────────────────────────────── arena tree ────────

/// Arena-backed library tree.
///
/// Entries removed by pruning stay in the arena but are unreachable from
/// [`LibraryTree::root`]; every traversal starts at the root, so they are
/// never observed.
#[derive(Debug, Clone)]
pub struct LibraryTree {
    nodes: Vec<Entry>,
    root: NodeHandle,
    ids: IdCounter,
}

impl LibraryTree {
    /// Start a fresh epoch: a tree holding only the synthetic root directory,
    /// whose `full_path` is `root_path` verbatim.
    pub fn with_root(root_path: &str) -> Self {
        let mut ids = IdCounter::default();
        // The first allocation of a fresh counter cannot fail.
        let id = ids.allocate().unwrap_or(1);
        let mut tree = Self::detached(ids);
        let root = tree.push_entry(id, String::new(), true);
        tree.set_root(root, root_path);
        tree
    }

    /// An arena with no nodes yet; [`set_root`](Self::set_root) must be called
    /// before the tree is handed out.
    pub(crate) fn detached(ids: IdCounter) -> Self {
        Self {
            nodes: Vec::new(),
            root: 0,
            ids,
        }
    }

    pub(crate) fn set_root(&mut self, handle: NodeHandle, root_path: &str) {
        let node = &mut self.nodes[handle];
        node.parent = None;
        node.parent_id = None;
        node.next_sibling = None;
        node.full_path = Some(root_path.to_string());
        self.root = handle;
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn get(&self, handle: NodeHandle) -> &Entry {
        &self.nodes[handle]
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> &mut Entry {
        &mut self.nodes[handle]
    }

    /// Library root path as supplied when the tree was created or loaded.
    pub fn root_path(&self) -> &str {
        self.nodes[self.root].full_path.as_deref().unwrap_or_default()
    }

    /// Number of entries reachable from the root, root excluded.
    pub fn entry_count(&self) -> usize {
        self.preorder().count().saturating_sub(1)
    }

    // ── construction ────────────────────────────────────────────

    /// Allocate a new entry below `parent` with a fresh id.
    ///
    /// The entry is *not* linked into `parent`'s children yet; use
    /// [`add_child`](Self::add_child).  Its `full_path` is `None` if the name
    /// is invalid or composition was rejected (both are logged).  Returns
    /// `None` only when the id space is exhausted.
    pub fn create_entry(&mut self, name: &str, is_dir: bool, parent: NodeHandle) -> Option<NodeHandle> {
        let Some(id) = self.ids.allocate() else {
            warn!(entry = %name, "entry id space exhausted");
            return None;
        };
        let mut entry = Entry::new(id, name.to_string(), is_dir);
        entry.parent = Some(parent);
        entry.parent_id = Some(self.nodes[parent].id);
        entry.full_path = self.child_path(parent, name);

        let handle = self.nodes.len();
        self.nodes.push(entry);
        Some(handle)
    }

    /// Push an entry with a caller-chosen id (snapshot decoding).
    pub(crate) fn push_entry(&mut self, id: EntryId, name: String, is_dir: bool) -> NodeHandle {
        let handle = self.nodes.len();
        self.nodes.push(Entry::new(id, name, is_dir));
        handle
    }

    /// Compose the full path for `name` under `parent`.
    pub(crate) fn child_path(&self, parent: NodeHandle, name: &str) -> Option<String> {
        if !is_valid_name(name) {
            warn!(entry = %name, "rejected invalid entry name");
            return None;
        }
        let parent_path = self.nodes[parent].full_path.as_deref()?;
        match compose_path(parent_path, name) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("rejected entry path: {e}");
                None
            }
        }
    }

    /// Drop the most recently created, still unlinked entry.
    pub fn discard(&mut self, handle: NodeHandle) {
        debug_assert_eq!(handle + 1, self.nodes.len(), "only the newest entry can be discarded");
        if handle + 1 == self.nodes.len() && handle != self.root {
            self.nodes.pop();
        }
    }

    /// Link `child` at the head of `parent`'s sibling chain.  O(1).
    pub fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        let parent_id = self.nodes[parent].id;
        let old_head = self.nodes[parent].first_child.replace(child);
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.parent_id = Some(parent_id);
        node.next_sibling = old_head;
    }

    /// Remove `handle` (and with it its whole subtree) from its parent's
    /// sibling chain.  The root cannot be unlinked.
    pub fn unlink(&mut self, handle: NodeHandle) {
        let Some(parent) = self.nodes[handle].parent else {
            return;
        };
        let next = self.nodes[handle].next_sibling.take();
        if self.nodes[parent].first_child == Some(handle) {
            self.nodes[parent].first_child = next;
            return;
        }
        let mut cursor = self.nodes[parent].first_child;
        while let Some(cur) = cursor {
            if self.nodes[cur].next_sibling == Some(handle) {
                self.nodes[cur].next_sibling = next;
                return;
            }
            cursor = self.nodes[cur].next_sibling;
        }
    }

    /// Replace `parent`'s children with `order`, relinking the sibling chain.
    pub(crate) fn relink_children(&mut self, parent: NodeHandle, order: &[NodeHandle]) {
        self.nodes[parent].first_child = order.first().copied();
        for pair in order.windows(2) {
            self.nodes[pair[0]].next_sibling = Some(pair[1]);
        }
        if let Some(&last) = order.last() {
            self.nodes[last].next_sibling = None;
        }
    }

    // ── traversal ───────────────────────────────────────────────

    /// Direct children of `handle`, in sibling order.
    pub fn children(&self, handle: NodeHandle) -> Children<'_> {
        Children {
            tree: self,
            next: self.nodes[handle].first_child,
        }
    }

    /// Every reachable entry, root first, in depth-first pre-order.
    pub fn preorder(&self) -> Preorder<'_> {
        self.preorder_from(self.root)
    }

    /// `start` and its descendants in depth-first pre-order.
    pub fn preorder_from(&self, start: NodeHandle) -> Preorder<'_> {
        Preorder {
            tree: self,
            start,
            stack: vec![start],
        }
    }

    /// Play-queue enumeration: audio files below `handle` in tree order,
    /// skipping entries whose path could not be resolved.
    pub fn audio_files(&self, handle: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        self.preorder_from(handle).filter(|&h| {
            let e = &self.nodes[h];
            !e.is_dir && e.full_path.is_some()
        })
    }

    pub fn find_by_id(&self, id: EntryId) -> Option<NodeHandle> {
        self.preorder().find(|&h| self.nodes[h].id == id)
    }

    /// Resolve a `/`-separated path relative to the library root by walking
    /// names from the root.  An empty path resolves to the root.
    pub fn find_by_name_path(&self, relative: &str) -> Option<NodeHandle> {
        let mut current = self.root;
        for part in relative.split('/').filter(|p| !p.is_empty()) {
            current = self.children(current).find(|&c| self.nodes[c].name == part)?;
        }
        Some(current)
    }

    // ── queue flag ──────────────────────────────────────────────

    pub fn is_enqueued(&self, handle: NodeHandle) -> bool {
        self.nodes[handle].enqueued
    }

    pub fn set_enqueued(&mut self, handle: NodeHandle, enqueued: bool) {
        self.nodes[handle].enqueued = enqueued;
    }
}

// ───────────────────────────────────────── iterators ─────────

pub struct Children<'a> {
    tree: &'a LibraryTree,
    next: Option<NodeHandle>,
}

impl Iterator for Children<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let current = self.next?;
        self.next = self.tree.nodes[current].next_sibling;
        Some(current)
    }
}

/// Explicit-stack pre-order walk; depth never touches the call stack.
pub struct Preorder<'a> {
    tree: &'a LibraryTree,
    start: NodeHandle,
    stack: Vec<NodeHandle>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let current = self.stack.pop()?;
        let node = &self.tree.nodes[current];
        // Siblings of the start node are outside the subtree.
        if current != self.start {
            if let Some(next) = node.next_sibling {
                self.stack.push(next);
            }
        }
        if let Some(child) = node.first_child {
            self.stack.push(child);
        }
        Some(current)
    }
}

// ───────────────────────────────────────── tail appends ──────

/// Builder context for O(1) appends at the end of a sibling chain.
///
/// Tracks the last child of every parent it has appended to.  Only valid while
/// the caller is the sole mutator of the children it tracks.
#[derive(Debug, Default)]
pub struct ChildAppender {
    last_child: HashMap<NodeHandle, NodeHandle>,
}

impl ChildAppender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, tree: &mut LibraryTree, parent: NodeHandle, child: NodeHandle) {
        let parent_id = tree.nodes[parent].id;
        {
            let node = &mut tree.nodes[child];
            node.parent = Some(parent);
            node.parent_id = Some(parent_id);
            node.next_sibling = None;
        }
        match self.last_child.insert(parent, child) {
            Some(prev) => tree.nodes[prev].next_sibling = Some(child),
            None => tree.nodes[parent].first_child = Some(child),
        }
    }
}
