//! Sibling ordering: natural (digit-aware) names, `_`-prefixed entries first,
//! or newest directories first.

use std::cmp::Ordering;
use std::str::FromStr;
use std::time::SystemTime;

use super::tree::{Entry, LibraryTree, NodeHandle};

/// Which comparator to order siblings with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// [`library_order`]: `_`-prefixed names first, then natural order.
    #[default]
    Library,
    /// [`by_recency_then_name`]: newest directories first, files by name.
    Recent,
}

impl SortOrder {
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Library => "library",
            SortOrder::Recent => "recent",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "library" | "alpha" | "name" => Ok(SortOrder::Library),
            "recent" | "mtime" => Ok(SortOrder::Recent),
            other => Err(format!("unknown sort order `{other}` (expected library or recent)")),
        }
    }
}

// ───────────────────────────────────────── comparators ───────

/// Compare strings treating runs of ASCII digits as numbers, so `track2`
/// sorts before `track10`.  Everything else compares by code point.
///
/// Digit runs too long for a `u64` compare by length, then lexically.
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let a_end = digit_run_end(a, i);
            let b_end = digit_run_end(b, j);
            let (a_run, b_run) = (&a[i..a_end], &b[j..b_end]);

            let ord = match (parse_run(a_run), parse_run(b_run)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => a_run.len().cmp(&b_run.len()).then_with(|| a_run.cmp(b_run)),
            };
            if ord != Ordering::Equal {
                return ord;
            }
            i = a_end;
            j = b_end;
            continue;
        }
        // Multi-byte UTF-8 sequences order by code point under byte comparison.
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            ord => return ord,
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}

fn digit_run_end(s: &[u8], start: usize) -> usize {
    s[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(s.len(), |n| start + n)
}

fn parse_run(run: &[u8]) -> Option<u64> {
    run.iter().try_fold(0u64, |acc, &d| {
        acc.checked_mul(10)?.checked_add(u64::from(d - b'0'))
    })
}

/// Case-insensitive natural order with `_`-prefixed names pinned first.
pub fn library_order(a: &Entry, b: &Entry) -> Ordering {
    SortOrder::Library.key(a).cmp(&SortOrder::Library.key(b))
}

/// Directories before files; directories newest-modified first, files by
/// case-insensitive name.
pub fn by_recency_then_name(a: &Entry, b: &Entry) -> Ordering {
    SortOrder::Recent.key(a).cmp(&SortOrder::Recent.key(b))
}

/// Modification time, or the epoch when the entry cannot be stat'ed.
fn modified(entry: &Entry) -> SystemTime {
    entry
        .path()
        .and_then(|p| std::fs::metadata(p).ok())
        .and_then(|m| m.modified().ok())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Everything a [`SortOrder`] compares, read from the entry (and the
/// filesystem) once per sort.
#[derive(Debug, Clone)]
pub enum SortKey {
    /// Upper-cased name; `pinned` when it starts with `_`.
    Library { pinned: bool, name: String },
    /// `modified` is set for directories only; files carry a lower-cased name.
    Recent {
        modified: Option<SystemTime>,
        name: String,
    },
}

impl SortOrder {
    pub fn key(self, entry: &Entry) -> SortKey {
        match self {
            SortOrder::Library => {
                let name = entry.name.to_uppercase();
                SortKey::Library {
                    pinned: name.starts_with('_'),
                    name,
                }
            }
            SortOrder::Recent if entry.is_dir => SortKey::Recent {
                modified: Some(modified(entry)),
                name: String::new(),
            },
            SortOrder::Recent => SortKey::Recent {
                modified: None,
                name: entry.name.to_lowercase(),
            },
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        use SortKey::*;
        match (self, other) {
            (Library { pinned: ap, name: an }, Library { pinned: bp, name: bn }) => {
                bp.cmp(ap).then_with(|| natural_compare(an, bn))
            }
            (Recent { modified: Some(a), .. }, Recent { modified: Some(b), .. }) => b.cmp(a),
            (Recent { modified: None, name: a }, Recent { modified: None, name: b }) => a.cmp(b),
            (Recent { modified: Some(_), .. }, Recent { .. }) => Ordering::Less,
            (Recent { .. }, Recent { .. }) => Ordering::Greater,
            (Library { .. }, Recent { .. }) => Ordering::Less,
            (Recent { .. }, Library { .. }) => Ordering::Greater,
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

// ───────────────────────────────────────── tree sorting ──────

/// Reorder the direct children of `parent` by `order` (stable).
///
/// Keys are computed once per child, so a directory touched mid-sort cannot
/// make the order inconsistent.
pub fn sort_children(tree: &mut LibraryTree, parent: NodeHandle, order: SortOrder) {
    let mut children: Vec<NodeHandle> = tree.children(parent).collect();
    if children.len() < 2 {
        return;
    }
    children.sort_by_cached_key(|&h| order.key(tree.get(h)));
    tree.relink_children(parent, &children);
}

/// Sort the children of every directory in the tree.
pub fn sort_tree(tree: &mut LibraryTree, order: SortOrder) {
    let dirs: Vec<NodeHandle> = tree
        .preorder()
        .filter(|&h| tree.get(h).is_dir && tree.get(h).has_children())
        .collect();
    for dir in dirs {
        sort_children(tree, dir, order);
    }
}
