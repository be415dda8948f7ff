//! Library snapshot format.
//!
//! One line per entry, tab-separated:
//!
//! ```text
//! <id>\t<name>\t<is_dir:0|1>\t<parent_id>\n
//! ```
//!
//! The root carries parent id `-1`.  There is no header or footer and record
//! order carries no meaning when decoding.  Paths are not stored: they are
//! recomposed on load from the caller-supplied library root, which must be the
//! same root the snapshot was written from.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Seek, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use super::tree::{ChildAppender, EntryId, IdCounter, LibraryTree, NodeHandle};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot has no root record")]
    NoRoot,
    #[error("cannot allocate id table for max id {max_id}")]
    TableAlloc { max_id: EntryId },
}

/// One parsed snapshot line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    id: EntryId,
    name: String,
    is_dir: bool,
    /// `None` for `-1` (the root).
    parent_id: Option<EntryId>,
}

impl Record {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split('\t');
        let id = fields.next()?.parse::<EntryId>().ok()?;
        let name = fields.next()?;
        let is_dir = match fields.next()? {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        let parent_id = match fields.next()? {
            "-1" => None,
            raw => Some(raw.parse::<EntryId>().ok()?),
        };
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            id,
            name: name.to_string(),
            is_dir,
            parent_id,
        })
    }

    /// Parse one raw line; a line that is not UTF-8 is malformed like any other.
    fn from_bytes(raw: &[u8]) -> Option<Self> {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        Self::parse(std::str::from_utf8(raw).ok()?)
    }
}

/// Read the next raw line into `buf`; `false` at end of input.
fn read_line<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    Ok(input.read_until(b'\n', buf)? > 0)
}

// ───────────────────────────────────────── encode ────────────

/// Write every reachable entry of `tree` in pre-order.
pub fn encode<W: Write>(tree: &LibraryTree, out: &mut W) -> io::Result<()> {
    for handle in tree.preorder() {
        let entry = tree.get(handle);
        let parent_id = entry.parent_id.map_or(-1, i64::from);
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            entry.id,
            entry.name,
            u8::from(entry.is_dir),
            parent_id
        )?;
    }
    Ok(())
}

/// Write `tree` to `path`.
///
/// The snapshot is written to a sibling temp file first and renamed into
/// place, so a crash mid-write leaves the previous snapshot intact.
pub fn store(tree: &LibraryTree, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut out = BufWriter::new(File::create(&tmp)?);
        encode(tree, &mut out)?;
        out.flush()?;
    }
    std::fs::rename(&tmp, path)
}

/// Write `tree` to `path` and release it; the usual last step before exit.
pub fn save(tree: LibraryTree, path: &Path) -> io::Result<()> {
    store(&tree, path)
}

// ───────────────────────────────────────── decode ────────────

/// Rebuild a tree from a snapshot.
///
/// Two passes: the first only learns the largest id so that the second can
/// place every entry in a direct id-indexed table.  Linking then needs no
/// forward-reference handling, whatever order the records come in.
/// Malformed, duplicate or self-parented records are skipped.
pub fn decode<R: BufRead + Seek>(mut input: R, root_path: &str) -> Result<LibraryTree, CodecError> {
    // Pass 1: bounds only.
    let mut records = 0usize;
    let mut max_id: Option<EntryId> = None;
    let mut buf = Vec::new();
    while read_line(&mut input, &mut buf)? {
        if let Some(record) = Record::from_bytes(&buf) {
            records += 1;
            max_id = Some(max_id.map_or(record.id, |m| m.max(record.id)));
        }
    }
    let Some(max_id) = max_id else {
        return Err(CodecError::NoRoot);
    };
    debug!(records = records, max_id = max_id, "snapshot scanned");

    let slots = max_id as usize + 1;
    let mut table: Vec<Option<NodeHandle>> = Vec::new();
    table
        .try_reserve_exact(slots)
        .map_err(|_| CodecError::TableAlloc { max_id })?;
    table.resize(slots, None);

    // Pass 2: materialise every entry into the table.
    input.rewind()?;
    let mut tree = LibraryTree::detached(IdCounter::starting_at(max_id.saturating_add(1)));
    let mut links: Vec<(NodeHandle, Option<EntryId>)> = Vec::with_capacity(records);
    let mut lineno = 0usize;
    while read_line(&mut input, &mut buf)? {
        lineno += 1;
        let Some(record) = Record::from_bytes(&buf) else {
            warn!("skipping malformed snapshot line {lineno}");
            continue;
        };
        let slot = record.id as usize;
        match table.get(slot) {
            Some(None) => {}
            Some(Some(_)) => {
                warn!("skipping duplicate snapshot id {}", record.id);
                continue;
            }
            // The file grew between passes.
            None => {
                warn!("skipping out-of-range snapshot id {}", record.id);
                continue;
            }
        }
        if record.parent_id == Some(record.id) {
            warn!("skipping self-parented snapshot id {}", record.id);
            continue;
        }
        let handle = tree.push_entry(record.id, record.name, record.is_dir);
        table[slot] = Some(handle);
        links.push((handle, record.parent_id));
    }

    // Link in file order; the first unresolvable record becomes the root.
    let mut root: Option<NodeHandle> = None;
    let mut appender = ChildAppender::new();
    for (handle, parent_id) in links {
        let parent = parent_id.and_then(|pid| table.get(pid as usize).copied().flatten());
        match parent {
            Some(parent) => appender.append(&mut tree, parent, handle),
            None if root.is_none() && parent_id.is_none() => root = Some(handle),
            None => warn!("dropping orphan snapshot id {}", tree.get(handle).id),
        }
    }
    let root = root.ok_or(CodecError::NoRoot)?;
    tree.set_root(root, root_path);

    // Paths are composed top-down so every parent path exists first.
    let order: Vec<NodeHandle> = tree.preorder().skip(1).collect();
    for handle in order {
        let Some(parent) = tree.get(handle).parent() else {
            continue;
        };
        let name = tree.get(handle).name.clone();
        let path = tree.child_path(parent, &name);
        tree.get_mut(handle).full_path = path;
    }

    Ok(tree)
}

/// Open and decode the snapshot at `path`.
pub fn load(path: &Path, root_path: &str) -> Result<LibraryTree, CodecError> {
    let file = File::open(path)?;
    decode(BufReader::new(file), root_path)
}
