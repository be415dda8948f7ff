//! Entry metadata inspection for the `info` command.
//!
//! Performs filesystem reads for one library entry and returns plain data;
//! formatting for display lives in [`InspectorInfo::lines`].

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::tree::Entry;

#[derive(Debug, Clone)]
pub struct InspectorInfo {
    pub name: String,
    pub path: Option<String>,
    pub kind: &'static str,
    /// Content-sniffed MIME type (files only).
    pub detected_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub modified_unix: Option<u64>,
    pub enqueued: bool,
    pub error: Option<String>,
}

pub fn inspect(entry: &Entry) -> InspectorInfo {
    let mut info = InspectorInfo {
        name: entry.name.clone(),
        path: entry.full_path.clone(),
        kind: if entry.is_dir { "Directory" } else { "Track" },
        detected_type: None,
        size_bytes: None,
        modified_unix: None,
        enqueued: entry.enqueued,
        error: None,
    };

    let Some(path) = entry.path() else {
        info.error = Some("path was rejected during indexing".to_string());
        return info;
    };

    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            info.error = Some(format!("stat error: {e}"));
            return info;
        }
    };
    info.modified_unix = to_unix_secs(meta.modified().ok());
    if meta.is_file() {
        info.size_bytes = Some(meta.len());
        info.detected_type = detect_file_type(path);
    }

    info
}

impl InspectorInfo {
    /// `label: value` rows in display order.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Name", self.name.clone()),
            ("Kind", self.kind.to_string()),
            ("Path", self.path.clone().unwrap_or_else(|| "-".into())),
        ];
        if let Some(t) = &self.detected_type {
            rows.push(("Type", t.clone()));
        }
        if let Some(size) = self.size_bytes {
            rows.push(("Size", human_size(size)));
        }
        if let Some(ts) = self.modified_unix {
            rows.push(("Modified", format_ts(ts)));
        }
        rows.push(("Queued", if self.enqueued { "yes" } else { "no" }.to_string()));
        if let Some(e) = &self.error {
            rows.push(("Error", e.clone()));
        }
        rows
    }
}

fn to_unix_secs(t: Option<SystemTime>) -> Option<u64> {
    t.and_then(|v| v.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs()))
}

fn detect_file_type(path: &Path) -> Option<String> {
    // Magic-based, so mislabelled extensions still report their real format.
    tree_magic_mini::from_filepath(path).map(str::to_string)
}

fn format_ts(unix_secs: u64) -> String {
    use chrono::{Local, TimeZone};
    let s = i64::try_from(unix_secs).unwrap_or(i64::MAX);
    match Local.timestamp_opt(s, 0).single() {
        Some(dt) => dt.format("%Y/%m/%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    for &unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} PiB")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::LibraryTree;

    #[test]
    fn human_size_picks_unit() {
        assert_eq!(human_size(512), "512.0 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn unresolved_entry_reports_error() {
        let mut tree = LibraryTree::with_root("/m");
        let root = tree.root();
        let bad = tree.create_entry("a\\b", false, root).unwrap();
        let info = inspect(tree.get(bad));
        assert_eq!(info.kind, "Track");
        assert!(info.error.is_some());
        assert!(info.lines().iter().any(|(k, _)| *k == "Error"));
    }

    #[test]
    fn reads_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"ID3\x04\0\0\0\0\0\0").unwrap();
        let mut tree = LibraryTree::with_root(dir.path().to_str().unwrap());
        let root = tree.root();
        let song = tree.create_entry("a.mp3", false, root).unwrap();
        let info = inspect(tree.get(song));
        assert_eq!(info.size_bytes, Some(10));
        assert!(info.modified_unix.is_some());
        assert!(info.error.is_none());
    }
}
