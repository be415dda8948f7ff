//! Name validation and full-path composition for library entries.
//!
//! Every path stored in the tree goes through [`compose_path`], which re-scans
//! the assembled string for traversal segments even though [`is_valid_name`]
//! already rejects `.` and `..` as names.

use thiserror::Error;

/// Longest accepted single path component, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Longest accepted composed path, in bytes.
pub const MAX_PATH_LEN: usize = 4096;

/// Why a composed path was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("composed path would be {len} bytes (limit {MAX_PATH_LEN})")]
    TooLong { len: usize },
    #[error("composed path `{0}` contains a traversal segment")]
    Traversal(String),
}

/// Is `name` safe to use as a single path component?
///
/// The empty string is accepted; it names the synthetic library root.
pub fn is_valid_name(name: &str) -> bool {
    if name == "." || name == ".." {
        return false;
    }
    if name.len() > MAX_NAME_LEN || name.len() >= MAX_PATH_LEN {
        return false;
    }
    !name
        .bytes()
        .any(|b| b == b'/' || b == b'\\' || b < 0x20 || b == 0x7f)
}

/// Join `parent` and `name` as `parent/name`, stripping one trailing `/` from
/// the parent first.
pub fn compose_path(parent: &str, name: &str) -> Result<String, PathError> {
    let parent = parent.strip_suffix('/').unwrap_or(parent);
    // One byte is reserved for the terminator callers of the OS APIs need.
    let len = parent.len() + 1 + name.len();
    if len >= MAX_PATH_LEN {
        return Err(PathError::TooLong { len });
    }

    let mut path = String::with_capacity(len);
    path.push_str(parent);
    path.push('/');
    path.push_str(name);

    if has_traversal(&path) {
        return Err(PathError::Traversal(path));
    }
    Ok(path)
}

fn has_traversal(path: &str) -> bool {
    path.contains("/../") || path.ends_with("/..") || path.starts_with("../")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dot_names() {
        assert!(!is_valid_name("."));
        assert!(!is_valid_name(".."));
        assert!(is_valid_name("..."));
        assert!(is_valid_name(".hidden"));
    }

    #[test]
    fn empty_name_is_valid() {
        assert!(is_valid_name(""));
    }

    #[test]
    fn rejects_separators_and_control_chars() {
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a\\b"));
        assert!(!is_valid_name("tab\there"));
        assert!(!is_valid_name("line\nbreak"));
        assert!(!is_valid_name("nul\0"));
        assert!(!is_valid_name("del\u{7f}"));
        assert!(is_valid_name("Sigur Rós – ( )"));
    }

    #[test]
    fn rejects_overlong_names() {
        assert!(is_valid_name(&"a".repeat(MAX_NAME_LEN)));
        assert!(!is_valid_name(&"a".repeat(MAX_NAME_LEN + 1)));
    }

    #[test]
    fn composes_with_single_separator() {
        assert_eq!(compose_path("/music", "a.mp3").unwrap(), "/music/a.mp3");
        assert_eq!(compose_path("/music/", "a.mp3").unwrap(), "/music/a.mp3");
        assert_eq!(compose_path("/", "music").unwrap(), "/music");
    }

    #[test]
    fn rejects_traversal_after_composition() {
        assert!(matches!(
            compose_path("/base/..", "secret"),
            Err(PathError::Traversal(p)) if p == "/base/../secret"
        ));
        assert!(matches!(
            compose_path("/base", ".."),
            Err(PathError::Traversal(p)) if p == "/base/.."
        ));
        assert!(matches!(
            compose_path("..", "escape"),
            Err(PathError::Traversal(p)) if p == "../escape"
        ));
    }

    #[test]
    fn rejects_overlong_paths() {
        let parent = format!("/{}", "d".repeat(MAX_PATH_LEN - 3));
        assert_eq!(
            compose_path(&parent, "x"),
            Err(PathError::TooLong { len: MAX_PATH_LEN })
        );
        assert!(compose_path(&parent[..parent.len() - 1], "x").is_ok());
    }
}
