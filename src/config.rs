//! User configuration: library location, snapshot path and search knobs.
//!
//! Settings are stored as a simple key-value text file at
//! `$XDG_CONFIG_HOME/tunetree/config.toml` (default `~/.config/tunetree/config.toml`).

use std::path::{Path, PathBuf};

use crate::core::sort::SortOrder;

const DEFAULT_THRESHOLD: usize = 10;
const MAX_THRESHOLD: usize = 1000;
const DEFAULT_MAX_RESULTS: usize = 50;

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryConfig {
    /// Root of the music library.
    pub library_path: PathBuf,
    /// Where the library snapshot is written.
    pub cache_path: PathBuf,
    /// Highest distance a non-substring search hit may have.
    pub search_threshold: usize,
    /// Hits shown per search.
    pub max_results: usize,
    pub sort_order: SortOrder,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            library_path: home_dir().join("Music"),
            cache_path: cache_dir().join("tunetree").join("library.tsv"),
            search_threshold: DEFAULT_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
            sort_order: SortOrder::default(),
        }
    }
}

impl LibraryConfig {
    // ── persistence ─────────────────────────────────────────────

    /// Load config from disk, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Self::default(),
        }
    }

    /// Persist current config to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.serialise())?;
        Ok(())
    }

    fn parse(s: &str) -> Self {
        let mut config = Self::default();

        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');

            match key {
                "library_path" if !value.is_empty() => config.library_path = expand_home(value),
                "cache_path" if !value.is_empty() => config.cache_path = expand_home(value),
                "search_threshold" => {
                    if let Ok(v) = value.parse::<usize>() {
                        config.search_threshold = v.min(MAX_THRESHOLD);
                    }
                }
                "max_results" => {
                    if let Ok(v) = value.parse::<usize>() {
                        config.max_results = v.max(1);
                    }
                }
                "sort_order" => {
                    if let Ok(order) = value.parse() {
                        config.sort_order = order;
                    }
                }
                _ => {}
            }
        }

        config
    }

    fn serialise(&self) -> String {
        let lines = [
            "# tunetree configuration".to_string(),
            String::new(),
            "# Library".to_string(),
            format!("library_path = \"{}\"", self.library_path.display()),
            format!("cache_path = \"{}\"", self.cache_path.display()),
            String::new(),
            "# Search and ordering".to_string(),
            format!("search_threshold = {}", self.search_threshold),
            format!("max_results = {}", self.max_results),
            "# sort_order: library | recent".to_string(),
            format!("sort_order = {}", self.sort_order.label()),
            String::new(),
        ];
        lines.join("\n")
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None => PathBuf::from(value),
    }
}

fn cache_dir() -> PathBuf {
    std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".cache"))
}

/// Return the config file path (`$XDG_CONFIG_HOME/tunetree/config.toml`).
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    config_dir.join("tunetree").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keys_and_ignores_the_rest() {
        let config = LibraryConfig::parse(
            "# comment\n[section]\nlibrary_path = \"/srv/music\"\nsearch_threshold = 42\n\
             sort_order = recent\nmystery = 1\nmax_results = 0\n",
        );
        assert_eq!(config.library_path, PathBuf::from("/srv/music"));
        assert_eq!(config.search_threshold, 42);
        assert_eq!(config.sort_order, SortOrder::Recent);
        assert_eq!(config.max_results, 1);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let config = LibraryConfig::parse("search_threshold = lots\nsort_order = size\nno equals sign\n");
        assert_eq!(config.search_threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.sort_order, SortOrder::Library);
    }

    #[test]
    fn threshold_is_clamped() {
        let config = LibraryConfig::parse("search_threshold = 999999\n");
        assert_eq!(config.search_threshold, MAX_THRESHOLD);
    }

    #[test]
    fn save_then_load_restores_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = LibraryConfig {
            library_path: PathBuf::from("/data/music"),
            cache_path: PathBuf::from("/data/cache/lib.tsv"),
            search_threshold: 7,
            max_results: 20,
            sort_order: SortOrder::Recent,
        };
        config.save_to(&path).unwrap();
        assert_eq!(LibraryConfig::load_from(&path), config);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LibraryConfig::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config.search_threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
    }
}
