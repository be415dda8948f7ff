//! Fuzzy name search over a [`LibraryTree`].
//!
//! Names are compared through [`normalize`] (lower-cased, decomposed, combining
//! marks dropped) so `"beyonce"` finds `"Beyoncé"`.  [`distance`] ranks a name
//! in three bands:
//!
//! * `0` for an exact match,
//! * `len(name) - len(term)` when the term is a substring or prefix,
//! * `len(term) + levenshtein + 100` otherwise,
//!
//! plus [`FILE_PENALTY`] for files, so albums outrank single tracks.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::sort::natural_compare;
use super::tree::{LibraryTree, NodeHandle, Preorder};

/// Added to every non-substring distance.
pub const NO_SUBSTRING_OFFSET: usize = 100;

/// Added to the distance of file (non-directory) entries.
pub const FILE_PENALTY: usize = 25;

/// Case- and accent-insensitive comparison key.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Edit distance counted in code points, using two rolling rows.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Rank `haystack` against `needle`; lower is better.
pub fn distance(needle: &str, haystack: &str, is_dir: bool) -> usize {
    distance_normalized(&normalize(needle), needle, haystack, is_dir)
}

fn distance_normalized(needle_norm: &str, needle: &str, haystack: &str, is_dir: bool) -> usize {
    let hay_norm = normalize(haystack);
    let needle_len = needle_norm.chars().count();

    let base = if hay_norm == needle_norm {
        0
    } else if hay_norm.contains(needle_norm) || haystack.starts_with(needle) {
        hay_norm.chars().count().saturating_sub(needle_len)
    } else {
        needle_len + levenshtein(needle_norm, &hay_norm) + NO_SUBSTRING_OFFSET
    };

    if is_dir {
        base
    } else {
        base + FILE_PENALTY
    }
}

// ───────────────────────────────────────── tree search ───────

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub handle: NodeHandle,
    pub distance: usize,
}

/// Lazy sequence of every entry matching a term, in tree pre-order.
///
/// An entry matches when its lower-cased name contains the lower-cased term,
/// or its [`distance`] is within the threshold.  The synthetic root is never
/// reported.
pub struct SearchMatches<'a> {
    tree: &'a LibraryTree,
    walk: Preorder<'a>,
    term: String,
    term_lower: String,
    term_norm: String,
    threshold: usize,
}

impl Iterator for SearchMatches<'_> {
    type Item = SearchHit;

    fn next(&mut self) -> Option<SearchHit> {
        if self.term.is_empty() {
            return None;
        }
        for handle in self.walk.by_ref() {
            if handle == self.tree.root() {
                continue;
            }
            let entry = self.tree.get(handle);
            let distance = distance_normalized(&self.term_norm, &self.term, &entry.name, entry.is_dir);
            let contains = entry.name.to_lowercase().contains(&self.term_lower);
            if contains || distance <= self.threshold {
                return Some(SearchHit { handle, distance });
            }
        }
        None
    }
}

/// Search every entry of `tree` for `term`.
pub fn search<'a>(tree: &'a LibraryTree, term: &str, threshold: usize) -> SearchMatches<'a> {
    let term = term.trim().to_string();
    SearchMatches {
        tree,
        walk: tree.preorder(),
        term_lower: term.to_lowercase(),
        term_norm: normalize(&term),
        term,
        threshold,
    }
}

/// Collect the hits for `term`, best first: lowest distance, then directories,
/// then natural name order.  At most `limit` hits are returned.
pub fn ranked(tree: &LibraryTree, term: &str, threshold: usize, limit: usize) -> Vec<SearchHit> {
    if limit == 0 {
        return Vec::new();
    }
    let mut hits: Vec<SearchHit> = search(tree, term, threshold).collect();
    hits.sort_by(|a, b| rank_cmp(tree, a, b));
    hits.truncate(limit);
    hits
}

fn rank_cmp(tree: &LibraryTree, a: &SearchHit, b: &SearchHit) -> Ordering {
    let (ea, eb) = (tree.get(a.handle), tree.get(b.handle));
    a.distance
        .cmp(&b.distance)
        .then_with(|| eb.is_dir.cmp(&ea.is_dir))
        .then_with(|| natural_compare(&ea.name, &eb.name))
}
