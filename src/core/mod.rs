//! Core algorithms – library traversal, tree construction, persistence,
//! ordering and search.
//!
//! Nothing in this module depends on the async runtime or the CLI.
//! Trees are plain owned data, so a finished tree can be sent to another
//! thread and swapped in whole.

pub mod codec;
pub mod fs;
pub mod inspector;
pub mod path;
pub mod search;
pub mod sort;
pub mod sync;
pub mod tree;
