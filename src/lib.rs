//! Music library indexing: scan a directory tree of audio files into an
//! in-memory [`LibraryTree`](core::tree::LibraryTree), persist it as a compact
//! snapshot, and search or order it without touching the disk again.

pub mod app;
pub mod config;
pub mod core;
