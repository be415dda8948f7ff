//! Application orchestration: the live library and its background rescans.

pub mod fs_runtime;
pub mod state;
