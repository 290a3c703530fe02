//! Command implementations

pub mod backend;
pub mod build;
pub mod completions;
pub mod flags;
pub mod manifest;
pub mod plan;
pub mod sources;
pub mod toolchain;
