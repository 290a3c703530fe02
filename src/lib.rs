//! extplan - build planner for native extension modules
//!
//! This crate decides whether a native extension is built with its CUDA
//! backend or its CPU fallback, resolves the matching sources, and assembles
//! the compiler parameters handed to the downstream extension builder.

pub mod core;
pub mod ops;
pub mod planner;
pub mod util;

/// Test utilities and mocks for extplan unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a mock device compiler probe and on-disk
/// source-tree fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{BuildEnvironment, CompileSpec, DeviceBackend, OsFamily, SourceSet};
pub use planner::{BuildPlanner, ExtensionPlan, PlanError, PlannerConfig, PlannerPolicy};
pub use util::context::GlobalContext;
