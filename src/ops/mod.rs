//! High-level operations.
//!
//! This module contains the implementation of extplan commands.

pub mod extplan_build;
pub mod extplan_manifest;
pub mod extplan_plan;

pub use extplan_build::{build, BuildOptions, BuildOutcome, PLAN_ENV_VAR};
pub use extplan_manifest::{manifest, manifest_path, ManifestAction, ManifestOutcome};
pub use extplan_plan::{capture, load_planner, plan, EnvOverrides, PlanOptions, PlanOutcome};
