//! Core data structures for extplan.
//!
//! This module contains the types that flow through a planning run:
//! - The captured host environment and OS family
//! - The selected device backend
//! - Source sets and compile specifications
//! - Version and source-manifest files

pub mod backend;
pub mod compile_spec;
pub mod environment;
pub mod language;
pub mod manifest;
pub mod source_set;
pub mod version;

pub use backend::DeviceBackend;
pub use compile_spec::{CompileSpec, CompilerRole, Define};
pub use environment::{BuildEnvironment, DeviceCompilerStatus, OsFamily};
pub use language::CppStandard;
pub use manifest::SourceManifest;
pub use source_set::SourceSet;
