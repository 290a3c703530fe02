//! Explicit source manifest.
//!
//! Lists kernel files per backend instead of relying on filename suffixes
//! alone. Paths are relative to the backend source root and may be globs:
//!
//! ```toml
//! fallback = ["convolution/convolution_cpu.cpp", "hashmap/*_cpu.cpp"]
//! accelerated = ["convolution/convolution_cuda.cu"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::planner::PlanError;

/// Kernel files by backend, as declared by the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceManifest {
    /// Host kernels, linked into every build
    pub fallback: Vec<String>,

    /// Device kernels, linked only into accelerated builds
    pub accelerated: Vec<String>,
}

impl SourceManifest {
    /// Load a manifest file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path).map_err(|e| PlanError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        toml::from_str(&contents).map_err(|e| PlanError::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })
    }

    /// Render as TOML, with a header comment.
    pub fn to_toml(&self) -> Result<String, PlanError> {
        let body = toml::to_string_pretty(self).map_err(|e| PlanError::Config {
            path: None,
            message: e.to_string(),
        })?;
        Ok(format!(
            "# Kernel sources, relative to the backend source root.\n\
             # Regenerate with `extplan manifest --write`.\n\n{}",
            body
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.fallback.is_empty() && self.accelerated.is_empty()
    }
}
