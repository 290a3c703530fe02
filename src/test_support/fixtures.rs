//! Test fixtures for common test scenarios.
//!
//! This module provides on-disk source trees and canned tool output for
//! common testing patterns in extplan.

use std::path::Path;

use tempfile::TempDir;

use crate::util::config::PROJECT_CONFIG_NAME;

/// A temporary directory populated with source files.
#[derive(Debug)]
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        SourceTree {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Add a file with placeholder contents.
    pub fn file(self, rel: &str) -> Self {
        let contents = format!("// {}\n", rel);
        self.text(rel, &contents)
    }

    /// Add a file with the given contents.
    pub fn text(self, rel: &str, contents: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("failed to write fixture file");
        self
    }

    /// Remove a file added earlier.
    pub fn remove(self, rel: &str) -> Self {
        std::fs::remove_file(self.dir.path().join(rel)).expect("failed to remove fixture file");
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for SourceTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend files of a small torchsparse-shaped project.
pub const TORCHSPARSE_BACKEND_FILES: &[&str] = &[
    "pybind_cpu.cpp",
    "pybind_cuda.cu",
    "conv/conv_cpu.cpp",
    "conv/conv_cuda.cu",
    "hash/hash_cpu.cpp",
    "hash/hash_cuda.cu",
    "devoxelize/devoxelize_cpu.cpp",
    "devoxelize/devoxelize_cuda.cu",
    "others/query_cpu.h",
    "README.md",
];

/// Fixture for a complete project: version file, backend tree and an
/// optional `extplan.toml`.
#[derive(Debug)]
pub struct ProjectFixture {
    tree: SourceTree,
}

impl ProjectFixture {
    /// Project using the default layout and no config file.
    pub fn torchsparse() -> Self {
        let mut tree = SourceTree::new().text("torchsparse/version.py", "__version__ = '2.1.0'\n");
        for file in TORCHSPARSE_BACKEND_FILES {
            tree = tree.file(&format!("torchsparse/backend/{}", file));
        }
        ProjectFixture { tree }
    }

    /// Write `extplan.toml` with the given contents.
    pub fn with_config(self, contents: &str) -> Self {
        ProjectFixture {
            tree: self.tree.text(PROJECT_CONFIG_NAME, contents),
        }
    }

    /// Add or replace a project file.
    pub fn with_file(self, rel: &str, contents: &str) -> Self {
        ProjectFixture {
            tree: self.tree.text(rel, contents),
        }
    }

    pub fn without_version_file(self) -> Self {
        ProjectFixture {
            tree: self.tree.remove("torchsparse/version.py"),
        }
    }

    pub fn path(&self) -> &Path {
        self.tree.root()
    }

    pub fn backend_root(&self) -> std::path::PathBuf {
        self.path().join("torchsparse/backend")
    }
}

/// Canned `nvcc --version` output.
pub mod nvcc_output {
    /// Banner printed by a working nvcc.
    pub fn version(release: &str) -> String {
        format!(
            "nvcc: NVIDIA (R) Cuda compiler driver\n\
             Copyright (c) 2005-2024 NVIDIA Corporation\n\
             Built on Tue_Feb_27_16:19:38_PST_2024\n\
             Cuda compilation tools, release {release}, V{release}.99\n\
             Build cuda_{release}.r{release}/compiler.0\n"
        )
    }
}

/// Sample `extplan.toml` contents.
pub mod config_templates {
    /// Planning without a driver and without probing.
    pub fn offline() -> &'static str {
        "[policy]\nassume_runtime = false\nverify_device_compiler = false\n"
    }

    /// Use an explicit source manifest.
    pub fn with_manifest(path: &str) -> String {
        format!("[sources]\nmanifest = \"{}\"\n", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_fixture_layout() {
        let project = ProjectFixture::torchsparse();
        assert!(project.path().join("torchsparse/version.py").is_file());
        assert!(project.backend_root().join("pybind_cuda.cu").is_file());
        assert!(project.backend_root().join("conv/conv_cpu.cpp").is_file());
        assert!(!project.path().join(PROJECT_CONFIG_NAME).exists());
    }

    #[test]
    fn test_project_fixture_config() {
        let project = ProjectFixture::torchsparse().with_config(config_templates::offline());
        let text = std::fs::read_to_string(project.path().join(PROJECT_CONFIG_NAME)).unwrap();
        assert!(text.contains("assume_runtime = false"));
    }

    #[test]
    fn test_nvcc_output_has_release_line() {
        let output = nvcc_output::version("12.4");
        assert!(output
            .lines()
            .any(|l| l == "Cuda compilation tools, release 12.4, V12.4.99"));
    }
}
