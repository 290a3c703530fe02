//! Global context for extplan operations.
//!
//! Provides centralized access to the working directory, the project root,
//! and the configuration file locations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{global_config_path, load_config, Config, PROJECT_CONFIG_NAME};

/// Global context containing paths and CLI-wide settings.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Project root (directory holding `extplan.toml`, or `cwd`)
    project_root: PathBuf,

    /// Global configuration file, if a home directory is known
    global_config: Option<PathBuf>,

    /// Whether to use verbose output
    verbose: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let project_root = find_project_root(&cwd).unwrap_or_else(|| cwd.clone());

        GlobalContext {
            cwd,
            project_root,
            global_config: global_config_path(),
            verbose: false,
        }
    }

    /// Override the global configuration file (`None` disables it).
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Whether verbose output was requested.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the project configuration file path (may not exist).
    pub fn project_config_path(&self) -> PathBuf {
        self.project_root.join(PROJECT_CONFIG_NAME)
    }

    /// Get the global configuration file path, if any.
    pub fn global_config_path(&self) -> Option<&Path> {
        self.global_config.as_deref()
    }

    /// Load the merged global + project configuration.
    pub fn load_config(&self) -> Result<Config> {
        load_config(self.global_config_path(), &self.project_config_path())
    }
}

/// Walk up from `start` looking for a directory containing `extplan.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_CONFIG_NAME).is_file())
        .map(Path::to_path_buf)
}
