//! Configuration file support for extplan.
//!
//! extplan reads two configuration files:
//! - Global: `~/.extplan/config.toml` - user-wide policy defaults
//! - Project: `extplan.toml` at the project root - project layout and overrides
//!
//! Project config takes precedence over global config. Every field is
//! optional; unset fields fall back to the defaults in
//! [`crate::planner::PlannerConfig`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the project configuration file.
pub const PROJECT_CONFIG_NAME: &str = "extplan.toml";

/// extplan configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Extension metadata
    pub extension: ExtensionConfig,

    /// Backend source tree layout
    pub sources: SourcesConfig,

    /// Compiler settings
    pub compile: CompileConfig,

    /// Backend selection and flag policy
    pub policy: PolicyConfig,

    /// Downstream build settings
    pub build: BuildConfig,
}

/// The `[extension]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionConfig {
    /// Dotted module name of the compiled extension (e.g. `torchsparse.backend`)
    pub name: Option<String>,

    /// File holding the version string in single quotes
    pub version_file: Option<PathBuf>,
}

/// The `[sources]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    /// Backend source root, relative to the project root
    pub root: Option<PathBuf>,

    /// Entry point used by the accelerated backend
    pub accelerated_entry: Option<String>,

    /// Entry point used by the fallback backend
    pub fallback_entry: Option<String>,

    /// Filename suffix of host kernels
    pub fallback_suffix: Option<String>,

    /// Filename suffix of device kernels
    pub accelerated_suffix: Option<String>,

    /// Explicit source manifest, relative to the project root
    pub manifest: Option<PathBuf>,
}

/// The `[compile]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    /// C++ standard for both compilers (11, 14, 17, 20, 23)
    pub cpp_std: Option<String>,

    /// Include directories, relative to the project root.
    /// Replaces the default list when set.
    pub include_dirs: Option<Vec<PathBuf>>,

    /// Extra flags appended to the primary compiler list
    pub cxx_flags: Vec<String>,

    /// Extra flags appended to the device compiler list
    pub nvcc_flags: Vec<String>,
}

/// The `[policy]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Require a working `nvcc` before choosing the accelerated backend
    pub verify_device_compiler: Option<bool>,

    /// Append `-w` to the device compiler flags
    pub suppress_device_warnings: Option<bool>,

    /// Timeout for the `nvcc --version` probe
    pub probe_timeout_secs: Option<u64>,

    /// Skip driver detection and assume the CUDA runtime is (not) present
    pub assume_runtime: Option<bool>,
}

/// The `[build]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Downstream build command (program followed by arguments)
    pub command: Option<Vec<String>>,

    /// Where `extplan build` writes the plan, relative to the project root
    pub plan_path: Option<PathBuf>,

    /// Always emit compile_commands.json
    pub emit_compile_commands: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration with fallback to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Extension
        if other.extension.name.is_some() {
            self.extension.name = other.extension.name;
        }
        if other.extension.version_file.is_some() {
            self.extension.version_file = other.extension.version_file;
        }

        // Sources
        let src = other.sources;
        if src.root.is_some() {
            self.sources.root = src.root;
        }
        if src.accelerated_entry.is_some() {
            self.sources.accelerated_entry = src.accelerated_entry;
        }
        if src.fallback_entry.is_some() {
            self.sources.fallback_entry = src.fallback_entry;
        }
        if src.fallback_suffix.is_some() {
            self.sources.fallback_suffix = src.fallback_suffix;
        }
        if src.accelerated_suffix.is_some() {
            self.sources.accelerated_suffix = src.accelerated_suffix;
        }
        if src.manifest.is_some() {
            self.sources.manifest = src.manifest;
        }

        // Compile; flag lists are replaced, not concatenated
        if other.compile.cpp_std.is_some() {
            self.compile.cpp_std = other.compile.cpp_std;
        }
        if other.compile.include_dirs.is_some() {
            self.compile.include_dirs = other.compile.include_dirs;
        }
        if !other.compile.cxx_flags.is_empty() {
            self.compile.cxx_flags = other.compile.cxx_flags;
        }
        if !other.compile.nvcc_flags.is_empty() {
            self.compile.nvcc_flags = other.compile.nvcc_flags;
        }

        // Policy
        let policy = other.policy;
        if policy.verify_device_compiler.is_some() {
            self.policy.verify_device_compiler = policy.verify_device_compiler;
        }
        if policy.suppress_device_warnings.is_some() {
            self.policy.suppress_device_warnings = policy.suppress_device_warnings;
        }
        if policy.probe_timeout_secs.is_some() {
            self.policy.probe_timeout_secs = policy.probe_timeout_secs;
        }
        if policy.assume_runtime.is_some() {
            self.policy.assume_runtime = policy.assume_runtime;
        }

        // Build
        if other.build.command.is_some() {
            self.build.command = other.build.command;
        }
        if other.build.plan_path.is_some() {
            self.build.plan_path = other.build.plan_path;
        }
        if other.build.emit_compile_commands {
            self.build.emit_compile_commands = true;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`extplan.toml`)
/// 2. Global config (`~/.extplan/config.toml`)
/// 3. Defaults
///
/// A broken global config is skipped with a warning; a broken project config
/// is an error, since the project layout cannot be guessed.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global extplan config directory (`~/.extplan`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".extplan"))
}

/// Get the global config path (`~/.extplan/config.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}
