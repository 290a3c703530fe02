//! Snapshot of the host build environment.
//!
//! A [`BuildEnvironment`] is captured once, before planning, by
//! [`crate::planner::capture_environment`]. The planner itself never reads
//! environment variables or probes tools; everything it branches on is here.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Operating-system family, which selects the compiler flag dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// MSVC-style flags, `SPARSEHASH_WINDOWS`
    Windows,
    /// Linux, macOS and other Unix-likes
    Posix,
}

impl OsFamily {
    /// The family of the machine extplan is running on.
    pub fn host() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Posix
        }
    }

    /// Executable name of the device compiler on this family.
    pub fn nvcc_name(&self) -> &'static str {
        match self {
            OsFamily::Windows => "nvcc.exe",
            OsFamily::Posix => "nvcc",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Windows => write!(f, "windows"),
            OsFamily::Posix => write!(f, "posix"),
        }
    }
}

impl std::str::FromStr for OsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win" | "nt" => Ok(OsFamily::Windows),
            "posix" | "linux" | "macos" | "unix" => Ok(OsFamily::Posix),
            _ => Err(format!(
                "invalid os family '{}'; expected 'windows' or 'posix'",
                s
            )),
        }
    }
}

/// What is known about the device compiler driver (`nvcc`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceCompilerStatus {
    /// Not invoked; `path` is where it was found on PATH, if anywhere.
    NotChecked { path: Option<PathBuf> },
    /// `nvcc --version` succeeded.
    Available { path: PathBuf, version: String },
    /// The probe failed; the backend decision degrades unless forced.
    Unavailable { reason: String },
}

impl DeviceCompilerStatus {
    /// Whether the driver was actually invoked successfully.
    pub fn is_verified(&self) -> bool {
        matches!(self, DeviceCompilerStatus::Available { .. })
    }

    /// Path of the driver, when known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DeviceCompilerStatus::NotChecked { path } => path.as_deref(),
            DeviceCompilerStatus::Available { path, .. } => Some(path),
            DeviceCompilerStatus::Unavailable { .. } => None,
        }
    }
}

impl Default for DeviceCompilerStatus {
    fn default() -> Self {
        DeviceCompilerStatus::NotChecked { path: None }
    }
}

/// Immutable snapshot of everything backend selection depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    os_family: OsFamily,
    runtime_available: bool,
    cuda_home: Option<PathBuf>,
    force_accelerated: bool,
    device_compiler: DeviceCompilerStatus,
    /// `PATH` at capture time, kept for probe-failure reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search_path: Option<String>,
}

impl BuildEnvironment {
    /// An environment with no CUDA runtime, toolkit, or override.
    pub fn new(os_family: OsFamily) -> Self {
        BuildEnvironment {
            os_family,
            runtime_available: false,
            cuda_home: None,
            force_accelerated: false,
            device_compiler: DeviceCompilerStatus::default(),
            search_path: None,
        }
    }

    pub fn with_runtime(mut self, available: bool) -> Self {
        self.runtime_available = available;
        self
    }

    pub fn with_cuda_home(mut self, cuda_home: Option<PathBuf>) -> Self {
        self.cuda_home = cuda_home;
        self
    }

    pub fn with_force_accelerated(mut self, force: bool) -> Self {
        self.force_accelerated = force;
        self
    }

    pub fn with_device_compiler(mut self, status: DeviceCompilerStatus) -> Self {
        self.device_compiler = status;
        self
    }

    pub fn with_search_path(mut self, search_path: Option<String>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn os_family(&self) -> OsFamily {
        self.os_family
    }

    /// Whether a CUDA driver/runtime was detected on the host.
    pub fn runtime_available(&self) -> bool {
        self.runtime_available
    }

    /// CUDA toolkit installation directory.
    pub fn cuda_home(&self) -> Option<&Path> {
        self.cuda_home.as_deref()
    }

    /// Whether the caller forced the accelerated backend.
    pub fn force_accelerated(&self) -> bool {
        self.force_accelerated
    }

    pub fn device_compiler(&self) -> &DeviceCompilerStatus {
        &self.device_compiler
    }

    pub fn search_path(&self) -> Option<&str> {
        self.search_path.as_deref()
    }

    /// Runtime present and toolkit located; the precondition for an
    /// unforced accelerated build.
    pub fn toolkit_detected(&self) -> bool {
        self.runtime_available && self.cuda_home.is_some()
    }
}
