//! Host environment capture and device-compiler probing.
//!
//! This is the only place extplan reads environment variables or runs
//! external tools while planning. Everything found here is frozen into a
//! [`BuildEnvironment`] before any planning decision is made.
//!
//! CUDA toolkit detection priority:
//! 1. `CUDA_HOME`
//! 2. `CUDA_PATH` (on Windows only if `bin\nvcc.exe` exists beneath it)
//! 3. The directory above the `bin/` holding `nvcc` on PATH
//! 4. `/usr/local/cuda` on POSIX, if it exists

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{BuildEnvironment, DeviceCompilerStatus, OsFamily};
use crate::planner::errors::ProbeError;
use crate::util::process::{combined_output, find_executable, ProcessBuilder};

/// Environment variable that forces the accelerated backend when set to `1`.
pub const FORCE_VAR: &str = "FORCE_CUDA";

/// Source of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Something that can check whether the device compiler driver runs.
pub trait DeviceCompilerProbe {
    /// Run the driver and return the first line of its version banner.
    fn probe(&self, program: &Path) -> Result<String, ProbeError>;
}

/// Probes by running `<program> --version`.
#[derive(Debug, Clone)]
pub struct NvccProbe {
    timeout: Duration,
}

impl NvccProbe {
    pub fn new(timeout: Duration) -> Self {
        NvccProbe { timeout }
    }
}

impl DeviceCompilerProbe for NvccProbe {
    fn probe(&self, program: &Path) -> Result<String, ProbeError> {
        let output = ProcessBuilder::new(program)
            .arg("--version")
            .exec_with_timeout(self.timeout)
            .map_err(|e| ProbeError::Launch {
                program: program.to_path_buf(),
                message: format!("{:#}", e),
            })?;

        let text = combined_output(&output);
        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: program.to_path_buf(),
                code: output.status.code(),
                output: text,
            });
        }

        // nvcc prints a copyright banner; the release line is the useful one.
        let version = text
            .lines()
            .find(|l| l.contains("release"))
            .or_else(|| text.lines().find(|l| !l.trim().is_empty()))
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(version)
    }
}

/// Inputs to environment capture that come from the caller rather than the host.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Plan for this OS family instead of the host's
    pub os_family: Option<OsFamily>,
    /// Force the accelerated backend regardless of `FORCE_CUDA`
    pub force_accelerated: bool,
    /// Skip driver detection and use this answer
    pub assume_runtime: Option<bool>,
    /// Invoke the device compiler when it could matter for the decision
    pub verify_device_compiler: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            os_family: None,
            force_accelerated: false,
            assume_runtime: None,
            verify_device_compiler: true,
        }
    }
}

/// Snapshot the host into a [`BuildEnvironment`].
///
/// Runs the device compiler at most once, and only when verification is
/// enabled and the accelerated backend is a candidate.
pub fn capture_environment(
    env: &dyn EnvSource,
    probe: &dyn DeviceCompilerProbe,
    opts: &CaptureOptions,
) -> BuildEnvironment {
    let os_family = opts.os_family.unwrap_or_else(OsFamily::host);

    let force = opts.force_accelerated || force_requested(env);
    let runtime = opts.assume_runtime.unwrap_or_else(detect_runtime);
    let cuda_home = detect_cuda_home(env, os_family);
    let nvcc_on_path = find_executable("nvcc");

    tracing::debug!(
        "environment: os={}, runtime={}, cuda_home={:?}, force={}, nvcc={:?}",
        os_family,
        runtime,
        cuda_home,
        force,
        nvcc_on_path
    );

    let candidate = force || (runtime && cuda_home.is_some());
    let device_compiler = if opts.verify_device_compiler && candidate {
        let program = nvcc_on_path
            .clone()
            .or_else(|| {
                cuda_home
                    .as_ref()
                    .map(|home| home.join("bin").join(os_family.nvcc_name()))
                    .filter(|p| p.is_file())
            })
            .unwrap_or_else(|| PathBuf::from("nvcc"));

        match probe.probe(&program) {
            Ok(version) => {
                tracing::info!("NVCC version found: {}", version);
                DeviceCompilerStatus::Available {
                    path: program,
                    version,
                }
            }
            Err(e) => {
                tracing::warn!("device compiler probe failed: {}", e);
                DeviceCompilerStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    } else {
        DeviceCompilerStatus::NotChecked { path: nvcc_on_path }
    };

    BuildEnvironment::new(os_family)
        .with_runtime(runtime)
        .with_cuda_home(cuda_home)
        .with_force_accelerated(force)
        .with_device_compiler(device_compiler)
        .with_search_path(env.var("PATH"))
}

/// Whether the force variable is set to exactly `"1"`.
pub fn force_requested(env: &dyn EnvSource) -> bool {
    env.var(FORCE_VAR).as_deref() == Some("1")
}

/// Locate the CUDA toolkit installation.
pub fn detect_cuda_home(env: &dyn EnvSource, os_family: OsFamily) -> Option<PathBuf> {
    if let Some(home) = env.var("CUDA_HOME").filter(|s| !s.is_empty()) {
        return Some(PathBuf::from(home));
    }

    if let Some(path) = env.var("CUDA_PATH").filter(|s| !s.is_empty()) {
        let path = PathBuf::from(path);
        match os_family {
            OsFamily::Windows => {
                if path.join("bin").join("nvcc.exe").is_file() {
                    return Some(path);
                }
                tracing::debug!(
                    "ignoring CUDA_PATH={}: bin\\nvcc.exe not found",
                    path.display()
                );
            }
            OsFamily::Posix => return Some(path),
        }
    }

    if let Some(nvcc) = find_executable("nvcc") {
        if let Some(home) = nvcc.parent().and_then(Path::parent) {
            return Some(home.to_path_buf());
        }
    }

    if os_family == OsFamily::Posix {
        let default = PathBuf::from("/usr/local/cuda");
        if default.is_dir() {
            return Some(default);
        }
    }

    None
}

/// Whether an NVIDIA driver is visible on this host.
pub fn detect_runtime() -> bool {
    if find_executable("nvidia-smi").is_some() {
        return true;
    }
    cfg!(target_os = "linux") && Path::new("/proc/driver/nvidia/version").exists()
}
