//! Compile specification assembly.
//!
//! Flag tables per OS family. Everything here is a pure function of its
//! arguments: no environment variables, no filesystem.

use std::path::PathBuf;

use crate::core::{CompileSpec, CompilerRole, CppStandard, Define, DeviceBackend, OsFamily};

/// Macro that switches the bundled sparsehash headers to their MSVC code paths.
pub const SPARSEHASH_WINDOWS: &str = "SPARSEHASH_WINDOWS";

/// Static compile inputs taken from project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSettings {
    /// Include directories, already resolved against the project root
    pub include_dirs: Vec<PathBuf>,
    pub cpp_std: CppStandard,
    /// Appended after the built-in primary compiler flags
    pub cxx_flags: Vec<String>,
    /// Appended after the built-in device compiler flags
    pub nvcc_flags: Vec<String>,
    /// Append `-w` to the device compiler flags
    pub suppress_device_warnings: bool,
}

impl Default for CompileSettings {
    fn default() -> Self {
        CompileSettings {
            include_dirs: Vec::new(),
            cpp_std: CppStandard::default(),
            cxx_flags: Vec::new(),
            nvcc_flags: Vec::new(),
            suppress_device_warnings: true,
        }
    }
}

/// Build the compile spec for a backend on an OS family.
///
/// The device compiler list exists only for the accelerated backend.
pub fn resolve_compile_spec(
    backend: DeviceBackend,
    os_family: OsFamily,
    settings: &CompileSettings,
) -> CompileSpec {
    let mut spec = CompileSpec::new();

    for dir in &settings.include_dirs {
        spec.add_include_dir(dir.clone());
    }

    if os_family == OsFamily::Windows {
        spec.add_define(Define::flag(SPARSEHASH_WINDOWS));
    }

    spec.extend_flags(CompilerRole::Cxx, primary_flags(os_family, settings.cpp_std));
    spec.extend_flags(CompilerRole::Cxx, settings.cxx_flags.iter().cloned());

    if backend.is_accelerated() {
        let mut nvcc = device_flags(os_family, settings.cpp_std);
        if settings.suppress_device_warnings {
            nvcc.push("-w".to_string());
        }
        nvcc.extend(settings.nvcc_flags.iter().cloned());
        spec.extend_flags(CompilerRole::Nvcc, nvcc);
    }

    spec
}

fn primary_flags(os_family: OsFamily, std: CppStandard) -> Vec<String> {
    match os_family {
        OsFamily::Windows => vec![
            "/MD".to_string(),
            "/O2".to_string(),
            "/EHsc".to_string(),
            std.msvc_flag(),
            "/Zc:__cplusplus".to_string(),
        ],
        OsFamily::Posix => vec![
            "-g".to_string(),
            "-O3".to_string(),
            "-fopenmp".to_string(),
            std.gnu_flag(),
        ],
    }
}

fn device_flags(os_family: OsFamily, std: CppStandard) -> Vec<String> {
    match os_family {
        // nvcc forwards /MD to cl through -Xcompiler.
        OsFamily::Windows => vec![
            "-O3".to_string(),
            "--use-local-env".to_string(),
            std.gnu_flag(),
            "-Xcompiler".to_string(),
            "/MD".to_string(),
        ],
        OsFamily::Posix => vec!["-O3".to_string(), std.gnu_flag()],
    }
}
