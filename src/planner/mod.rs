//! Build planning.
//!
//! The pipeline is:
//!
//! ```text
//! BuildEnvironment -> DeviceBackend -> { SourceSet, CompileSpec } -> ExtensionPlan
//! ```
//!
//! [`capture_environment`] is the only step with side effects on the host
//! (environment variables, one `nvcc --version` probe). Everything after it
//! is deterministic given the captured environment and the project config.

pub mod backend;
pub mod compile_spec;
pub mod errors;
pub mod plan;
pub mod probe;
pub mod sources;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use backend::{decide_backend, resolve_backend, BackendDecision, DecisionReason};
pub use compile_spec::{resolve_compile_spec, CompileSettings, SPARSEHASH_WINDOWS};
pub use errors::{MissingKind, PlanError, ProbeError};
pub use plan::{CompileCommand, ExtensionPlan};
pub use probe::{
    capture_environment, CaptureOptions, DeviceCompilerProbe, EnvSource, NvccProbe, ProcessEnv,
};
pub use sources::{generate_manifest, resolve_sources, scan_kernels, SourceLayout};

use crate::core::version::read_version;
use crate::core::{
    BuildEnvironment, CompileSpec, CppStandard, DeviceBackend, OsFamily, SourceSet,
};
use crate::util::config::Config;
use crate::util::fs::absolutize;

/// Default source root, relative to the project root.
pub const DEFAULT_SOURCE_ROOT: &str = "torchsparse/backend";

/// Default extension module name.
pub const DEFAULT_EXTENSION_NAME: &str = "torchsparse.backend";

/// Default version file, relative to the project root.
pub const DEFAULT_VERSION_FILE: &str = "torchsparse/version.py";

/// Header-only dependencies bundled with the project.
pub const DEFAULT_THIRD_PARTY_INCLUDES: &[&str] = &[
    "third_party/sparsehash/src",
    "third_party/sparsehash/src/sparsehash/internal",
];

/// Default downstream build command.
pub const DEFAULT_BUILD_COMMAND: &[&str] = &["python", "setup.py", "build_ext", "--inplace"];

/// Default plan output for `extplan build`, relative to the project root.
pub const DEFAULT_PLAN_PATH: &str = "build/extplan/plan.json";

/// Planner behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerPolicy {
    /// Require a successful device compiler probe before choosing the
    /// accelerated backend (ignored under the force override)
    pub verify_device_compiler: bool,
    /// Append `-w` to the device compiler flags
    pub suppress_device_warnings: bool,
    /// Upper bound on the device compiler probe
    pub probe_timeout: Duration,
}

impl Default for PlannerPolicy {
    fn default() -> Self {
        PlannerPolicy {
            verify_device_compiler: true,
            suppress_device_warnings: true,
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Fully resolved planner inputs for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Project root every relative path was resolved against
    pub project_root: PathBuf,
    pub extension_name: String,
    pub version_file: PathBuf,
    /// A missing version file is an error only when it was configured
    pub version_file_required: bool,
    pub layout: SourceLayout,
    pub compile: CompileSettings,
    pub policy: PlannerPolicy,
    /// Overrides host driver detection
    pub assume_runtime: Option<bool>,
    pub build_command: Vec<String>,
    pub plan_path: PathBuf,
    pub emit_compile_commands: bool,
}

impl PlannerConfig {
    /// Defaults for a project rooted at `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let source_root = project_root.join(DEFAULT_SOURCE_ROOT);

        let mut include_dirs = vec![source_root.clone()];
        include_dirs.extend(
            DEFAULT_THIRD_PARTY_INCLUDES
                .iter()
                .map(|dir| project_root.join(dir)),
        );

        PlannerConfig {
            extension_name: DEFAULT_EXTENSION_NAME.to_string(),
            version_file: project_root.join(DEFAULT_VERSION_FILE),
            version_file_required: false,
            layout: SourceLayout::new(source_root),
            compile: CompileSettings {
                include_dirs,
                ..CompileSettings::default()
            },
            policy: PlannerPolicy::default(),
            assume_runtime: None,
            build_command: DEFAULT_BUILD_COMMAND.iter().map(|s| s.to_string()).collect(),
            plan_path: project_root.join(DEFAULT_PLAN_PATH),
            emit_compile_commands: false,
            project_root,
        }
    }

    /// Apply a loaded configuration on top of the defaults.
    ///
    /// Relative paths are resolved against `project_root` lexically; nothing
    /// is checked for existence here.
    pub fn from_config(config: &Config, project_root: &Path) -> Result<Self, PlanError> {
        let mut planner = PlannerConfig::new(project_root);
        let resolve = |p: &Path| absolutize(project_root, p);

        if let Some(name) = &config.extension.name {
            if name.trim().is_empty() {
                return Err(config_error("`extension.name` must not be empty"));
            }
            planner.extension_name = name.clone();
        }
        if let Some(file) = &config.extension.version_file {
            planner.version_file = resolve(file);
            planner.version_file_required = true;
        }

        let sources = &config.sources;
        if let Some(root) = &sources.root {
            planner.layout.root = resolve(root);
            // The source root is always the first include directory.
            planner.compile.include_dirs[0] = planner.layout.root.clone();
        }
        if let Some(entry) = &sources.accelerated_entry {
            planner.layout.accelerated_entry = entry.clone();
        }
        if let Some(entry) = &sources.fallback_entry {
            planner.layout.fallback_entry = entry.clone();
        }
        if let Some(suffix) = &sources.fallback_suffix {
            planner.layout.fallback_suffix = non_empty("sources.fallback_suffix", suffix)?;
        }
        if let Some(suffix) = &sources.accelerated_suffix {
            planner.layout.accelerated_suffix = non_empty("sources.accelerated_suffix", suffix)?;
        }
        if planner.layout.accelerated_entry == planner.layout.fallback_entry {
            return Err(config_error(
                "`sources.accelerated_entry` and `sources.fallback_entry` must differ",
            ));
        }
        planner.layout.manifest = sources.manifest.as_deref().map(resolve);

        let compile = &config.compile;
        if let Some(std) = &compile.cpp_std {
            planner.compile.cpp_std = std
                .parse::<CppStandard>()
                .map_err(|e| config_error(e.to_string()))?;
        }
        if let Some(dirs) = &compile.include_dirs {
            let mut include_dirs = vec![planner.layout.root.clone()];
            include_dirs.extend(dirs.iter().map(|d| resolve(d)));
            include_dirs.dedup();
            planner.compile.include_dirs = include_dirs;
        }
        planner.compile.cxx_flags = compile.cxx_flags.clone();
        planner.compile.nvcc_flags = compile.nvcc_flags.clone();

        let policy = &config.policy;
        if let Some(verify) = policy.verify_device_compiler {
            planner.policy.verify_device_compiler = verify;
        }
        if let Some(suppress) = policy.suppress_device_warnings {
            planner.policy.suppress_device_warnings = suppress;
        }
        if let Some(secs) = policy.probe_timeout_secs {
            if secs == 0 {
                return Err(config_error("`policy.probe_timeout_secs` must be positive"));
            }
            planner.policy.probe_timeout = Duration::from_secs(secs);
        }
        planner.compile.suppress_device_warnings = planner.policy.suppress_device_warnings;
        planner.assume_runtime = policy.assume_runtime;

        let build = &config.build;
        if let Some(command) = &build.command {
            if command.is_empty() {
                return Err(config_error("`build.command` must name a program"));
            }
            planner.build_command = command.clone();
        }
        if let Some(path) = &build.plan_path {
            planner.plan_path = resolve(path);
        }
        planner.emit_compile_commands = build.emit_compile_commands;

        Ok(planner)
    }

    /// Options for [`capture_environment`] derived from this config.
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            assume_runtime: self.assume_runtime,
            verify_device_compiler: self.policy.verify_device_compiler,
            ..CaptureOptions::default()
        }
    }
}

fn config_error(message: impl Into<String>) -> PlanError {
    PlanError::Config {
        path: None,
        message: message.into(),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, PlanError> {
    if value.is_empty() {
        Err(config_error(format!("`{}` must not be empty", key)))
    } else {
        Ok(value.to_string())
    }
}

/// Composes backend selection, source resolution and compile spec assembly.
#[derive(Debug, Clone)]
pub struct BuildPlanner {
    config: PlannerConfig,
}

impl BuildPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        BuildPlanner { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn decide(&self, env: &BuildEnvironment) -> BackendDecision {
        decide_backend(env, &self.config.policy)
    }

    pub fn sources(&self, backend: DeviceBackend) -> Result<SourceSet, PlanError> {
        resolve_sources(backend, &self.config.layout)
    }

    pub fn compile_spec(&self, backend: DeviceBackend, os_family: OsFamily) -> CompileSpec {
        resolve_compile_spec(backend, os_family, &self.config.compile)
    }

    /// Read the extension version.
    ///
    /// Returns `None` when the default version file does not exist.
    pub fn version(&self) -> Result<Option<String>, PlanError> {
        let path = &self.config.version_file;
        if !path.is_file() && !self.config.version_file_required {
            tracing::debug!("no version file at {}", path.display());
            return Ok(None);
        }
        read_version(path).map(Some)
    }

    /// Produce the full plan for `env`.
    pub fn plan(&self, env: &BuildEnvironment) -> Result<ExtensionPlan, PlanError> {
        self.plan_with_sources(env).map(|(plan, _)| plan)
    }

    /// Like [`BuildPlanner::plan`], also returning the resolved source set.
    pub fn plan_with_sources(
        &self,
        env: &BuildEnvironment,
    ) -> Result<(ExtensionPlan, SourceSet), PlanError> {
        let version = self.version()?;
        if let Some(version) = &version {
            tracing::info!("{} version: {}", self.config.extension_name, version);
        }

        let decision = self.decide(env);
        let sources = self.sources(decision.backend)?;
        let spec = self.compile_spec(decision.backend, env.os_family());

        let plan = ExtensionPlan::new(
            &self.config.extension_name,
            version,
            decision,
            env.os_family(),
            &sources,
            &spec,
        );
        Ok((plan, sources))
    }
}
