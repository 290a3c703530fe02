//! Implementation of `extplan plan` and the shared planning setup used by
//! the other commands.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::{BuildEnvironment, OsFamily};
use crate::planner::{
    capture_environment, BuildPlanner, ExtensionPlan, NvccProbe, PlannerConfig, ProcessEnv,
};
use crate::util::GlobalContext;

/// Command-line adjustments to environment capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvOverrides {
    /// Plan for this OS family instead of the host's
    pub os_family: Option<OsFamily>,

    /// Force the accelerated backend (same as `FORCE_CUDA=1`)
    pub force_accelerated: bool,

    /// Do not run the device compiler before choosing the accelerated backend
    pub no_verify: bool,
}

impl EnvOverrides {
    fn apply(&self, config: &mut PlannerConfig) {
        if self.no_verify {
            config.policy.verify_device_compiler = false;
        }
    }
}

/// Options for the plan command.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub env: EnvOverrides,

    /// Write the plan JSON here
    pub output: Option<PathBuf>,

    /// Emit compile_commands.json at the project root
    pub emit_compile_commands: bool,
}

/// Result of a planning run.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: ExtensionPlan,
    pub environment: BuildEnvironment,
    /// Where the plan JSON was written, if anywhere
    pub plan_path: Option<PathBuf>,
    /// Where compile_commands.json was written, if anywhere
    pub compile_commands: Option<PathBuf>,
}

/// Load project configuration and build a planner with `overrides` applied.
pub fn load_planner(ctx: &GlobalContext, overrides: &EnvOverrides) -> Result<BuildPlanner> {
    let config = ctx.load_config()?;
    let mut planner_config = PlannerConfig::from_config(&config, ctx.project_root())?;
    overrides.apply(&mut planner_config);

    tracing::debug!(
        "project root: {}, source root: {}",
        planner_config.project_root.display(),
        planner_config.layout.root.display()
    );

    Ok(BuildPlanner::new(planner_config))
}

/// Snapshot the host for `planner`.
pub fn capture(planner: &BuildPlanner, overrides: &EnvOverrides) -> BuildEnvironment {
    let config = planner.config();
    let mut opts = config.capture_options();
    opts.os_family = overrides.os_family;
    opts.force_accelerated = overrides.force_accelerated;

    let probe = NvccProbe::new(config.policy.probe_timeout);
    capture_environment(&ProcessEnv, &probe, &opts)
}

/// Plan the extension build and write the requested outputs.
pub fn plan(ctx: &GlobalContext, opts: &PlanOptions) -> Result<PlanOutcome> {
    let planner = load_planner(ctx, &opts.env)?;
    let environment = capture(&planner, &opts.env);
    let plan = planner.plan(&environment)?;

    let plan_path = match &opts.output {
        Some(path) => {
            let path = ctx.cwd().join(path);
            plan.write(&path)
                .with_context(|| format!("failed to write plan to {}", path.display()))?;
            tracing::info!("wrote plan to {}", path.display());
            Some(path)
        }
        None => None,
    };

    let compile_commands = if opts.emit_compile_commands || planner.config().emit_compile_commands
    {
        let root = &planner.config().project_root;
        let path = root.join("compile_commands.json");
        plan.emit_compile_commands(root, &path)?;
        tracing::info!("wrote {}", path.display());
        Some(path)
    } else {
        None
    };

    Ok(PlanOutcome {
        plan,
        environment,
        plan_path,
        compile_commands,
    })
}
