//! Implementation of `extplan build`.
//!
//! Plans, writes the plan JSON, and hands it to the downstream build command
//! through `EXTPLAN_PLAN`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::ops::extplan_plan::{capture, load_planner, EnvOverrides};
use crate::planner::{ExtensionPlan, MissingKind, PlanError};
use crate::util::process::ProcessBuilder;
use crate::util::GlobalContext;

/// Environment variable carrying the plan path to the downstream build.
pub const PLAN_ENV_VAR: &str = "EXTPLAN_PLAN";

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub env: EnvOverrides,

    /// Override the configured plan location
    pub plan_path: Option<PathBuf>,

    /// Write the plan and print the command without running it
    pub dry_run: bool,
}

/// Result of a build run.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub plan: ExtensionPlan,
    pub plan_path: PathBuf,
    /// The downstream command as it was (or would have been) run
    pub command: String,
    /// Whether the downstream command was actually run
    pub executed: bool,
}

/// Plan and run the downstream extension build.
pub fn build(ctx: &GlobalContext, opts: &BuildOptions) -> Result<BuildOutcome> {
    let planner = load_planner(ctx, &opts.env)?;
    let config = planner.config();
    let environment = capture(&planner, &opts.env);
    let (plan, sources) = planner.plan_with_sources(&environment)?;

    // Sources may have moved since resolution; never hand off a stale set.
    if let Some(missing) = sources.missing().first() {
        return Err(PlanError::MissingSource {
            kind: MissingKind::PlannedSource,
            path: missing.to_path_buf(),
            backend: Some(plan.backend),
        }
        .into());
    }

    let plan_path = match &opts.plan_path {
        Some(path) => ctx.cwd().join(path),
        None => config.plan_path.clone(),
    };
    plan.write(&plan_path)
        .with_context(|| format!("failed to write plan to {}", plan_path.display()))?;

    if config.emit_compile_commands {
        let root = &config.project_root;
        plan.emit_compile_commands(root, &root.join("compile_commands.json"))?;
    }

    let Some((program, args)) = config.build_command.split_first() else {
        return Err(PlanError::Config {
            path: None,
            message: "`build.command` must name a program".to_string(),
        }
        .into());
    };

    let cmd = ProcessBuilder::new(program)
        .args(args)
        .cwd(&config.project_root)
        .env(PLAN_ENV_VAR, plan_path.display().to_string());
    let command = cmd.display_command();

    if opts.dry_run {
        tracing::info!("dry run, not running `{}`", command);
        return Ok(BuildOutcome {
            plan,
            plan_path,
            command,
            executed: false,
        });
    }

    tracing::info!(
        "building {} ({} sources, {})",
        plan.name,
        plan.sources.len(),
        plan.backend
    );
    tracing::debug!("running `{}`", command);

    let status = cmd.status()?;
    if !status.success() {
        return Err(PlanError::DownstreamBuild {
            command,
            code: status.code(),
        }
        .into());
    }

    Ok(BuildOutcome {
        plan,
        plan_path,
        command,
        executed: true,
    })
}
