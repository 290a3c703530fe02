//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use extplan::core::{DeviceBackend, OsFamily};
use extplan::ops::EnvOverrides;

/// extplan - build planner for native extensions with an optional CUDA backend
#[derive(Parser)]
#[command(name = "extplan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long, global = true, env = "EXTPLAN_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan the extension build
    Plan(PlanArgs),

    /// Show which backend would be built and why
    Backend(BackendArgs),

    /// List the source files of the selected backend
    Sources(SourcesArgs),

    /// Show include dirs, macros and compiler flags
    Flags(FlagsArgs),

    /// Show the detected CUDA environment
    Toolchain(ToolchainArgs),

    /// Generate or validate the explicit source manifest
    Manifest(ManifestArgs),

    /// Plan, then run the downstream extension build
    Build(BuildArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Adjustments to environment detection shared by several commands.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct EnvArgs {
    /// Build the CUDA backend even if no toolkit is detected (same as FORCE_CUDA=1)
    #[arg(long)]
    pub force_accelerated: bool,

    /// Do not run `nvcc --version` before choosing the CUDA backend
    #[arg(long)]
    pub no_verify: bool,

    /// Plan for this OS family instead of the host's (windows, posix)
    #[arg(long, value_name = "OS")]
    pub os: Option<OsFamily>,
}

impl EnvArgs {
    pub fn overrides(&self) -> EnvOverrides {
        EnvOverrides {
            os_family: self.os,
            force_accelerated: self.force_accelerated,
            no_verify: self.no_verify,
        }
    }
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the plan JSON to a file
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Emit compile_commands.json at the project root
    #[arg(long)]
    pub emit_compile_commands: bool,
}

#[derive(Args)]
pub struct BackendArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

#[derive(Args)]
pub struct SourcesArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Resolve sources for this backend instead of detecting it
    #[arg(long)]
    pub backend: Option<DeviceBackend>,

    /// Print absolute paths
    #[arg(long)]
    pub absolute: bool,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// OS family to emit flags for (defaults to the host)
    #[arg(long, value_name = "OS")]
    pub os: Option<OsFamily>,

    /// Backend to emit flags for (defaults to the detected backend)
    #[arg(long)]
    pub backend: Option<DeviceBackend>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ToolchainArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Write the generated manifest to its configured location
    #[arg(long, conflicts_with = "check")]
    pub write: bool,

    /// Validate the existing manifest against the source tree
    #[arg(long)]
    pub check: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Write the plan here instead of the configured location
    #[arg(long, value_name = "PATH")]
    pub plan_path: Option<PathBuf>,

    /// Write the plan and print the build command without running it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
