//! `extplan toolchain` command

use anyhow::Result;

use crate::cli::ToolchainArgs;
use extplan::core::DeviceCompilerStatus;
use extplan::ops;
use extplan::planner::probe::FORCE_VAR;
use extplan::util::diagnostic::{suggestions, Diagnostic};
use extplan::util::GlobalContext;

pub fn execute(args: ToolchainArgs, ctx: &GlobalContext) -> Result<()> {
    let overrides = args.env.overrides();
    let planner = ops::load_planner(ctx, &overrides)?;
    let env = ops::capture(&planner, &overrides);

    println!("Environment:");
    println!();
    println!("  OS family:    {}", env.os_family());
    println!(
        "  CUDA runtime: {}",
        if env.runtime_available() {
            "available"
        } else {
            "not available"
        }
    );
    match env.cuda_home() {
        Some(home) => println!("  CUDA_HOME:    {}", home.display()),
        None => println!("  CUDA_HOME:    not found"),
    }

    match env.device_compiler() {
        DeviceCompilerStatus::Available { path, version } => {
            println!("  nvcc:         {}", path.display());
            println!("                {}", version);
        }
        DeviceCompilerStatus::NotChecked { path: Some(path) } => {
            println!("  nvcc:         {} (not checked)", path.display());
        }
        DeviceCompilerStatus::NotChecked { path: None } => {
            println!("  nvcc:         not found");
        }
        DeviceCompilerStatus::Unavailable { reason } => {
            println!("  nvcc:         unusable ({})", reason);
        }
    }

    if env.force_accelerated() {
        println!("  {}:   1", FORCE_VAR);
    }

    let decision = planner.decide(&env);
    println!();
    println!("Backend: {} ({})", decision.backend, decision.reason);

    if env.toolkit_detected() && !decision.backend.is_accelerated() {
        eprintln!();
        eprint!(
            "{}",
            Diagnostic::warning("CUDA toolkit found but nvcc could not be run")
                .with_suggestion(suggestions::INSTALL_CUDA)
                .format(false)
        );
    }

    Ok(())
}
