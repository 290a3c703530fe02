//! `extplan build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use extplan::ops::{self, BuildOptions, PLAN_ENV_VAR};
use extplan::util::GlobalContext;

pub fn execute(args: BuildArgs, ctx: &GlobalContext) -> Result<()> {
    let opts = BuildOptions {
        env: args.env.overrides(),
        plan_path: args.plan_path,
        dry_run: args.dry_run,
    };

    let outcome = ops::build(ctx, &opts)?;

    if outcome.executed {
        println!(
            "Built {} ({}, {} sources)",
            outcome.plan.name,
            outcome.plan.backend,
            outcome.plan.sources.len()
        );
    } else {
        println!("Plan written to {}", outcome.plan_path.display());
        println!(
            "Would run: {}={} {}",
            PLAN_ENV_VAR,
            outcome.plan_path.display(),
            outcome.command
        );
    }

    Ok(())
}
