//! `extplan backend` command

use anyhow::Result;

use crate::cli::BackendArgs;
use extplan::ops;
use extplan::util::GlobalContext;

pub fn execute(args: BackendArgs, ctx: &GlobalContext) -> Result<()> {
    let overrides = args.env.overrides();
    let planner = ops::load_planner(ctx, &overrides)?;
    let env = ops::capture(&planner, &overrides);

    let decision = planner.decide(&env);

    println!("{}", decision.backend.tag());
    eprintln!("  {}: {}", decision.backend, decision.reason);

    Ok(())
}
