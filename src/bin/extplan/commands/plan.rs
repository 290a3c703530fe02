//! `extplan plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use extplan::ops::{self, PlanOptions};
use extplan::util::fs::relative_path;
use extplan::util::GlobalContext;

pub fn execute(args: PlanArgs, ctx: &GlobalContext) -> Result<()> {
    let opts = PlanOptions {
        env: args.env.overrides(),
        output: args.output,
        emit_compile_commands: args.emit_compile_commands,
    };

    let outcome = ops::plan(ctx, &opts)?;
    let plan = &outcome.plan;

    if args.json {
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    let root = ctx.project_root();
    match &plan.version {
        Some(version) => println!("Extension:   {} {}", plan.name, version),
        None => println!("Extension:   {}", plan.name),
    }
    println!("Backend:     {} ({})", plan.backend, plan.reason);
    println!("OS family:   {}", plan.os);
    println!("Sources:     {}", plan.sources.len());
    for source in &plan.sources {
        println!("  {}", relative_path(root, source).display());
    }
    for (role, flags) in &plan.extra_compile_args {
        println!("Flags ({}): {}", role, flags.join(" "));
    }
    println!("Fingerprint: {}", &plan.fingerprint[..16]);

    if let Some(path) = &outcome.plan_path {
        println!();
        println!("Plan written to {}", path.display());
    }
    if let Some(path) = &outcome.compile_commands {
        println!("compile_commands.json written to {}", path.display());
    }

    Ok(())
}
