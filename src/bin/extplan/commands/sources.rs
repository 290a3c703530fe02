//! `extplan sources` command

use anyhow::Result;

use crate::cli::SourcesArgs;
use extplan::ops;
use extplan::util::fs::{relative_path, to_slash};
use extplan::util::GlobalContext;

pub fn execute(args: SourcesArgs, ctx: &GlobalContext) -> Result<()> {
    let overrides = args.env.overrides();
    let planner = ops::load_planner(ctx, &overrides)?;

    let backend = match args.backend {
        Some(backend) => backend,
        None => planner.decide(&ops::capture(&planner, &overrides)).backend,
    };

    let sources = planner.sources(backend)?;
    tracing::debug!("{} sources for {}", sources.len(), backend);

    for source in sources.iter() {
        if args.absolute {
            println!("{}", source.display());
        } else {
            println!("{}", to_slash(&relative_path(ctx.project_root(), source)));
        }
    }

    Ok(())
}
