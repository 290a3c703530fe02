//! `extplan flags` command

use anyhow::Result;

use crate::cli::FlagsArgs;
use extplan::core::{CompilerRole, OsFamily};
use extplan::ops::{self, EnvOverrides};
use extplan::util::GlobalContext;

pub fn execute(args: FlagsArgs, ctx: &GlobalContext) -> Result<()> {
    let overrides = EnvOverrides {
        os_family: args.os,
        ..EnvOverrides::default()
    };
    let planner = ops::load_planner(ctx, &overrides)?;
    let os_family = args.os.unwrap_or_else(OsFamily::host);

    // Only detect the backend when it was not given explicitly.
    let backend = match args.backend {
        Some(backend) => backend,
        None => planner.decide(&ops::capture(&planner, &overrides)).backend,
    };

    let spec = planner.compile_spec(backend, os_family);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&spec)?);
        return Ok(());
    }

    println!("# Compile flags for {} on {}:", backend, os_family);

    println!("include_dirs:");
    for dir in spec.include_dirs() {
        println!("  {}", dir.display());
    }

    println!("define_macros:");
    for define in spec.defines() {
        match &define.value {
            Some(value) => println!("  {}={}", define.name, value),
            None => println!("  {}", define.name),
        }
    }

    for role in [CompilerRole::Cxx, CompilerRole::Nvcc] {
        let flags = spec.flags(role);
        if flags.is_empty() {
            continue;
        }
        println!("{}:", role);
        println!("  {}", flags.join(" "));
    }

    Ok(())
}
