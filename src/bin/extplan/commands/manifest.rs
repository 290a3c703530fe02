//! `extplan manifest` command

use anyhow::Result;

use crate::cli::ManifestArgs;
use extplan::ops::{self, ManifestAction};
use extplan::util::GlobalContext;

pub fn execute(args: ManifestArgs, ctx: &GlobalContext) -> Result<()> {
    let action = if args.write {
        ManifestAction::Write
    } else if args.check {
        ManifestAction::Check
    } else {
        ManifestAction::Print
    };

    let outcome = ops::manifest(ctx, action)?;

    match action {
        ManifestAction::Print => {
            if let Some(manifest) = &outcome.manifest {
                print!("{}", manifest.to_toml()?);
            }
        }
        ManifestAction::Write => {
            println!("Wrote {}", outcome.path.display());
        }
        ManifestAction::Check => {
            if let Some(inventory) = &outcome.inventory {
                println!(
                    "{} is up to date ({} fallback, {} accelerated)",
                    outcome.path.display(),
                    inventory.fallback.len(),
                    inventory.accelerated.len()
                );
            }
        }
    }

    Ok(())
}
