//! Implementation of `extplan manifest`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::SourceManifest;
use crate::ops::extplan_plan::{load_planner, EnvOverrides};
use crate::planner::sources::{inventory_from_manifest, KernelInventory};
use crate::planner::{generate_manifest, PlannerConfig};
use crate::util::fs::write_string;
use crate::util::GlobalContext;

/// Manifest file name used when none is configured.
pub const DEFAULT_MANIFEST_NAME: &str = "sources.toml";

/// What to do with the source manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestAction {
    /// Generate from the directory and return it without writing
    #[default]
    Print,
    /// Generate from the directory and write it
    Write,
    /// Validate the existing manifest against the directory
    Check,
}

/// Result of a manifest command.
#[derive(Debug, Clone)]
pub struct ManifestOutcome {
    pub path: PathBuf,
    /// Generated manifest (`Print`, `Write`)
    pub manifest: Option<SourceManifest>,
    /// Validated kernels (`Check`)
    pub inventory: Option<KernelInventory>,
}

/// The configured manifest path, or `sources.toml` in the source root.
pub fn manifest_path(config: &PlannerConfig) -> PathBuf {
    config
        .layout
        .manifest
        .clone()
        .unwrap_or_else(|| config.layout.root.join(DEFAULT_MANIFEST_NAME))
}

pub fn manifest(ctx: &GlobalContext, action: ManifestAction) -> Result<ManifestOutcome> {
    let planner = load_planner(ctx, &EnvOverrides::default())?;
    let config = planner.config();
    let path = manifest_path(config);

    match action {
        ManifestAction::Print | ManifestAction::Write => {
            let manifest = generate_manifest(&config.layout)?;
            if action == ManifestAction::Write {
                write_string(&path, &manifest.to_toml()?)?;
                tracing::info!(
                    "wrote {} ({} fallback, {} accelerated)",
                    path.display(),
                    manifest.fallback.len(),
                    manifest.accelerated.len()
                );
                if config.layout.manifest.is_none() {
                    tracing::warn!(
                        "manifest is not used until `[sources] manifest` is set in extplan.toml"
                    );
                }
            }
            Ok(ManifestOutcome {
                path,
                manifest: Some(manifest),
                inventory: None,
            })
        }
        ManifestAction::Check => {
            let inventory = inventory_from_manifest(&config.layout, &path)?;
            Ok(ManifestOutcome {
                path,
                manifest: None,
                inventory: Some(inventory),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::PlanError;
    use crate::test_support::{config_templates, ProjectFixture};

    fn context(project: &ProjectFixture) -> GlobalContext {
        GlobalContext::with_cwd(project.path().to_path_buf()).with_global_config(None)
    }

    #[test]
    fn test_write_then_check() {
        let project = ProjectFixture::torchsparse().with_config(
            &config_templates::with_manifest("torchsparse/backend/sources.toml"),
        );
        let ctx = context(&project);

        let written = manifest(&ctx, ManifestAction::Write).unwrap();
        assert_eq!(
            written.path,
            project.backend_root().join(DEFAULT_MANIFEST_NAME)
        );
        assert_eq!(written.manifest.unwrap().fallback.len(), 3);

        let checked = manifest(&ctx, ManifestAction::Check).unwrap();
        let inventory = checked.inventory.unwrap();
        assert_eq!(inventory.fallback.len(), 3);
        assert_eq!(inventory.accelerated.len(), 3);
    }

    #[test]
    fn test_check_reports_new_kernel() {
        let project = ProjectFixture::torchsparse();
        let ctx = context(&project);
        manifest(&ctx, ManifestAction::Write).unwrap();

        let _project = project.with_file("torchsparse/backend/pool/pool_cuda.cu", "");
        let err = manifest(&ctx, ManifestAction::Check).unwrap_err();

        match err.downcast_ref::<PlanError>() {
            Some(PlanError::ManifestMismatch { unlisted, .. }) => {
                assert_eq!(unlisted, &[PathBuf::from("pool").join("pool_cuda.cu")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_print_does_not_write() {
        let project = ProjectFixture::torchsparse();
        let outcome = manifest(&context(&project), ManifestAction::Print).unwrap();

        assert!(!outcome.path.exists());
        assert_eq!(outcome.manifest.unwrap().accelerated.len(), 3);
    }
}
