//! Source set resolution.
//!
//! Kernel membership comes from one of two places:
//! - filename suffixes under the source root (default), or
//! - an explicit [`SourceManifest`], validated against the directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::{DeviceBackend, SourceManifest, SourceSet};
use crate::planner::errors::{MissingKind, PlanError};
use crate::util::fs::{glob_files, is_glob_pattern, relative_path, to_slash, walk_files};

/// Where backend sources live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    /// Backend source root
    pub root: PathBuf,
    /// Entry point of the accelerated backend, relative to `root`
    pub accelerated_entry: String,
    /// Entry point of the fallback backend, relative to `root`
    pub fallback_entry: String,
    /// Suffix of host kernels, linked into every build
    pub fallback_suffix: String,
    /// Suffix of device kernels
    pub accelerated_suffix: String,
    /// Explicit source manifest; suffix scanning is used when absent
    pub manifest: Option<PathBuf>,
}

impl SourceLayout {
    /// Layout with the default naming convention.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SourceLayout {
            root: root.into(),
            accelerated_entry: "pybind_cuda.cu".to_string(),
            fallback_entry: "pybind_cpu.cpp".to_string(),
            fallback_suffix: "_cpu.cpp".to_string(),
            accelerated_suffix: "_cuda.cu".to_string(),
            manifest: None,
        }
    }

    pub fn with_entries(
        mut self,
        accelerated: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        self.accelerated_entry = accelerated.into();
        self.fallback_entry = fallback.into();
        self
    }

    pub fn with_manifest(mut self, manifest: Option<PathBuf>) -> Self {
        self.manifest = manifest;
        self
    }

    /// The entry-point file for a backend.
    pub fn entry_path(&self, backend: DeviceBackend) -> PathBuf {
        match backend {
            DeviceBackend::Accelerated => self.root.join(&self.accelerated_entry),
            DeviceBackend::Fallback => self.root.join(&self.fallback_entry),
        }
    }

    fn is_entry(&self, path: &Path) -> bool {
        path == self.entry_path(DeviceBackend::Accelerated)
            || path == self.entry_path(DeviceBackend::Fallback)
    }

    fn is_fallback_kernel(&self, path: &Path) -> bool {
        file_name_ends_with(path, &self.fallback_suffix)
    }

    fn is_accelerated_kernel(&self, path: &Path) -> bool {
        file_name_ends_with(path, &self.accelerated_suffix)
    }
}

fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}

/// Kernel files of both backends found under a source root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelInventory {
    pub fallback: Vec<PathBuf>,
    pub accelerated: Vec<PathBuf>,
}

/// Resolve the files compiled for `backend`.
///
/// The entry point comes first; fallback kernels are always included,
/// accelerated kernels only for the accelerated backend. Fails with
/// [`PlanError::MissingSource`] if the root or the entry point is absent;
/// no partial set is ever returned.
pub fn resolve_sources(backend: DeviceBackend, layout: &SourceLayout) -> Result<SourceSet, PlanError> {
    ensure_root(layout, Some(backend))?;

    let entry = layout.entry_path(backend);
    if !entry.is_file() {
        return Err(PlanError::MissingSource {
            kind: MissingKind::EntryPoint,
            path: entry,
            backend: Some(backend),
        });
    }

    let inventory = match &layout.manifest {
        Some(manifest) => inventory_from_manifest(layout, manifest)?,
        None => scan_kernels(layout)?,
    };

    let mut sources = SourceSet::new(entry);
    for path in inventory.fallback {
        sources.push_kernel(path);
    }
    if backend.is_accelerated() {
        for path in inventory.accelerated {
            sources.push_kernel(path);
        }
    }

    tracing::debug!(
        "resolved {} source(s) for the {} backend",
        sources.len(),
        backend.tag()
    );

    Ok(sources)
}

fn ensure_root(layout: &SourceLayout, backend: Option<DeviceBackend>) -> Result<(), PlanError> {
    if layout.root.is_dir() {
        Ok(())
    } else {
        Err(PlanError::MissingSource {
            kind: MissingKind::SourceRoot,
            path: layout.root.clone(),
            backend,
        })
    }
}

/// Classify every file under the root by suffix, ignoring entry points.
pub fn scan_kernels(layout: &SourceLayout) -> Result<KernelInventory, PlanError> {
    ensure_root(layout, None)?;

    let files = walk_files(&layout.root).map_err(|e| PlanError::Io {
        path: layout.root.clone(),
        message: format!("{:#}", e),
    })?;

    let mut inventory = KernelInventory::default();
    for path in files {
        if layout.is_entry(&path) {
            continue;
        }
        if layout.is_fallback_kernel(&path) {
            inventory.fallback.push(path);
        } else if layout.is_accelerated_kernel(&path) {
            inventory.accelerated.push(path);
        } else {
            tracing::trace!("not a kernel: {}", path.display());
        }
    }

    Ok(inventory)
}

/// Expand and validate an explicit manifest against the directory contents.
///
/// Listed files must exist, carry their section's suffix and not be an
/// entry point; every suffix-matching file on disk must be listed. Glob
/// matches that hit an entry point are skipped.
pub fn inventory_from_manifest(
    layout: &SourceLayout,
    manifest_path: &Path,
) -> Result<KernelInventory, PlanError> {
    ensure_root(layout, None)?;

    if !manifest_path.is_file() {
        return Err(PlanError::MissingSource {
            kind: MissingKind::Manifest,
            path: manifest_path.to_path_buf(),
            backend: None,
        });
    }
    let manifest = SourceManifest::load(manifest_path)?;

    let fallback = expand_entries(layout, &manifest.fallback)?;
    let accelerated = expand_entries(layout, &manifest.accelerated)?;

    let mut misplaced = Vec::new();
    for path in &fallback {
        if layout.is_entry(path) || !layout.is_fallback_kernel(path) {
            misplaced.push((relative_path(&layout.root, path), "fallback".to_string()));
        }
    }
    for path in &accelerated {
        if layout.is_entry(path) || !layout.is_accelerated_kernel(path) {
            misplaced.push((relative_path(&layout.root, path), "accelerated".to_string()));
        }
    }

    let listed: BTreeSet<&PathBuf> = fallback.iter().chain(accelerated.iter()).collect();
    let on_disk = scan_kernels(layout)?;
    let unlisted: Vec<PathBuf> = on_disk
        .fallback
        .iter()
        .chain(on_disk.accelerated.iter())
        .filter(|p| !listed.contains(p))
        .map(|p| relative_path(&layout.root, p))
        .collect();

    if !unlisted.is_empty() || !misplaced.is_empty() {
        return Err(PlanError::ManifestMismatch {
            manifest: manifest_path.to_path_buf(),
            unlisted,
            misplaced,
        });
    }

    Ok(KernelInventory {
        fallback,
        accelerated,
    })
}

fn expand_entries(layout: &SourceLayout, entries: &[String]) -> Result<Vec<PathBuf>, PlanError> {
    let root = layout.root.as_path();
    let mut paths = Vec::new();

    for entry in entries {
        if is_glob_pattern(entry) {
            let matches = glob_files(root, std::slice::from_ref(entry)).map_err(|e| {
                PlanError::Config {
                    path: None,
                    message: format!("{:#}", e),
                }
            })?;
            if matches.is_empty() {
                return Err(PlanError::MissingSource {
                    kind: MissingKind::ManifestEntry,
                    path: root.join(entry),
                    backend: None,
                });
            }
            paths.extend(matches.into_iter().filter(|p| !layout.is_entry(p)));
        } else {
            let path = root.join(entry);
            if !path.is_file() {
                return Err(PlanError::MissingSource {
                    kind: MissingKind::ManifestEntry,
                    path,
                    backend: None,
                });
            }
            paths.push(path);
        }
    }

    paths.dedup();
    Ok(paths)
}

/// Build a manifest listing every kernel currently found by suffix.
pub fn generate_manifest(layout: &SourceLayout) -> Result<SourceManifest, PlanError> {
    let inventory = scan_kernels(layout)?;
    let rel = |paths: &[PathBuf]| -> Vec<String> {
        paths
            .iter()
            .map(|p| to_slash(&relative_path(&layout.root, p)))
            .collect()
    };

    Ok(SourceManifest {
        fallback: rel(&inventory.fallback),
        accelerated: rel(&inventory.accelerated),
    })
}
