//! The ordered set of files compiled into the extension.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Entry point plus kernel files.
///
/// Never empty (the entry point is mandatory) and never contains the same
/// path twice. Iteration yields the entry point first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSet {
    entry: PathBuf,
    kernels: Vec<PathBuf>,
    #[serde(skip)]
    seen: HashSet<PathBuf>,
}

impl SourceSet {
    /// Start a set with its entry point.
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        let entry = entry.into();
        let mut seen = HashSet::new();
        seen.insert(entry.clone());

        SourceSet {
            entry,
            kernels: Vec::new(),
            seen,
        }
    }

    /// Add a kernel file. Returns `false` if the path is already present.
    pub fn push_kernel(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.kernels.push(path);
        true
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn kernels(&self) -> &[PathBuf] {
        &self.kernels
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// All paths, entry point first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.entry.as_path()).chain(self.kernels.iter().map(PathBuf::as_path))
    }

    /// All paths as owned values, entry point first.
    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.iter().map(Path::to_path_buf).collect()
    }

    pub fn len(&self) -> usize {
        1 + self.kernels.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Paths that do not exist on disk right now.
    ///
    /// Must be empty before the set is handed to the downstream build.
    pub fn missing(&self) -> Vec<&Path> {
        self.iter().filter(|p| !p.is_file()).collect()
    }

    /// The set's paths, ignoring order.
    pub fn as_unordered(&self) -> HashSet<&Path> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entry_first_and_no_duplicates() {
        let mut set = SourceSet::new("backend/pybind_cuda.cu");
        assert!(set.push_kernel("backend/conv/conv_cpu.cpp"));
        assert!(!set.push_kernel("backend/conv/conv_cpu.cpp"));
        assert!(!set.push_kernel("backend/pybind_cuda.cu"));

        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert_eq!(
            set.to_vec(),
            vec![
                PathBuf::from("backend/pybind_cuda.cu"),
                PathBuf::from("backend/conv/conv_cpu.cpp"),
            ]
        );
    }

    #[test]
    fn test_missing_reports_absent_files() {
        let tmp = TempDir::new().unwrap();
        let entry = tmp.path().join("pybind_cpu.cpp");
        std::fs::write(&entry, "").unwrap();

        let mut set = SourceSet::new(&entry);
        set.push_kernel(tmp.path().join("gone_cpu.cpp"));

        assert_eq!(set.missing(), vec![tmp.path().join("gone_cpu.cpp").as_path()]);
    }
}
