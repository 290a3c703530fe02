//! Test utilities and mocks for extplan unit tests.
//!
//! The device compiler probe is the only external process the planner runs,
//! so it is the one interface that gets a mock. Source trees are built on a
//! real temporary directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use extplan::test_support::{MockProbe, SourceTree};
//!
//! #[test]
//! fn test_example() {
//!     let tree = SourceTree::new().file("pybind_cpu.cpp").file("conv/conv_cpu.cpp");
//!     let probe = MockProbe::available("Cuda compilation tools, release 12.4");
//!
//!     // Use the tree and probe in tests...
//! }
//! ```

pub mod fixtures;

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

pub use fixtures::*;

use crate::planner::{DeviceCompilerProbe, ProbeError};

/// Canned result of running the device compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockProcessOutput {
    /// The program could not be started
    NotFound,
    /// The program ran with this exit status and combined output
    Exited { status: i32, output: String },
}

impl MockProcessOutput {
    /// Successful run with the given output.
    pub fn success(output: impl Into<String>) -> Self {
        MockProcessOutput::Exited {
            status: 0,
            output: output.into(),
        }
    }

    /// Failed run with the given status and output.
    pub fn failure(status: i32, output: impl Into<String>) -> Self {
        MockProcessOutput::Exited {
            status,
            output: output.into(),
        }
    }
}

/// Device compiler probe that replays a canned output and counts calls.
#[derive(Debug)]
pub struct MockProbe {
    output: MockProcessOutput,
    calls: Cell<usize>,
    programs: RefCell<Vec<PathBuf>>,
}

impl MockProbe {
    pub fn new(output: MockProcessOutput) -> Self {
        MockProbe {
            output,
            calls: Cell::new(0),
            programs: RefCell::new(Vec::new()),
        }
    }

    /// A probe whose program is missing.
    pub fn failing() -> Self {
        Self::new(MockProcessOutput::NotFound)
    }

    /// A probe that reports the given version banner.
    pub fn available(version: impl Into<String>) -> Self {
        Self::new(MockProcessOutput::success(version))
    }

    /// Number of times the probe ran.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Programs the probe was asked to run, in order.
    pub fn programs(&self) -> Vec<PathBuf> {
        self.programs.borrow().clone()
    }
}

impl DeviceCompilerProbe for MockProbe {
    fn probe(&self, program: &Path) -> Result<String, ProbeError> {
        self.calls.set(self.calls.get() + 1);
        self.programs.borrow_mut().push(program.to_path_buf());

        match &self.output {
            MockProcessOutput::NotFound => Err(ProbeError::Launch {
                program: program.to_path_buf(),
                message: "No such file or directory (os error 2)".to_string(),
            }),
            MockProcessOutput::Exited { status: 0, output } => Ok(output
                .lines()
                .find(|l| l.contains("release"))
                .unwrap_or("")
                .trim()
                .to_string()),
            MockProcessOutput::Exited { status, output } => Err(ProbeError::Failed {
                program: program.to_path_buf(),
                code: Some(*status),
                output: output.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_probe_counts_calls() {
        let probe = MockProbe::available(nvcc_output::version("12.4"));

        let version = probe.probe(Path::new("nvcc")).unwrap();
        assert!(version.contains("release 12.4"));
        probe.probe(Path::new("/usr/local/cuda/bin/nvcc")).unwrap();

        assert_eq!(probe.calls(), 2);
        assert_eq!(probe.programs()[1], PathBuf::from("/usr/local/cuda/bin/nvcc"));
    }

    #[test]
    fn test_mock_probe_failure_modes() {
        assert!(matches!(
            MockProbe::failing().probe(Path::new("nvcc")),
            Err(ProbeError::Launch { .. })
        ));
        assert!(matches!(
            MockProbe::new(MockProcessOutput::failure(1, "nvcc fatal")).probe(Path::new("nvcc")),
            Err(ProbeError::Failed { code: Some(1), .. })
        ));
    }
}
