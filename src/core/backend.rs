//! Device backend selection result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The compute backend an extension is built for.
///
/// Chosen exactly once per plan; drives the entry point, the kernel set, and
/// which compiler flag lists are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceBackend {
    /// Device-offloaded (CUDA) build; also links the host kernels.
    #[serde(alias = "cuda")]
    Accelerated,
    /// Host-only build, always buildable.
    #[serde(alias = "cpu")]
    Fallback,
}

impl DeviceBackend {
    /// Short tag used in file names and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            DeviceBackend::Accelerated => "cuda",
            DeviceBackend::Fallback => "cpu",
        }
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self, DeviceBackend::Accelerated)
    }
}

impl fmt::Display for DeviceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceBackend::Accelerated => write!(f, "accelerated (cuda)"),
            DeviceBackend::Fallback => write!(f, "fallback (cpu)"),
        }
    }
}

impl std::str::FromStr for DeviceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accelerated" | "cuda" | "gpu" => Ok(DeviceBackend::Accelerated),
            "fallback" | "cpu" => Ok(DeviceBackend::Fallback),
            _ => Err(format!(
                "invalid backend '{}'; expected 'accelerated' (cuda) or 'fallback' (cpu)",
                s
            )),
        }
    }
}
