//! Backend selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{BuildEnvironment, DeviceBackend, DeviceCompilerStatus};
use crate::planner::PlannerPolicy;

/// Why a backend was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Force override set; toolkit state not consulted
    Forced,
    /// Force override set although the device compiler probe failed
    ForcedDespiteProbeFailure,
    /// Runtime and toolkit found, device compiler verified
    ToolkitVerified,
    /// Runtime and toolkit found, verification disabled by policy
    ToolkitDetected,
    /// No CUDA runtime/driver on the host
    NoRuntime,
    /// Runtime present but no toolkit installation located
    NoToolkit,
    /// Toolkit located but the device compiler could not be run
    DeviceCompilerUnavailable,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DecisionReason::Forced => "accelerated build forced by FORCE_CUDA=1",
            DecisionReason::ForcedDespiteProbeFailure => {
                "accelerated build forced by FORCE_CUDA=1 although nvcc could not be run"
            }
            DecisionReason::ToolkitVerified => "CUDA runtime and toolkit found, nvcc verified",
            DecisionReason::ToolkitDetected => "CUDA runtime and toolkit found",
            DecisionReason::NoRuntime => "no CUDA runtime available",
            DecisionReason::NoToolkit => "CUDA runtime available but CUDA_HOME not found",
            DecisionReason::DeviceCompilerUnavailable => "nvcc could not be run",
        };
        f.write_str(text)
    }
}

/// A backend together with the rule that selected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDecision {
    pub backend: DeviceBackend,
    pub reason: DecisionReason,
}

impl BackendDecision {
    fn new(backend: DeviceBackend, reason: DecisionReason) -> Self {
        BackendDecision { backend, reason }
    }
}

/// Choose the backend, first matching rule wins:
///
/// 1. Force override: accelerated, unconditionally.
/// 2. Runtime available, toolkit located and (if the policy verifies) the
///    device compiler ran: accelerated.
/// 3. Otherwise: fallback.
pub fn decide_backend(env: &BuildEnvironment, policy: &PlannerPolicy) -> BackendDecision {
    let probe_failed = matches!(
        env.device_compiler(),
        DeviceCompilerStatus::Unavailable { .. }
    );

    let decision = if env.force_accelerated() {
        if probe_failed {
            BackendDecision::new(
                DeviceBackend::Accelerated,
                DecisionReason::ForcedDespiteProbeFailure,
            )
        } else {
            BackendDecision::new(DeviceBackend::Accelerated, DecisionReason::Forced)
        }
    } else if !env.runtime_available() {
        BackendDecision::new(DeviceBackend::Fallback, DecisionReason::NoRuntime)
    } else if env.cuda_home().is_none() {
        BackendDecision::new(DeviceBackend::Fallback, DecisionReason::NoToolkit)
    } else if !policy.verify_device_compiler {
        BackendDecision::new(DeviceBackend::Accelerated, DecisionReason::ToolkitDetected)
    } else if env.device_compiler().is_verified() {
        BackendDecision::new(DeviceBackend::Accelerated, DecisionReason::ToolkitVerified)
    } else {
        BackendDecision::new(
            DeviceBackend::Fallback,
            DecisionReason::DeviceCompilerUnavailable,
        )
    };

    match decision.reason {
        DecisionReason::ForcedDespiteProbeFailure => {
            tracing::warn!("{}", probe_failure_report(env));
            tracing::warn!("FORCE_CUDA=1 is set; attempting a CUDA build anyway");
        }
        DecisionReason::DeviceCompilerUnavailable => {
            tracing::warn!("{}", probe_failure_report(env));
            tracing::warn!("falling back to CPU build");
        }
        _ => {}
    }

    tracing::info!("backend: {} ({})", decision.backend, decision.reason);

    decision
}

/// Where the device compiler was looked for, for support triage.
fn probe_failure_report(env: &BuildEnvironment) -> String {
    let home = env
        .cuda_home()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());
    let path = env.search_path().unwrap_or("<unset>");
    format!("nvcc not usable (CUDA_HOME: {}, PATH: {})", home, path)
}

/// Choose the backend for `env`.
pub fn resolve_backend(env: &BuildEnvironment, policy: &PlannerPolicy) -> DeviceBackend {
    decide_backend(env, policy).backend
}
