//! Extension plan: the hand-off to the external build.
//!
//! An [`ExtensionPlan`] is everything the downstream extension builder needs
//! to compile one native target, serialized as JSON. It can also be rendered
//! as `compile_commands.json` for IDE integration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{CompileSpec, CompilerRole, Define, DeviceBackend, OsFamily, SourceSet};
use crate::planner::backend::{BackendDecision, DecisionReason};
use crate::util::fs::write_string;
use crate::util::hash::Fingerprint;

/// A complete plan for one extension target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPlan {
    /// Dotted module name of the extension
    pub name: String,

    /// Version read from the version file, if one was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    pub backend: DeviceBackend,

    /// Short device tag (`cuda` or `cpu`)
    pub device: String,

    pub reason: DecisionReason,

    pub os: OsFamily,

    /// Source files, entry point first
    pub sources: Vec<PathBuf>,

    pub include_dirs: Vec<PathBuf>,

    /// `(name, value)` pairs, the shape setuptools expects
    pub define_macros: Vec<(String, Option<String>)>,

    /// Flag lists keyed by compiler role (`cxx`, `nvcc`)
    pub extra_compile_args: BTreeMap<String, Vec<String>>,

    /// SHA-256 over every other field
    pub fingerprint: String,
}

impl ExtensionPlan {
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        decision: BackendDecision,
        os: OsFamily,
        sources: &SourceSet,
        spec: &CompileSpec,
    ) -> Self {
        let mut plan = ExtensionPlan {
            name: name.into(),
            version,
            backend: decision.backend,
            device: decision.backend.tag().to_string(),
            reason: decision.reason,
            os,
            sources: sources.to_vec(),
            include_dirs: spec.include_dirs().to_vec(),
            define_macros: spec
                .defines()
                .iter()
                .map(|d| (d.name.clone(), d.value.clone()))
                .collect(),
            extra_compile_args: spec.extra_compile_args(),
            fingerprint: String::new(),
        };
        plan.fingerprint = plan.compute_fingerprint();
        plan
    }

    fn compute_fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.name)
            .update_opt(self.version.as_deref())
            .update_str(&self.device)
            .update_str(&self.reason.to_string())
            .update_str(&self.os.to_string());

        let sources: Vec<String> = self.sources.iter().map(|p| p.display().to_string()).collect();
        fp.update_str("sources").update_strs(sources.iter().map(String::as_str));

        let includes: Vec<String> = self
            .include_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        fp.update_str("include_dirs")
            .update_strs(includes.iter().map(String::as_str));

        fp.update_str("define_macros");
        for (name, value) in &self.define_macros {
            fp.update_str(name).update_opt(value.as_deref());
        }

        for (role, flags) in &self.extra_compile_args {
            fp.update_str(role).update_strs(flags.iter().map(String::as_str));
        }

        fp.finish()
    }

    /// Whether the stored fingerprint still matches the contents.
    pub fn is_consistent(&self) -> bool {
        self.fingerprint == self.compute_fingerprint()
    }

    /// Flags for one compiler role; empty if the role is unused.
    pub fn flags(&self, role: CompilerRole) -> &[String] {
        self.extra_compile_args
            .get(role.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize extension plan")
    }

    /// Write the plan as JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_string(path, &self.to_json()?)
    }

    /// One `compile_commands.json` entry per source.
    pub fn compile_commands(&self, directory: &Path) -> Vec<CompileCommand> {
        self.sources
            .iter()
            .map(|source| {
                let (program, role) = if is_device_source(source) {
                    ("nvcc", CompilerRole::Nvcc)
                } else {
                    (self.host_compiler(), CompilerRole::Cxx)
                };
                // nvcc takes GCC-style switches on every OS.
                let msvc = role == CompilerRole::Cxx && self.os == OsFamily::Windows;

                let mut arguments = vec![program.to_string()];
                arguments.extend(self.include_args(msvc));
                arguments.extend(self.define_args(msvc));
                arguments.extend(self.flags(role).iter().cloned());
                arguments.push("-c".to_string());
                arguments.push(source.display().to_string());

                CompileCommand {
                    directory: directory.display().to_string(),
                    file: source.display().to_string(),
                    arguments,
                }
            })
            .collect()
    }

    /// Emit compile_commands.json for IDE integration.
    pub fn emit_compile_commands(&self, directory: &Path, path: &Path) -> Result<()> {
        let commands = self.compile_commands(directory);
        let json = serde_json::to_string_pretty(&commands)?;
        write_string(path, &json)
    }

    fn host_compiler(&self) -> &'static str {
        match self.os {
            OsFamily::Windows => "cl",
            OsFamily::Posix => "c++",
        }
    }

    fn include_args(&self, msvc: bool) -> impl Iterator<Item = String> + '_ {
        let prefix = if msvc { "/I" } else { "-I" };
        self.include_dirs
            .iter()
            .map(move |d| format!("{}{}", prefix, d.display()))
    }

    fn define_args(&self, msvc: bool) -> impl Iterator<Item = String> + '_ {
        self.define_macros.iter().map(move |(name, value)| {
            let define = Define {
                name: name.clone(),
                value: value.clone(),
            };
            if msvc {
                define.to_msvc_flag()
            } else {
                define.to_flag()
            }
        })
    }
}

fn is_device_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "cu")
}

/// compile_commands.json entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    pub directory: String,
    pub file: String,
    pub arguments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Define;

    fn sample(backend: DeviceBackend, os: OsFamily) -> ExtensionPlan {
        let mut sources = SourceSet::new(match backend {
            DeviceBackend::Accelerated => "/p/backend/pybind_cuda.cu",
            DeviceBackend::Fallback => "/p/backend/pybind_cpu.cpp",
        });
        sources.push_kernel("/p/backend/conv/conv_cpu.cpp");
        if backend.is_accelerated() {
            sources.push_kernel("/p/backend/conv/conv_cuda.cu");
        }

        let mut spec = CompileSpec::new();
        spec.add_include_dir("/p/backend");
        if os == OsFamily::Windows {
            spec.add_define(Define::flag("SPARSEHASH_WINDOWS"));
        }
        spec.extend_flags(CompilerRole::Cxx, ["-O3"]);
        if backend.is_accelerated() {
            spec.extend_flags(CompilerRole::Nvcc, ["-O3", "-w"]);
        }

        let decision = BackendDecision {
            backend,
            reason: DecisionReason::Forced,
        };
        ExtensionPlan::new(
            "torchsparse.backend",
            Some("2.1.0".into()),
            decision,
            os,
            &sources,
            &spec,
        )
    }

    #[test]
    fn test_plan_json_shape() {
        let plan = sample(DeviceBackend::Accelerated, OsFamily::Windows);
        let value: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();

        assert_eq!(value["name"], "torchsparse.backend");
        assert_eq!(value["backend"], "accelerated");
        assert_eq!(value["device"], "cuda");
        assert_eq!(value["reason"], "forced");
        assert_eq!(value["os"], "windows");
        assert_eq!(value["define_macros"][0][0], "SPARSEHASH_WINDOWS");
        assert!(value["define_macros"][0][1].is_null());
        assert_eq!(value["extra_compile_args"]["nvcc"][1], "-w");
        assert_eq!(value["sources"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_fingerprint_tracks_contents() {
        let plan = sample(DeviceBackend::Fallback, OsFamily::Posix);
        assert!(plan.is_consistent());
        assert_eq!(plan.fingerprint.len(), 64);
        assert_eq!(plan, sample(DeviceBackend::Fallback, OsFamily::Posix));

        let mut tampered = plan.clone();
        tampered.sources.pop();
        assert!(!tampered.is_consistent());

        assert_ne!(
            plan.fingerprint,
            sample(DeviceBackend::Fallback, OsFamily::Windows).fingerprint
        );
    }

    #[test]
    fn test_fingerprint_covers_decision_reason() {
        let plan = sample(DeviceBackend::Accelerated, OsFamily::Posix);
        let mut other = plan.clone();
        other.reason = DecisionReason::ToolkitVerified;
        assert!(!other.is_consistent());

        let rebuilt = ExtensionPlan::new(
            plan.name.clone(),
            plan.version.clone(),
            BackendDecision {
                backend: DeviceBackend::Accelerated,
                reason: DecisionReason::ToolkitVerified,
            },
            OsFamily::Posix,
            &SourceSet::new("/p/backend/pybind_cuda.cu"),
            &CompileSpec::new(),
        );
        let forced = ExtensionPlan::new(
            plan.name.clone(),
            plan.version.clone(),
            BackendDecision {
                backend: DeviceBackend::Accelerated,
                reason: DecisionReason::Forced,
            },
            OsFamily::Posix,
            &SourceSet::new("/p/backend/pybind_cuda.cu"),
            &CompileSpec::new(),
        );
        assert_ne!(rebuilt.fingerprint, forced.fingerprint);
    }

    #[test]
    fn test_compile_commands_pick_compiler_by_extension() {
        let plan = sample(DeviceBackend::Accelerated, OsFamily::Posix);
        let commands = plan.compile_commands(Path::new("/p"));

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].arguments[0], "nvcc");
        assert_eq!(commands[1].arguments[0], "c++");
        assert_eq!(commands[2].arguments[0], "nvcc");
        assert!(commands[0].arguments.contains(&"-w".to_string()));
        assert!(commands[1].arguments.contains(&"-I/p/backend".to_string()));
        assert_eq!(commands[1].arguments.last().unwrap(), &commands[1].file);
    }

    #[test]
    fn test_compile_commands_windows_dialect() {
        let plan = sample(DeviceBackend::Fallback, OsFamily::Windows);
        let commands = plan.compile_commands(Path::new("C:/p"));

        assert_eq!(commands[0].arguments[0], "cl");
        assert!(commands[0]
            .arguments
            .contains(&"/DSPARSEHASH_WINDOWS".to_string()));
    }

    #[test]
    fn test_compile_commands_nvcc_uses_gnu_switches_on_windows() {
        let plan = sample(DeviceBackend::Accelerated, OsFamily::Windows);
        let commands = plan.compile_commands(Path::new("C:/p"));

        let nvcc = &commands[0].arguments;
        assert_eq!(nvcc[0], "nvcc");
        assert!(nvcc.contains(&"-DSPARSEHASH_WINDOWS".to_string()));
        assert!(nvcc.contains(&"-I/p/backend".to_string()));

        let cl = &commands[1].arguments;
        assert!(cl.contains(&"/DSPARSEHASH_WINDOWS".to_string()));
        assert!(cl.contains(&"/I/p/backend".to_string()));
    }
}
