//! Compiler invocation parameters for the extension target.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which compiler a flag list is meant for.
///
/// Serialized with the keys the Python extension builders expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompilerRole {
    /// Host C++ compiler (`cl`, `g++`, `clang++`)
    #[serde(rename = "cxx")]
    Cxx,
    /// Device compiler driver (`nvcc`)
    #[serde(rename = "nvcc")]
    Nvcc,
}

impl CompilerRole {
    pub fn key(&self) -> &'static str {
        match self {
            CompilerRole::Cxx => "cxx",
            CompilerRole::Nvcc => "nvcc",
        }
    }
}

impl fmt::Display for CompilerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A preprocessor macro, `NAME` or `NAME=value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    /// A macro without a value.
    pub fn flag(name: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: None,
        }
    }

    /// A macro with a value.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Render as a GCC-style `-D` argument.
    pub fn to_flag(&self) -> String {
        self.to_flag_with_prefix("-D")
    }

    /// Render as an MSVC-style `/D` argument.
    pub fn to_msvc_flag(&self) -> String {
        self.to_flag_with_prefix("/D")
    }

    fn to_flag_with_prefix(&self, prefix: &str) -> String {
        match &self.value {
            Some(value) => format!("{}{}={}", prefix, self.name, value),
            None => format!("{}{}", prefix, self.name),
        }
    }
}

/// Include directories, macros and per-compiler flags for one extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileSpec {
    include_dirs: Vec<PathBuf>,
    defines: Vec<Define>,
    flags: BTreeMap<CompilerRole, Vec<String>>,
}

impl CompileSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an include directory unless it is already listed.
    pub fn add_include_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.include_dirs.contains(&dir) {
            self.include_dirs.push(dir);
        }
    }

    /// Add a macro. A later definition of the same name replaces the earlier one.
    pub fn add_define(&mut self, define: Define) {
        if let Some(existing) = self.defines.iter_mut().find(|d| d.name == define.name) {
            *existing = define;
        } else {
            self.defines.push(define);
        }
    }

    /// Append flags to a compiler's list, creating it if needed.
    pub fn extend_flags<I, S>(&mut self, role: CompilerRole, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags
            .entry(role)
            .or_default()
            .extend(flags.into_iter().map(Into::into));
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    pub fn defines(&self) -> &[Define] {
        &self.defines
    }

    pub fn has_define(&self, name: &str) -> bool {
        self.defines.iter().any(|d| d.name == name)
    }

    /// Flags for one compiler; empty when that compiler is not used.
    pub fn flags(&self, role: CompilerRole) -> &[String] {
        self.flags.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Compilers that have a flag list, in role order.
    pub fn roles(&self) -> impl Iterator<Item = CompilerRole> + '_ {
        self.flags.keys().copied()
    }

    /// Flags keyed by role name, as handed to the extension builder.
    pub fn extra_compile_args(&self) -> BTreeMap<String, Vec<String>> {
        self.flags
            .iter()
            .map(|(role, flags)| (role.key().to_string(), flags.clone()))
            .collect()
    }
}
