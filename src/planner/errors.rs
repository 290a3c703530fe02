//! Planning error types and diagnostics.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::DeviceBackend;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// What kind of required file was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    /// The backend source directory
    SourceRoot,
    /// The backend's entry-point file
    EntryPoint,
    /// A file listed in the source manifest
    ManifestEntry,
    /// The source manifest itself
    Manifest,
    /// A source that disappeared between planning and building
    PlannedSource,
}

impl fmt::Display for MissingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingKind::SourceRoot => write!(f, "source root"),
            MissingKind::EntryPoint => write!(f, "entry point"),
            MissingKind::ManifestEntry => write!(f, "manifest entry"),
            MissingKind::Manifest => write!(f, "source manifest"),
            MissingKind::PlannedSource => write!(f, "planned source"),
        }
    }
}

/// Error while planning or handing off an extension build.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum PlanError {
    #[error("{kind} not found: {}", .path.display())]
    #[diagnostic(
        code(extplan::sources::missing),
        help("check `[sources] root` and the entry point names in extplan.toml")
    )]
    MissingSource {
        kind: MissingKind,
        path: PathBuf,
        backend: Option<DeviceBackend>,
    },

    #[error("source manifest {} is out of date", .manifest.display())]
    #[diagnostic(
        code(extplan::sources::manifest_mismatch),
        help("run `extplan manifest --write` to regenerate it")
    )]
    ManifestMismatch {
        manifest: PathBuf,
        /// Kernel files on disk that the manifest does not list
        unlisted: Vec<PathBuf>,
        /// Listed files whose suffix does not match their section
        misplaced: Vec<(PathBuf, String)>,
    },

    #[error("no single-quoted version string in {}", .path.display())]
    #[diagnostic(code(extplan::version::parse))]
    VersionParse { path: PathBuf },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(extplan::config))]
    Config {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("failed to read {}: {message}", .path.display())]
    #[diagnostic(code(extplan::io))]
    Io { path: PathBuf, message: String },

    #[error("downstream build `{command}` failed{}", exit_code_suffix(.code))]
    #[diagnostic(code(extplan::build::failed))]
    DownstreamBuild { command: String, code: Option<i32> },
}

fn exit_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

impl PlanError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PlanError::MissingSource {
                kind,
                path,
                backend,
            } => {
                let mut diag =
                    Diagnostic::error(format!("{} not found", kind)).with_location(path);

                if let Some(backend) = backend {
                    diag = diag.with_context(format!("selected backend: {}", backend));
                }

                match kind {
                    MissingKind::SourceRoot | MissingKind::EntryPoint => {
                        diag.with_suggestion(suggestions::CHECK_SOURCE_ROOT)
                    }
                    MissingKind::ManifestEntry | MissingKind::Manifest => {
                        diag.with_suggestion(suggestions::REGENERATE_MANIFEST)
                    }
                    MissingKind::PlannedSource => {
                        diag.with_suggestion("Re-run `extplan plan` after the source tree settles")
                    }
                }
            }

            PlanError::ManifestMismatch {
                manifest,
                unlisted,
                misplaced,
            } => {
                let mut diag = Diagnostic::error("source manifest is out of date")
                    .with_location(manifest);

                for path in unlisted {
                    diag = diag.with_context(format!("not listed: {}", path.display()));
                }
                for (path, section) in misplaced {
                    diag = diag.with_context(format!(
                        "listed under `{}` with the wrong suffix: {}",
                        section,
                        path.display()
                    ));
                }

                diag.with_suggestion(suggestions::REGENERATE_MANIFEST)
            }

            PlanError::VersionParse { path } => {
                Diagnostic::error("could not parse the extension version")
                    .with_location(path)
                    .with_suggestion(suggestions::VERSION_FORMAT)
            }

            PlanError::Config { path, message } => {
                let diag = Diagnostic::error(format!("invalid configuration: {}", message));
                match path {
                    Some(path) => diag.with_location(path),
                    None => diag,
                }
            }

            PlanError::Io { path, message } => {
                Diagnostic::error(format!("failed to read file: {}", message)).with_location(path)
            }

            PlanError::DownstreamBuild { command, code } => {
                Diagnostic::error(format!("extension build failed{}", exit_code_suffix(code)))
                    .with_context(format!("command: {}", command))
                    .with_suggestion(suggestions::BUILD_FAILED)
            }
        }
    }
}

/// The device compiler could not be invoked.
///
/// Recoverable: it degrades backend selection instead of aborting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("failed to run `{}`: {message}", .program.display())]
    Launch { program: PathBuf, message: String },

    #[error("`{}` exited with code {code:?}", .program.display())]
    Failed {
        program: PathBuf,
        code: Option<i32>,
        output: String,
    },
}
