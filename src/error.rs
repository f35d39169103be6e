//! Domain-specific error types for the packaging pipeline.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`BuildError`]) while the command layer at the CLI boundary converts them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! PackError
//! ├── Config(ConfigError)       — manifest loading and resolution
//! ├── Changelog(ChangelogError) — history derivation, prompts, checkpoints
//! └── Build(BuildError)         — collaborator processes and staged tree work
//! ```
//!
//! [`CleanupWarning`] sits outside the hierarchy: cleanup conditions are
//! logged at warn severity and never abort the run.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Top-level error type for the packaging pipeline.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at the CLI command boundary.
#[derive(Error, Debug)]
pub enum PackError {
    /// Manifest loading or resolution error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Changelog derivation, prompting, or checkpoint error.
    #[error("Changelog error: {0}")]
    Changelog(#[from] ChangelogError),

    /// Collaborator process or staged filesystem error.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),
}

/// Errors that arise from manifest loading and resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The manifest file does not exist where expected; almost always means
    /// the tool was started outside a packaged project.
    #[error("No debpack configuration file found; are you in the right source folder?")]
    ManifestNotFound,

    /// The manifest exists but could not be read.
    #[error("could not read manifest {path}: {source}")]
    ManifestRead {
        /// Path to the manifest file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest is not parseable JSON.
    #[error("manifest is not valid JSON: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// The manifest parsed but its root is not a JSON object.
    #[error("manifest root must be a JSON object")]
    ManifestShape,

    /// A required key is absent and has no default.
    #[error("{key} cannot be empty")]
    MissingKey {
        /// The manifest key that was absent.
        key: &'static str,
    },

    /// A key's value failed its validation predicate.
    #[error("{key} failed validation (offending value: \"{value}\")")]
    Validation {
        /// The manifest key that failed.
        key: &'static str,
        /// Rendering of the offending value.
        value: String,
    },

    /// The source directory name cannot serve as a package name.
    #[error("cannot derive a package name from source folder {}", path.display())]
    PackageName {
        /// The source root in question.
        path: PathBuf,
    },

    /// An environment probe (git identity, host architecture) failed while
    /// computing a default.
    #[error(transparent)]
    Probe(#[from] BuildError),
}

/// Errors that arise from changelog generation.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// Auto and boundary modes need a git repository in the source root.
    #[error("git features not available as a .git folder does not exist in this directory")]
    GitUnavailable,

    /// A requested commit boundary (or recorded checkpoint) is not present
    /// in the available history.
    #[error("could not find commit {0}")]
    CommitNotFound(String),

    /// Reading interactive changelog input failed.
    #[error("could not read changelog input: {0}")]
    Prompt(#[source] std::io::Error),

    /// A checkpoint file could not be read or written.
    #[error("checkpoint file {path}: {source}")]
    Checkpoint {
        /// The checkpoint file in question.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No per-user state directory could be determined for checkpoints.
    #[error("could not determine a per-user state directory")]
    StateDir,

    /// A version-control collaborator invocation failed.
    #[error(transparent)]
    Vcs(#[from] BuildError),
}

/// Errors that arise from collaborator processes and staging/assembly work.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A collaborator process exited non-zero. Its stderr has already been
    /// logged at error severity by the executor.
    #[error("{program} failed (exit {code}): {stderr}")]
    CommandFailed {
        /// The program that failed.
        program: String,
        /// Exit code, `-1` when terminated by a signal.
        code: i32,
        /// Trimmed stderr output.
        stderr: String,
    },

    /// A collaborator process could not be started at all.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// The program that could not be started.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A required collaborator executable is not on PATH.
    #[error("{0} is not available on PATH")]
    MissingTool(&'static str),

    /// A filesystem step of staging or assembly failed.
    #[error("{action}: {source}")]
    Io {
        /// What was being attempted.
        action: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A staging precondition does not hold (bad copy source and the like).
    #[error("{0}")]
    Stage(String),
}

impl BuildError {
    /// Filesystem failure with the attempted action and path as context.
    pub(crate) fn io(action: &str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action: format!("{action} {}", path.display()),
            source,
        }
    }
}

/// Non-fatal conditions met during the guaranteed cleanup phase.
///
/// Never propagated; the orchestrator logs these at warn severity and
/// carries on.
#[derive(Error, Debug)]
pub enum CleanupWarning {
    /// The staging root was already gone when cleanup tried to remove it.
    #[error("cleanup: staging root {} was already gone", path.display())]
    StagingGone {
        /// The staging root path.
        path: PathBuf,
    },

    /// A cleanup target could not be removed.
    #[error("cleanup: could not remove {}: {source}", path.display())]
    Remove {
        /// The path that resisted removal.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
