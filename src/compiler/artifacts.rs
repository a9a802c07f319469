//! Build artifact reconciliation
//!
//! After each compiler invocation the build directory contains a handful of
//! loosely-typed output files. This module classifies them against a closed
//! set of recognized artifact kinds, captures the structured fields a
//! contract record needs, and deletes every recognized file so the directory
//! is clean before the next invocation starts. Unrecognized files are left
//! untouched; in particular the persisted `<name>.json` contract records
//! written by the pipeline do not match any recognized kind.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Source file copy echoed by the compiler
const SOURCE_ECHO_SUFFIX: &str = ".py";
/// JSON-encoded compiled program
const COMPILED_PROGRAM_SUFFIX: &str = "_compiled.json";
/// Raw program output
const RAW_OUTPUT_SUFFIX: &str = ".tz";
/// Raw output carrying the contract's initial storage
const STORAGE_INIT_SUFFIX: &str = "_storage_init.tz";

/// Recognized artifact kinds, in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Echo of the input source; deleted, never captured
    SourceEcho,
    /// JSON-encoded compiled program; parsed and captured
    CompiledJson,
    /// Raw program output; captured only for the initial-storage file
    RawOutput,
}

/// Errors raised while reconciling the build directory
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Build directory could not be listed
    #[error("Failed to read build directory {path}: {message}")]
    ReadDir { path: PathBuf, message: String },

    /// A recognized artifact could not be read or deleted
    #[error("Failed to reconcile artifact {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The compiled program artifact was not valid JSON
    #[error("Malformed compiled program {path}: {message}")]
    MalformedProgram { path: PathBuf, message: String },
}

/// Structured fields extracted from one invocation's output files
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconciledArtifacts {
    /// Parsed compiled program, canonical once re-serialized
    pub compiled_program: Option<Value>,
    /// Verbatim text of the initial-storage output, when the compiler emitted one
    pub initial_storage: Option<String>,
}

/// Classifies a file name against the recognized artifact kinds.
///
/// Checked in fixed priority order; `None` means the file is not ours to
/// touch.
pub fn classify(file_name: &str) -> Option<ArtifactKind> {
    if file_name.ends_with(SOURCE_ECHO_SUFFIX) {
        Some(ArtifactKind::SourceEcho)
    } else if file_name.ends_with(COMPILED_PROGRAM_SUFFIX) {
        Some(ArtifactKind::CompiledJson)
    } else if file_name.ends_with(RAW_OUTPUT_SUFFIX) {
        Some(ArtifactKind::RawOutput)
    } else {
        None
    }
}

/// Reconciles the build directory after one invocation.
///
/// Guarantees that no file of a recognized kind remains afterwards,
/// whether or not its content was captured.
pub fn reconcile(build_dir: &Path) -> Result<ReconciledArtifacts, ArtifactError> {
    let entries = fs::read_dir(build_dir).map_err(|e| ArtifactError::ReadDir {
        path: build_dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut reconciled = ReconciledArtifacts::default();

    for entry in entries {
        let entry = entry.map_err(|e| ArtifactError::ReadDir {
            path: build_dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let Some(kind) = classify(&file_name) else {
            trace!(file = %file_name, "Leaving unrecognized build output untouched");
            continue;
        };

        match kind {
            ArtifactKind::SourceEcho => {}
            ArtifactKind::CompiledJson => {
                let text = read_artifact(&path)?;
                let program: Value =
                    serde_json::from_str(&text).map_err(|e| ArtifactError::MalformedProgram {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                reconciled.compiled_program = Some(program);
            }
            ArtifactKind::RawOutput => {
                if file_name.ends_with(STORAGE_INIT_SUFFIX) {
                    reconciled.initial_storage = Some(read_artifact(&path)?);
                }
            }
        }

        trace!(file = %file_name, kind = ?kind, "Consuming build artifact");
        fs::remove_file(&path).map_err(|e| ArtifactError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
    }

    debug!(
        build_dir = %build_dir.display(),
        has_program = reconciled.compiled_program.is_some(),
        has_storage = reconciled.initial_storage.is_some(),
        "Reconciled build directory"
    );
    Ok(reconciled)
}

fn read_artifact(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
