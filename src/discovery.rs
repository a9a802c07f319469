//! Contract source discovery
//!
//! Expands the contracts directory into the concrete list of candidate
//! source files, recursively matching the toolchain's extension pattern.
//! The walk order is whatever the directory traversal yields - callers that
//! need determinism must sort explicitly.

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Glob matched against every file under the contracts directory
pub const SOURCE_PATTERN: &str = "**/*.py";

/// Errors raised while resolving the source set
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Contracts directory does not exist
    #[error("Contracts directory not found: {0}")]
    NotFound(PathBuf),

    /// Glob pattern failed to compile or the walk failed
    #[error("Failed to walk {path}: {message}")]
    WalkFailed { path: PathBuf, message: String },
}

/// Resolves all contract sources under `root`, recursively.
///
/// No side effects; returns `DiscoveryError::NotFound` when the root is
/// missing rather than an empty set, so callers can distinguish "no
/// contracts yet" from "wrong directory".
pub fn resolve_sources(root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::NotFound(root.to_path_buf()));
    }

    let mut overrides = OverrideBuilder::new(root);
    overrides
        .add(SOURCE_PATTERN)
        .map_err(|e| DiscoveryError::WalkFailed {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
    let overrides = overrides.build().map_err(|e| DiscoveryError::WalkFailed {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut sources = Vec::new();
    // No standard filters: every file matching the extension pattern counts,
    // including those under hidden directories or listed in ignore files.
    for result in WalkBuilder::new(root)
        .overrides(overrides)
        .standard_filters(false)
        .build()
    {
        let entry = result.map_err(|e| DiscoveryError::WalkFailed {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            trace!(path = %entry.path().display(), "Discovered contract source");
            sources.push(entry.into_path());
        }
    }

    debug!(
        root = %root.display(),
        count = sources.len(),
        "Resolved contract source set"
    );
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        match resolve_sources(&missing) {
            Err(DiscoveryError::NotFound(path)) => assert_eq!(path, missing),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolves_only_matching_extension_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("token.py"), "# contract").unwrap();
        fs::write(dir.path().join("nested/escrow.py"), "# contract").unwrap();
        fs::write(dir.path().join("README.md"), "docs").unwrap();
        fs::write(dir.path().join("nested/notes.txt"), "notes").unwrap();

        let mut sources = resolve_sources(dir.path()).unwrap();
        sources.sort();

        assert_eq!(
            sources,
            vec![
                dir.path().join("nested/escrow.py"),
                dir.path().join("token.py"),
            ]
        );
    }

    #[test]
    fn test_resolves_sources_under_hidden_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".internal")).unwrap();
        fs::write(dir.path().join(".internal/foo.py"), "# contract").unwrap();

        let sources = resolve_sources(dir.path()).unwrap();
        assert_eq!(sources, vec![dir.path().join(".internal/foo.py")]);
    }

    #[test]
    fn test_empty_directory_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_sources(dir.path()).unwrap().is_empty());
    }
}
