//! Change detection over prior build artifacts
//!
//! Decides which candidate sources need recompilation by comparing each
//! source's modification time against the artifact a previous build left in
//! the build directory. The stale set is derived fresh on every invocation
//! from filesystem timestamps; nothing is persisted and nothing is mutated.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// How the stale set is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// Every candidate is stale (forced full rebuild)
    Full,
    /// Only candidates newer than their prior artifact are stale
    Incremental,
}

/// Errors raised while inspecting source or artifact timestamps
#[derive(Debug, Error)]
pub enum StalenessError {
    /// Source file metadata could not be read
    #[error("Failed to read metadata for {path}: {message}")]
    Metadata { path: PathBuf, message: String },
}

/// Derives the logical name of a contract from its source path.
///
/// The logical name is the file stem: `contracts/token.py` -> `token`.
pub fn logical_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path of the build artifact a prior compilation of `source` would have
/// produced in `build_dir`.
pub fn artifact_path(build_dir: &Path, source: &Path) -> PathBuf {
    build_dir.join(format!("{}.json", logical_name(source)))
}

/// Computes the stale subset of `candidates`.
///
/// In `Incremental` mode a candidate is stale when it has no prior artifact
/// or its modification time is strictly newer than the artifact's; equal
/// timestamps count as current. An empty result is a valid terminal state.
pub fn stale_sources(
    candidates: &[PathBuf],
    build_dir: &Path,
    mode: DetectionMode,
) -> Result<Vec<PathBuf>, StalenessError> {
    if mode == DetectionMode::Full {
        return Ok(candidates.to_vec());
    }

    let mut stale = Vec::new();
    for candidate in candidates {
        if is_stale(candidate, build_dir)? {
            stale.push(candidate.clone());
        }
    }

    debug!(
        candidates = candidates.len(),
        stale = stale.len(),
        "Incremental change detection complete"
    );
    Ok(stale)
}

fn is_stale(source: &Path, build_dir: &Path) -> Result<bool, StalenessError> {
    let artifact = artifact_path(build_dir, source);
    let artifact_meta = match fs::metadata(&artifact) {
        Ok(meta) => meta,
        // Never built.
        Err(_) => {
            trace!(source = %source.display(), "No prior artifact, source is stale");
            return Ok(true);
        }
    };

    let source_meta = fs::metadata(source).map_err(|e| StalenessError::Metadata {
        path: source.to_path_buf(),
        message: e.to_string(),
    })?;

    match (source_meta.modified(), artifact_meta.modified()) {
        (Ok(source_mtime), Ok(artifact_mtime)) => {
            let stale = source_mtime > artifact_mtime;
            trace!(
                source = %source.display(),
                stale,
                "Compared source mtime against artifact"
            );
            Ok(stale)
        }
        // Platform without mtime support: rebuild rather than skip.
        _ => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;

    fn write_pair(dir: &Path, name: &str, source_secs: i64, artifact_secs: i64) -> PathBuf {
        let source = dir.join(format!("{}.py", name));
        let artifact = dir.join(format!("{}.json", name));
        fs::write(&source, "# contract").unwrap();
        fs::write(&artifact, "{}").unwrap();
        set_file_mtime(&source, FileTime::from_unix_time(source_secs, 0)).unwrap();
        set_file_mtime(&artifact, FileTime::from_unix_time(artifact_secs, 0)).unwrap();
        source
    }

    #[test]
    fn test_logical_name_strips_directory_and_extension() {
        assert_eq!(logical_name(Path::new("/proj/contracts/token.py")), "token");
    }

    #[test]
    fn test_full_mode_returns_all_candidates() {
        let candidates = vec![PathBuf::from("/a.py"), PathBuf::from("/b.py")];
        let stale = stale_sources(&candidates, Path::new("/build"), DetectionMode::Full).unwrap();
        assert_eq!(stale, candidates);
    }

    #[test]
    fn test_missing_artifact_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("token.py");
        fs::write(&source, "# contract").unwrap();

        let stale =
            stale_sources(&[source.clone()], dir.path(), DetectionMode::Incremental).unwrap();
        assert_eq!(stale, vec![source]);
    }

    #[test]
    fn test_newer_source_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_pair(dir.path(), "token", 2_000, 1_000);

        let stale =
            stale_sources(&[source.clone()], dir.path(), DetectionMode::Incremental).unwrap();
        assert_eq!(stale, vec![source]);
    }

    #[test]
    fn test_older_source_is_current() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_pair(dir.path(), "token", 1_000, 2_000);

        let stale = stale_sources(&[source], dir.path(), DetectionMode::Incremental).unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn test_equal_timestamps_are_current() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_pair(dir.path(), "token", 1_500, 1_500);

        let stale = stale_sources(&[source], dir.path(), DetectionMode::Incremental).unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn test_only_touched_source_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let touched = write_pair(dir.path(), "token", 3_000, 1_000);
        let current = write_pair(dir.path(), "escrow", 1_000, 2_000);

        let stale = stale_sources(
            &[touched.clone(), current],
            dir.path(),
            DetectionMode::Incremental,
        )
        .unwrap();
        assert_eq!(stale, vec![touched]);
    }
}
