//! Build pipeline orchestration
//!
//! Drives the whole flow: resolve the source set, detect stale sources,
//! compile each one sequentially through the invocation adapter, reconcile
//! the build directory after every invocation, and fold the per-contract
//! records into a single [`BuildResult`].
//!
//! Compilation is strictly sequential. The build directory is a single
//! shared resource with no per-file isolation, so exactly one invocation
//! owns it at a time and must hand it back reconciled; reconciliation runs
//! on the failure path too, before the error propagates.

use crate::compiler::{artifacts, CompilerError, CompilerIdentity, ContractCompiler};
use crate::compiler::{ArtifactError, ReconciledArtifacts};
use crate::config::BuildConfig;
use crate::discovery::{resolve_sources, DiscoveryError};
use crate::staleness::{artifact_path, stale_sources, DetectionMode, StalenessError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by the build pipeline
#[derive(Debug, Error)]
pub enum BuildError {
    /// Source set resolution failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Change detection failed
    #[error(transparent)]
    Staleness(#[from] StalenessError),

    /// A compiler invocation failed
    #[error(transparent)]
    Compiler(#[from] CompilerError),

    /// Build directory reconciliation failed
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Two sources resolve to the same logical name
    #[error(
        "Contract name collision: '{name}' is produced by both {first} and {second}; \
         rename one of the source files"
    )]
    NameCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A source file could not be read back for the record
    #[error("Failed to read contract source {path}: {message}")]
    SourceRead { path: PathBuf, message: String },

    /// A contract record could not be persisted
    #[error("Failed to persist contract record {path}: {message}")]
    Persist { path: PathBuf, message: String },

    /// The compiler exited cleanly but emitted no compiled program
    #[error("Compiler produced no compiled program for {source_path} ('{name}')")]
    MissingProgram { name: String, source_path: PathBuf },
}

/// One successfully compiled contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Logical name, derived from the source file's basename
    pub name: String,
    /// Source file the record was compiled from
    pub source_path: PathBuf,
    /// Raw source text, read from `source_path` (not from the compiler's echo)
    pub source: String,
    /// Compiled program, canonical JSON
    pub compiled_program: serde_json::Value,
    /// Initial storage text, when the compiler emitted one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_storage: Option<String>,
    /// Compiler that produced this record
    pub compiler: CompilerIdentity,
}

/// Terminal, caller-owned result of one build request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    /// Compiled contracts keyed by logical name
    pub contracts: BTreeMap<String, ContractRecord>,
    /// Source paths processed, in compilation order
    pub source_paths: Vec<PathBuf>,
    /// Compiler identity for this request
    pub compiler: CompilerIdentity,
}

impl BuildResult {
    fn empty(compiler: CompilerIdentity) -> Self {
        Self {
            contracts: BTreeMap::new(),
            source_paths: Vec::new(),
            compiler,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Compiles every contract source under the configured contracts directory.
pub async fn compile_all<C>(compiler: &C, config: &BuildConfig) -> Result<BuildResult, BuildError>
where
    C: ContractCompiler + ?Sized,
{
    run(compiler, config, DetectionMode::Full).await
}

/// Compiles only the contract sources that changed since the last build.
///
/// An empty stale set is a valid terminal state: the result is empty and no
/// subprocess is spawned, not even the preflight check.
pub async fn compile_necessary<C>(
    compiler: &C,
    config: &BuildConfig,
) -> Result<BuildResult, BuildError>
where
    C: ContractCompiler + ?Sized,
{
    run(compiler, config, DetectionMode::Incremental).await
}

async fn run<C>(
    compiler: &C,
    config: &BuildConfig,
    mode: DetectionMode,
) -> Result<BuildResult, BuildError>
where
    C: ContractCompiler + ?Sized,
{
    let sources = resolve_sources(&config.contracts_dir)?;
    let stale = stale_sources(&sources, &config.build_dir, mode)?;

    if stale.is_empty() {
        info!("All contracts up to date, nothing to compile");
        return Ok(BuildResult::empty(compiler.identity()));
    }

    check_collisions(&stale)?;
    compiler.preflight().await?;

    let mut result = BuildResult::empty(compiler.identity());
    for source in stale {
        info!(contract = %source.display(), "Compiling contract");
        let record = compile_one(compiler, config, &source).await?;
        persist_record(&config.build_dir, &record).await?;
        aggregate(&mut result.contracts, record)?;
        result.source_paths.push(source);
    }

    debug!(compiled = result.contracts.len(), "Build request complete");
    Ok(result)
}

/// Rejects a stale set in which two sources resolve to the same logical
/// name, before anything is compiled or persisted. Detecting the collision
/// only while folding records would leave the first record's persisted
/// artifact behind, and the next incremental run would then consider both
/// colliding sources current and never surface the error again.
fn check_collisions(stale: &[PathBuf]) -> Result<(), BuildError> {
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    for source in stale {
        let name = crate::staleness::logical_name(source);
        if let Some(first) = seen.get(&name) {
            return Err(BuildError::NameCollision {
                name,
                first: first.to_path_buf(),
                second: source.clone(),
            });
        }
        seen.insert(name, source);
    }
    Ok(())
}

/// Compiles a single source file and reconciles the build directory.
///
/// The invocation holds exclusive logical ownership of the build directory;
/// reconciliation runs whether the invocation succeeded or not, so the
/// directory is handed back clean on every exit path. A compile failure
/// takes precedence over a reconciliation failure.
async fn compile_one<C>(
    compiler: &C,
    config: &BuildConfig,
    source: &Path,
) -> Result<ContractRecord, BuildError>
where
    C: ContractCompiler + ?Sized,
{
    let invoked = compiler
        .compile(source, config.entry_point.as_deref(), &config.build_dir)
        .await;
    let reconciled = match &invoked {
        Ok(_) => artifacts::reconcile(&config.build_dir),
        // The failed invocation may still have scattered partial output.
        Err(CompilerError::CompileFailed { .. }) => {
            artifacts::reconcile(&config.build_dir).or(Ok(ReconciledArtifacts::default()))
        }
        Err(_) => Ok(ReconciledArtifacts::default()),
    };

    let name = invoked?;
    let reconciled = reconciled?;

    let source_text =
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| BuildError::SourceRead {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?;

    let compiled_program = reconciled
        .compiled_program
        .ok_or_else(|| BuildError::MissingProgram {
            name: name.clone(),
            source_path: source.to_path_buf(),
        })?;

    Ok(ContractRecord {
        name,
        source_path: source.to_path_buf(),
        source: source_text,
        compiled_program,
        initial_storage: reconciled.initial_storage,
        compiler: compiler.identity(),
    })
}

/// Persists a contract record as `<build_dir>/<name>.json`.
///
/// The persisted record is what incremental change detection compares
/// source timestamps against on the next invocation. Its name does not
/// match any recognized artifact kind, so the reconciler leaves it alone.
async fn persist_record(build_dir: &Path, record: &ContractRecord) -> Result<(), BuildError> {
    let path = artifact_path(build_dir, &record.source_path);
    let json = serde_json::to_string_pretty(record).map_err(|e| BuildError::Persist {
        path: path.clone(),
        message: e.to_string(),
    })?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| BuildError::Persist {
            path: path.clone(),
            message: e.to_string(),
        })
}

/// Folds one record into the result mapping, failing fast on a logical-name
/// collision instead of silently overwriting the earlier record.
fn aggregate(
    contracts: &mut BTreeMap<String, ContractRecord>,
    record: ContractRecord,
) -> Result<(), BuildError> {
    if let Some(existing) = contracts.get(&record.name) {
        return Err(BuildError::NameCollision {
            name: record.name.clone(),
            first: existing.source_path.clone(),
            second: record.source_path,
        });
    }
    contracts.insert(record.name.clone(), record);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, source_path: &str) -> ContractRecord {
        ContractRecord {
            name: name.to_string(),
            source_path: PathBuf::from(source_path),
            source: "# contract".to_string(),
            compiled_program: serde_json::json!([]),
            initial_storage: None,
            compiler: CompilerIdentity::from_image("smartpy/cli:latest"),
        }
    }

    #[test]
    fn test_aggregate_keys_by_logical_name() {
        let mut contracts = BTreeMap::new();
        aggregate(&mut contracts, record("token", "/proj/contracts/token.py")).unwrap();
        aggregate(&mut contracts, record("escrow", "/proj/contracts/escrow.py")).unwrap();
        assert_eq!(contracts.len(), 2);
        assert!(contracts.contains_key("token"));
        assert!(contracts.contains_key("escrow"));
    }

    #[test]
    fn test_aggregate_rejects_name_collision() {
        let mut contracts = BTreeMap::new();
        aggregate(&mut contracts, record("token", "/proj/a/token.py")).unwrap();

        match aggregate(&mut contracts, record("token", "/proj/b/token.py")) {
            Err(BuildError::NameCollision { name, first, second }) => {
                assert_eq!(name, "token");
                assert_eq!(first, PathBuf::from("/proj/a/token.py"));
                assert_eq!(second, PathBuf::from("/proj/b/token.py"));
            }
            other => panic!("Expected NameCollision, got {:?}", other),
        }
        // The earlier record is preserved.
        assert_eq!(
            contracts["token"].source_path,
            PathBuf::from("/proj/a/token.py")
        );
    }

    #[test]
    fn test_check_collisions_rejects_duplicate_logical_names() {
        let stale = vec![
            PathBuf::from("/proj/a/foo.py"),
            PathBuf::from("/proj/contracts/bar.py"),
            PathBuf::from("/proj/b/foo.py"),
        ];
        match check_collisions(&stale) {
            Err(BuildError::NameCollision { name, first, second }) => {
                assert_eq!(name, "foo");
                assert_eq!(first, PathBuf::from("/proj/a/foo.py"));
                assert_eq!(second, PathBuf::from("/proj/b/foo.py"));
            }
            other => panic!("Expected NameCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_check_collisions_accepts_distinct_names() {
        let stale = vec![
            PathBuf::from("/proj/contracts/token.py"),
            PathBuf::from("/proj/contracts/escrow.py"),
        ];
        assert!(check_collisions(&stale).is_ok());
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let original = ContractRecord {
            initial_storage: Some("(Pair 0 {})".to_string()),
            ..record("token", "/proj/contracts/token.py")
        };
        let json = serde_json::to_string(&original).unwrap();
        let decoded: ContractRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }
}
