//! compilebox - incremental build adapter for containerized smart-contract compilers
//!
//! This library decides which contract sources need recompilation, invokes an
//! isolated compiler container per file, and normalizes the compiler's
//! scattered output artifacts into a single structured build result.
//!
//! # Core Concepts
//!
//! - **Source discovery**: the contracts directory is expanded into the
//!   concrete set of candidate source files
//! - **Change detection**: a source is stale when it has no prior build
//!   artifact or was modified after it; only stale sources are recompiled
//! - **Invocation**: the compiler runs as an isolated container process with
//!   the host working directory bind-mounted under an identical path string
//! - **Reconciliation**: after every invocation the build directory is
//!   scanned, recognized artifacts are captured into the contract record and
//!   deleted, and everything else is left untouched
//!
//! # Example Usage
//!
//! ```ignore
//! use compilebox::{compile_necessary, BuildConfig, DockerCompiler};
//!
//! async fn rebuild_changed() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BuildConfig::from_env()?;
//!     let compiler = DockerCompiler::new(
//!         config.runtime.clone(),
//!         config.image.clone(),
//!         config.working_dir.clone(),
//!         config.strict,
//!     );
//!
//!     let result = compile_necessary(&compiler, &config).await?;
//!     for (name, record) in &result.contracts {
//!         println!("{}: {} bytes of source", name, record.source.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`discovery`]: contract source resolution
//! - [`staleness`]: change detection against prior artifacts
//! - [`compiler`]: invocation adapter and artifact reconciler
//! - [`pipeline`]: the compile-all / compile-necessary façade

// Public modules
pub mod cli;
pub mod compiler;
pub mod config;
pub mod discovery;
pub mod pipeline;
pub mod staleness;
pub mod util;

// Re-export key types for convenient access
pub use compiler::{
    classify, reconcile, ArtifactError, ArtifactKind, CompilerError, CompilerIdentity,
    ContractCompiler, DockerCompiler, ReconciledArtifacts,
};
pub use config::{BuildConfig, ConfigError};
pub use discovery::{resolve_sources, DiscoveryError};
pub use pipeline::{compile_all, compile_necessary, BuildError, BuildResult, ContractRecord};
pub use staleness::{logical_name, stale_sources, DetectionMode, StalenessError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
