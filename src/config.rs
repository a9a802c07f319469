//! Configuration management for compilebox
//!
//! This module provides the configuration object shared by every stage of the
//! build pipeline. Settings are loaded from environment variables with
//! sensible defaults and can be overridden per-invocation from the CLI.
//!
//! # Environment Variables
//!
//! - `COMPILEBOX_RUNTIME`: container runtime binary - default: "docker"
//! - `COMPILEBOX_IMAGE`: compiler image tag - default: "smartpy/cli:latest"
//! - `COMPILEBOX_CONTRACTS_DIR`: contract sources directory - default: "./contracts"
//! - `COMPILEBOX_BUILD_DIR`: build output directory - default: "./build/contracts"
//! - `COMPILEBOX_LOG_LEVEL`: logging level - default: "info"
//! - `COMPILEBOX_STRICT`: treat any compiler diagnostics as failure (true|false) - default: "true"
//!
//! # Example
//!
//! ```no_run
//! use compilebox::BuildConfig;
//!
//! let config = BuildConfig::from_env().expect("invalid configuration");
//! config.validate().expect("invalid configuration");
//!
//! // Narrow the contracts directory before delegating to the pipeline
//! let narrowed = config.with_contracts_dir("contracts/tezos".into());
//! ```

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_RUNTIME: &str = "docker";
const DEFAULT_IMAGE: &str = "smartpy/cli:latest";
const DEFAULT_CONTRACTS_DIR: &str = "contracts";
const DEFAULT_BUILD_DIR: &str = "build/contracts";
const DEFAULT_STRICT: bool = true;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Working directory could not be determined
    #[error("Failed to determine working directory: {0}")]
    WorkingDirUnavailable(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for compilebox
///
/// One instance is built per invocation and treated as immutable afterwards;
/// use [`BuildConfig::with_contracts_dir`] to derive a narrowed copy instead
/// of mutating in place.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory scanned for contract sources
    pub contracts_dir: PathBuf,

    /// Shared build output directory (single-writer, reconciled per invocation)
    pub build_dir: PathBuf,

    /// Working directory mapped into the compiler container
    pub working_dir: PathBuf,

    /// Container runtime binary ("docker", "podman", ...)
    pub runtime: String,

    /// Compiler image tag
    pub image: String,

    /// Entry point expression override; defaults to the contract's logical name
    pub entry_point: Option<String>,

    /// Suppress non-error console output
    pub quiet: bool,

    /// Treat any diagnostic output as failure even on a zero exit code
    pub strict: bool,
}

impl BuildConfig {
    /// Creates a configuration from environment variables with defaults
    ///
    /// Relative directories are resolved against the current working
    /// directory at call time.
    pub fn from_env() -> Result<Self, ConfigError> {
        let working_dir = env::current_dir()
            .map_err(|e| ConfigError::WorkingDirUnavailable(e.to_string()))?;

        let contracts_dir = env::var("COMPILEBOX_CONTRACTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| working_dir.join(DEFAULT_CONTRACTS_DIR));

        let build_dir = env::var("COMPILEBOX_BUILD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| working_dir.join(DEFAULT_BUILD_DIR));

        let runtime =
            env::var("COMPILEBOX_RUNTIME").unwrap_or_else(|_| DEFAULT_RUNTIME.to_string());

        let image = env::var("COMPILEBOX_IMAGE").unwrap_or_else(|_| DEFAULT_IMAGE.to_string());

        let strict = match env::var("COMPILEBOX_STRICT") {
            Ok(raw) => raw.parse::<bool>().map_err(|e| ConfigError::ParseError {
                field: "COMPILEBOX_STRICT".to_string(),
                error: e.to_string(),
            })?,
            Err(_) => DEFAULT_STRICT,
        };

        Ok(Self {
            contracts_dir,
            build_dir,
            working_dir,
            runtime,
            image,
            entry_point: None,
            quiet: false,
            strict,
        })
    }

    /// Returns a derived copy with the contracts directory overridden
    ///
    /// Used to narrow the generic configuration to a toolchain-specific
    /// subdirectory before handing it to the pipeline entry points.
    pub fn with_contracts_dir(&self, contracts_dir: PathBuf) -> Self {
        Self {
            contracts_dir,
            ..self.clone()
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "container runtime must not be empty".to_string(),
            ));
        }
        if self.image.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "compiler image must not be empty".to_string(),
            ));
        }
        if let Some(entry) = &self.entry_point {
            if entry.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "entry point override must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
