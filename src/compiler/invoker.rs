//! Compiler invocation adapter
//!
//! Launches the external compiler as an isolated container process, one
//! source file at a time. The host working directory is bind-mounted into
//! the container under the identical path string, so every path handed to
//! the container must be normalized to the exact form the mount was created
//! with (see [`crate::util::paths`]).
//!
//! Diagnostics are drained from the child's stderr continuously while
//! waiting for exit; draining only after exit can deadlock once the OS pipe
//! buffer fills on a chatty compiler.

use crate::compiler::CompilerIdentity;
use crate::staleness::logical_name;
use crate::util::paths;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors raised by compiler invocation
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Preflight check failed: container runtime or compiler image unavailable
    #[error(
        "Compiler environment unavailable ({runtime} run {image}): {message}\n\
         Is the container runtime installed and the image pulled?"
    )]
    EnvironmentUnavailable {
        runtime: String,
        image: String,
        message: String,
    },

    /// The compiler process could not be spawned or awaited
    #[error("Failed to run {runtime}: {message}")]
    ProcessFailed { runtime: String, message: String },

    /// One source file failed to compile; diagnostics are verbatim compiler output
    #[error("Compilation of {source_path} failed:\n{diagnostics}")]
    CompileFailed {
        source_path: PathBuf,
        diagnostics: String,
    },

    /// Build output directory could not be created
    #[error("Failed to create build directory {path}: {message}")]
    BuildDirFailed { path: PathBuf, message: String },
}

/// One compiler invocation per contract source
///
/// Seam for the pipeline: production code uses [`DockerCompiler`], tests
/// substitute a spy that counts invocations and writes canned artifacts.
#[async_trait]
pub trait ContractCompiler: Send + Sync {
    /// Verifies the execution environment before any compilation proceeds
    async fn preflight(&self) -> Result<(), CompilerError>;

    /// Compiles one source file, resolving to its logical name
    async fn compile(
        &self,
        source: &Path,
        entry_point: Option<&str>,
        build_dir: &Path,
    ) -> Result<String, CompilerError>;

    /// Identity reported in every contract record
    fn identity(&self) -> CompilerIdentity;
}

/// Invokes the compiler image through a container runtime CLI
#[derive(Debug, Clone)]
pub struct DockerCompiler {
    runtime: String,
    image: String,
    working_dir: PathBuf,
    strict: bool,
}

impl DockerCompiler {
    pub fn new(runtime: String, image: String, working_dir: PathBuf, strict: bool) -> Self {
        Self {
            runtime,
            image,
            working_dir,
            strict,
        }
    }

    /// Arguments for one compile run, kept as discrete tokens so arbitrary
    /// file paths never pass through a shell.
    fn compile_args(&self, source: &str, entry_expr: &str, out_dir: &str) -> Vec<String> {
        let workdir = paths::normalize(&self.working_dir);
        vec![
            "run".to_string(),
            "-v".to_string(),
            format!("{}:{}", workdir, workdir),
            "-w".to_string(),
            workdir,
            "--rm".to_string(),
            "-i".to_string(),
            self.image.clone(),
            "compile".to_string(),
            source.to_string(),
            entry_expr.to_string(),
            out_dir.to_string(),
        ]
    }
}

#[async_trait]
impl ContractCompiler for DockerCompiler {
    async fn preflight(&self) -> Result<(), CompilerError> {
        let output = Command::new(&self.runtime)
            .args(["run", "--rm", "-i"])
            .arg(&self.image)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CompilerError::EnvironmentUnavailable {
                runtime: self.runtime.clone(),
                image: self.image.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CompilerError::EnvironmentUnavailable {
                runtime: self.runtime.clone(),
                image: self.image.clone(),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        debug!(runtime = %self.runtime, image = %self.image, "Compiler preflight succeeded");
        Ok(())
    }

    async fn compile(
        &self,
        source: &Path,
        entry_point: Option<&str>,
        build_dir: &Path,
    ) -> Result<String, CompilerError> {
        let source_norm = paths::normalize_against(&self.working_dir, source);
        let out_norm = paths::normalize_against(&self.working_dir, build_dir);
        let name = logical_name(source);
        let entry_expr = format!("{}()", entry_point.unwrap_or(&name));

        tokio::fs::create_dir_all(build_dir)
            .await
            .map_err(|e| CompilerError::BuildDirFailed {
                path: build_dir.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!(source = %source_norm, entry = %entry_expr, "Invoking compiler");

        let mut child = Command::new(&self.runtime)
            .args(self.compile_args(&source_norm, &entry_expr, &out_norm))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CompilerError::ProcessFailed {
                runtime: self.runtime.clone(),
                message: e.to_string(),
            })?;

        // Drain stderr concurrently with waiting for exit.
        let stderr = child.stderr.take();
        let drain = tokio::spawn(async move {
            let mut diagnostics = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "compilebox::compiler", "{}", line);
                    diagnostics.push_str(&line);
                    diagnostics.push('\n');
                }
            }
            diagnostics
        });

        let status = child
            .wait()
            .await
            .map_err(|e| CompilerError::ProcessFailed {
                runtime: self.runtime.clone(),
                message: e.to_string(),
            })?;
        let diagnostics = drain.await.unwrap_or_default();

        let diagnostics_fail = self.strict && !diagnostics.is_empty();
        if !status.success() || diagnostics_fail {
            return Err(CompilerError::CompileFailed {
                source_path: source.to_path_buf(),
                diagnostics,
            });
        }

        Ok(name)
    }

    fn identity(&self) -> CompilerIdentity {
        CompilerIdentity::from_image(&self.image)
    }
}
