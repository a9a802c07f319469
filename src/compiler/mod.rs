//! Containerized compiler integration
//!
//! - [`invoker`]: spawns the compiler container for one source file and
//!   streams its diagnostics
//! - [`artifacts`]: reconciles the files the compiler scattered into the
//!   build directory after each invocation

pub mod artifacts;
pub mod invoker;

use serde::{Deserialize, Serialize};

pub use artifacts::{classify, reconcile, ArtifactError, ArtifactKind, ReconciledArtifacts};
pub use invoker::{CompilerError, ContractCompiler, DockerCompiler};

/// Identity of the compiler that produced a contract record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerIdentity {
    /// Compiler name (image repository)
    pub name: String,
    /// Version tag
    pub version: String,
}

impl CompilerIdentity {
    /// Splits an image reference into repository and tag (`latest` when the
    /// reference carries none).
    pub fn from_image(image: &str) -> Self {
        match image.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => Self {
                name: repo.to_string(),
                version: tag.to_string(),
            },
            _ => Self {
                name: image.to_string(),
                version: "latest".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_tagged_image() {
        let identity = CompilerIdentity::from_image("smartpy/cli:0.9.1");
        assert_eq!(identity.name, "smartpy/cli");
        assert_eq!(identity.version, "0.9.1");
    }

    #[test]
    fn test_identity_defaults_to_latest() {
        let identity = CompilerIdentity::from_image("smartpy/cli");
        assert_eq!(identity.name, "smartpy/cli");
        assert_eq!(identity.version, "latest");
    }

    #[test]
    fn test_identity_ignores_registry_port() {
        // A colon inside the registry host is not a tag separator.
        let identity = CompilerIdentity::from_image("registry:5000/smartpy/cli");
        assert_eq!(identity.name, "registry:5000/smartpy/cli");
        assert_eq!(identity.version, "latest");
    }
}
