//! Lexical path normalization
//!
//! The compiler runs inside a container whose filesystem namespace is
//! bind-mounted from the host with identical path strings on both sides
//! (`-v <dir>:<dir>`). For that mapping to resolve, every path handed to the
//! container must be the exact string the mount was created with: `.`/`..`
//! segments resolved and separators unified to forward slashes. This is a
//! purely lexical transformation - it never touches the filesystem, so it
//! also works for paths that only exist inside the container.

use std::path::{Component, Path};

/// Normalizes a path lexically: resolves `.` and `..` components and joins
/// the result with forward slashes.
///
/// `..` at the root is dropped rather than preserved, matching how the
/// container runtime resolves mount paths.
pub fn normalize(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                // Windows drive prefixes keep their text but use `/` separators.
                parts.push(prefix.as_os_str().to_string_lossy().replace('\\', "/"));
            }
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| !p.contains(':')) {
                    parts.pop();
                }
            }
            Component::Normal(seg) => parts.push(seg.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Normalizes a path that may be relative, resolving it against `base` first.
pub fn normalize_against(base: &Path, path: &Path) -> String {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_absolute_path() {
        assert_eq!(
            normalize(Path::new("/proj/contracts/x.py")),
            "/proj/contracts/x.py"
        );
    }

    #[test]
    fn test_normalize_resolves_dot_segments() {
        assert_eq!(
            normalize(Path::new("/proj/./contracts/../contracts/x.py")),
            "/proj/contracts/x.py"
        );
    }

    #[test]
    fn test_normalize_parent_at_root_is_dropped() {
        assert_eq!(normalize(Path::new("/../proj")), "/proj");
    }

    #[test]
    fn test_normalize_relative_path() {
        assert_eq!(normalize(Path::new("contracts/./x.py")), "contracts/x.py");
        assert_eq!(normalize(Path::new(".")), ".");
    }

    #[test]
    fn test_normalize_against_base() {
        assert_eq!(
            normalize_against(Path::new("/proj"), Path::new("contracts/x.py")),
            "/proj/contracts/x.py"
        );
        assert_eq!(
            normalize_against(Path::new("/proj"), Path::new("/proj/contracts/x.py")),
            "/proj/contracts/x.py"
        );
    }
}
