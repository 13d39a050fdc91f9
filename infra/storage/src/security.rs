use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

/// Checks one caller-built path component (an object path segment or an interface name).
///
/// A valid segment is non-empty, is not `.` or `..`, and contains no separator or NUL,
/// so joining it can never change the depth of the resulting path.
///
/// # Errors
///
/// Returns [`StorageError::PathTraversalAttempt`] naming the offending segment.
pub fn validate_segment(segment: &str) -> Result<(), StorageError> {
    let reason = if segment.is_empty() {
        Some("empty path segment")
    } else if segment == "." || segment == ".." {
        Some("relative path segment")
    } else if segment.contains(['/', '\\', '\0']) {
        Some("separator inside path segment")
    } else {
        None
    };

    reason.map_or(Ok(()), |reason| {
        Err(StorageError::PathTraversalAttempt {
            message: segment.to_owned().into(),
            context: Some(reason.into()),
        })
    })
}

/// Collapse `.` / `..` lexically, refusing to climb above the (empty) relative base.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for c in path.components() {
        match c {
            Component::CurDir => {},
            Component::Normal(seg) => out.push(seg),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(StorageError::PathTraversalAttempt {
                        message: path.display().to_string().into(),
                        context: Some("Path attempted to escape sandbox via '..'".into()),
                    });
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::PathTraversalAttempt {
                    message: path.display().to_string().into(),
                    context: Some("Absolute paths are not allowed in sandbox".into()),
                });
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(StorageError::PathTraversalAttempt {
            message: path.display().to_string().into(),
            context: Some("Path resolves to the sandbox root itself".into()),
        });
    }

    Ok(out)
}

/// Joins a relative path to the root and proves the result stays inside it.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let safe_rel = normalize_relative(path.as_ref())?;
    let joined = root.join(safe_rel);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(joined),
        Ok(canonical) => Err(StorageError::PathTraversalAttempt {
            message: canonical.display().to_string().into(),
            context: Some("Path resolves outside the sandbox".into()),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => first_existing_ancestor(root, &joined),
        Err(e) => Err(StorageError::Io { source: e, context: None }),
    }
}

/// Validates a not-yet-existing path through its nearest existing ancestor.
///
/// The ancestor is canonicalized, so a symlinked directory pointing outside the
/// root is caught even though the leaf does not exist yet.
fn first_existing_ancestor(root: &Path, joined: &Path) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(path) = current {
        if path == root {
            return Ok(joined.to_path_buf());
        }

        if path.exists() {
            return match path.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined.to_path_buf()),
                Ok(canonical) => Err(StorageError::PathTraversalAttempt {
                    message: canonical.display().to_string().into(),
                    context: Some("Existing parent directory is a symlink outside sandbox".into()),
                }),
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }

        current = path.parent();
    }

    Err(StorageError::PathTraversalAttempt {
        message: joined.display().to_string().into(),
        context: Some("No valid parent directory found within sandbox".into()),
    })
}
