//! The [`Storage`] handle: sandboxed, atomic, synchronous file I/O.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use crate::security;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Marker embedded in temp file names; never part of a stored file name.
pub(crate) const TMP_MARKER: &str = ".pimtmp.";

#[derive(Debug)]
pub(crate) struct StorageInner {
    /// The canonicalized physical root; all data lives below it.
    pub(crate) root: PathBuf,
    /// Source of unique temp file suffixes.
    pub(crate) tmp_counter: AtomicU64,
}

/// A cheap-to-clone handle to a sandboxed directory tree.
///
/// Paths passed to every method are relative to the root. The handle is
/// reference-counted; clones share the same root and temp counter.
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Storage {
    #[must_use = "The store is not opened until you call .open()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical physical root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Resolves a relative path to its physical location inside the sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path is absolute or would
    /// escape the root, and [`StorageError::Io`] if an existing ancestor cannot be verified.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.inner.root, path)
    }

    /// Reads a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if nothing is stored at `path`.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve(path)?;
        match fs::read(&resolved) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::FileNotFound {
                message: resolved.display().to_string().into(),
                context: None,
            }),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    /// Writes a file atomically, creating parent directories as needed.
    ///
    /// The payload goes to a unique `<name>.pimtmp.<n>` sibling, is synced, then renamed
    /// over the target; the parent directory is synced afterwards so the rename itself
    /// survives a power loss.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the sandbox and
    /// [`StorageError::Io`] on any filesystem failure. The target is untouched on error.
    pub fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create parents of {}", resolved.display()))?;
        }

        let temp = self.unique_tmp_path(&resolved);
        let staged = Self::stage(&temp, data);
        if let Err(err) = staged.and_then(|()| Self::swap(&temp, &resolved)) {
            if let Err(cleanup) = fs::remove_file(&temp)
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = %temp.display(), error = %cleanup, "Temp file cleanup failed");
            }
            return Err(err);
        }

        if let Some(parent) = resolved.parent() {
            Self::sync_dir(parent);
        }

        debug!(path = %resolved.display(), bytes = data.len(), "File saved atomically");
        Ok(())
    }

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if nothing is stored at `path`.
    pub fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;
        match fs::remove_file(&resolved) {
            Ok(()) => {
                debug!(path = %resolved.display(), "File deleted");
                Ok(())
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::FileNotFound {
                message: resolved.display().to_string().into(),
                context: None,
            }),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    /// Checks whether a regular file is stored at `path`.
    ///
    /// # Errors
    ///
    /// Only path validation failures are reported; a missing file is `Ok(false)`.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.is_file())
    }

    /// Lists every stored file as a root-relative path, in lexical walk order.
    ///
    /// Temp files are skipped. Entries that cannot be read are logged and skipped;
    /// a single unreadable directory does not hide the rest of the tree.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DirectoryNotFound`] if the root itself has vanished.
    pub fn files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let root = &self.inner.root;
        if !root.is_dir() {
            return Err(StorageError::DirectoryNotFound {
                message: root.display().to_string().into(),
                context: Some("Storage root disappeared".into()),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable storage entry");
                    continue;
                },
            };
            if !entry.file_type().is_file() || maintenance::is_tmp_name(entry.file_name()) {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(root) {
                files.push(rel.to_path_buf());
            }
        }
        Ok(files)
    }

    /// Removes stale temp files and directories left empty under the root.
    pub fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.inner.root);
    }

    fn stage(temp: &Path, data: &[u8]) -> Result<(), StorageError> {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(temp)
            .context(format!("Temp creation failed: {}", temp.display()))?;
        file.write_all(data).context("Write failed")?;
        file.sync_all().context("Hardware sync failed")
    }

    fn swap(temp: &Path, target: &Path) -> Result<(), StorageError> {
        match fs::rename(temp, target) {
            Ok(()) => Ok(()),
            // Platforms without atomic replace: remove, then rename.
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                fs::remove_file(target)
                    .context(format!("Failed to replace existing file: {}", target.display()))?;
                fs::rename(temp, target).context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    target.display()
                ))
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap failed: {} -> {}", temp.display(), target.display())
                        .into(),
                ),
            }),
        }
    }

    fn sync_dir(path: &Path) {
        match fs::File::open(path) {
            Ok(dir) => {
                if let Err(err) = dir.sync_all() {
                    warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }

    fn unique_tmp_path(&self, target: &Path) -> PathBuf {
        let n = self.inner.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("entry");
        target.with_file_name(format!("{file_name}{TMP_MARKER}{n}"))
    }
}
