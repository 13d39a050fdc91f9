//! One file per (object path, interface) under the persistence root.

use pim_domain::object::{ObjectMap, PropertyMap, is_under};
use pim_storage::{Storage, StorageError, validate_segment};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Mirrors the object hierarchy on disk: `<root>/<object path>/<interface>`.
///
/// A root that is missing while creation is disabled leaves the persistence
/// detached: nothing is restored, reads find nothing and writes are refused.
#[derive(Debug, Clone)]
pub struct Persistence {
    root: PathBuf,
    storage: Option<Storage>,
}

impl Persistence {
    /// Opens (and by default creates) the persistence root.
    ///
    /// # Errors
    ///
    /// Whatever [`Storage`] reports while opening the root, except a missing
    /// root with `create` off, which yields a detached instance.
    pub fn open(root: impl Into<PathBuf>, create: bool) -> Result<Self, StorageError> {
        let root = root.into();
        match Storage::builder().root(&root).create(create).open() {
            Ok(storage) => Ok(Self { root: storage.root().to_path_buf(), storage: Some(storage) }),
            Err(StorageError::DirectoryNotFound { .. }) if !create => {
                warn!(root = %root.display(), "Persistence root missing and creation disabled; state is not kept");
                Ok(Self { root, storage: None })
            },
            Err(err) => Err(err),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `false` when the root was missing at open and nothing is kept.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.storage.is_some()
    }

    fn storage(&self) -> Result<&Storage, StorageError> {
        self.storage.as_ref().ok_or_else(|| StorageError::DirectoryNotFound {
            message: self.root.display().to_string().into(),
            context: Some("Persistence is detached".into()),
        })
    }

    fn file_for(path: &str, interface: &str) -> Result<PathBuf, StorageError> {
        let mut file = PathBuf::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            validate_segment(segment)?;
            file.push(segment);
        }
        validate_segment(interface)?;
        file.push(interface);
        Ok(file)
    }

    /// # Errors
    /// Invalid path segments or any write failure.
    pub fn save(&self, path: &str, interface: &str, data: &[u8]) -> Result<(), StorageError> {
        self.storage()?.write(Self::file_for(path, interface)?, data)
    }

    /// Returns `None` when nothing was stored for the pair.
    ///
    /// # Errors
    /// Invalid path segments or a read failure other than absence.
    pub fn load(&self, path: &str, interface: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file = Self::file_for(path, interface)?;
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        match storage.read(file) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Removes the stored state of one interface; absence is not an error.
    ///
    /// # Errors
    /// Invalid path segments or a delete failure other than absence.
    pub fn discard(&self, path: &str, interface: &str) -> Result<(), StorageError> {
        let file = Self::file_for(path, interface)?;
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        match storage.delete(file) {
            Err(err) if err.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// Rebuilds the restore skeleton: object paths and interface names, no values.
    ///
    /// Files that do not sit below `root` in the object hierarchy are skipped.
    ///
    /// # Errors
    /// [`StorageError::DirectoryNotFound`] if the persistence root vanished
    /// or was never there.
    pub fn skeleton(&self, root: &str) -> Result<ObjectMap, StorageError> {
        let mut objects = ObjectMap::new();
        for file in self.storage()?.files()? {
            let Some(interface) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(path) = file.parent().and_then(object_path) else {
                warn!(file = %file.display(), "Skipping persisted file with a non UTF-8 path");
                continue;
            };
            if !is_under(root, &path) {
                warn!(%path, %interface, "Skipping persisted state outside the inventory root");
                continue;
            }
            objects.entry(path).or_default().insert(interface.to_owned(), PropertyMap::new());
        }
        Ok(objects)
    }
}

fn object_path(dir: &Path) -> Option<String> {
    let mut path = String::new();
    for component in dir.components() {
        let Component::Normal(segment) = component else {
            return None;
        };
        path.push('/');
        path.push_str(segment.to_str()?);
    }
    if path.is_empty() {
        path.push('/');
    }
    Some(path)
}
