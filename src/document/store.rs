//! Filesystem-backed document persistence: one file per document, named
//! exactly as the wire protocol's `name` field (after zero-padding is
//! stripped).

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::constants::DOC_NAME_FIELD_LEN;

/// Errors raised by [`DocumentStore`] operations.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// `create` was called with a name that already has a file on disk.
    #[error("document {0:?} already exists")]
    AlreadyExists(String),

    /// `open`/`delete`/`save` was called with a name that has no file on
    /// disk.
    #[error("document {0:?} does not exist")]
    NotExist(String),

    /// A name violates the wire format's constraints, or would escape the
    /// documents directory.
    #[error("invalid document name {0:?}: {1}")]
    InvalidName(String, &'static str),

    /// The underlying filesystem operation failed.
    #[error("I/O error on document {0:?}: {1}")]
    Io(String, #[source] std::io::Error),
}

/// A directory of byte-stream files, one per document, named exactly as
/// the wire format's `name` field (after zero-padding is stripped).
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `root`, creating the directory if it does
    /// not yet exist.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<DocumentStore> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(DocumentStore { root })
    }

    /// Validate a document name against the wire format's width
    /// constraint and reject anything that could escape the store's root.
    fn sanitize(name: &str) -> Result<&str, DocumentStoreError> {
        if name.is_empty() {
            return Err(DocumentStoreError::InvalidName(name.to_string(), "must not be empty"));
        }
        if name.as_bytes().len() > DOC_NAME_FIELD_LEN {
            return Err(DocumentStoreError::InvalidName(
                name.to_string(),
                "exceeds the 128-byte name field",
            ));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(DocumentStoreError::InvalidName(
                name.to_string(),
                "must be a bare filename",
            ));
        }
        Ok(name)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, DocumentStoreError> {
        Ok(self.root.join(Self::sanitize(name)?))
    }

    /// Read the whole contents of `name` from disk.
    pub fn open(&self, name: &str) -> Result<Vec<u8>, DocumentStoreError> {
        let path = self.path_for(name)?;
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DocumentStoreError::NotExist(name.to_string())
            } else {
                DocumentStoreError::Io(name.to_string(), e)
            }
        })
    }

    /// Create an empty file for `name`. Fails if one already exists.
    pub fn create(&self, name: &str) -> Result<(), DocumentStoreError> {
        let path = self.path_for(name)?;
        match std::fs::File::options().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(DocumentStoreError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(DocumentStoreError::Io(name.to_string(), e)),
        }
    }

    /// Overwrite `name`'s file with `contents`.
    pub fn save(&self, name: &str, contents: &[u8]) -> Result<(), DocumentStoreError> {
        let path = self.path_for(name)?;
        std::fs::write(&path, contents).map_err(|e| DocumentStoreError::Io(name.to_string(), e))
    }

    /// Remove `name`'s file from disk.
    pub fn delete(&self, name: &str) -> Result<(), DocumentStoreError> {
        let path = self.path_for(name)?;
        std::fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DocumentStoreError::NotExist(name.to_string())
            } else {
                DocumentStoreError::Io(name.to_string(), e)
            }
        })
    }

    /// List every document name in the store. `.` and `..` are never
    /// returned by a directory iterator in the first place; this also
    /// skips subdirectories and non-UTF-8 names.
    pub fn list_names(&self) -> Result<Vec<String>, DocumentStoreError> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| DocumentStoreError::Io(self.root.display().to_string(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DocumentStoreError::Io(self.root.display().to_string(), e))?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// The directory this store is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn create_then_open_round_trips_empty_contents() {
        let (_dir, store) = store();
        store.create("foo").unwrap();
        assert_eq!(store.open("foo").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn create_twice_fails_already_exists() {
        let (_dir, store) = store();
        store.create("foo").unwrap();
        assert!(matches!(
            store.create("foo").unwrap_err(),
            DocumentStoreError::AlreadyExists(_)
        ));
    }

    #[test]
    fn open_missing_fails_not_exist() {
        let (_dir, store) = store();
        assert!(matches!(store.open("missing").unwrap_err(), DocumentStoreError::NotExist(_)));
    }

    #[test]
    fn save_then_open_round_trips_contents() {
        let (_dir, store) = store();
        store.create("foo").unwrap();
        store.save("foo", b"hello").unwrap();
        assert_eq!(store.open("foo").unwrap(), b"hello");
    }

    #[test]
    fn delete_removes_file() {
        let (_dir, store) = store();
        store.create("foo").unwrap();
        store.delete("foo").unwrap();
        assert!(matches!(store.open("foo").unwrap_err(), DocumentStoreError::NotExist(_)));
    }

    #[test]
    fn list_names_excludes_dot_entries() {
        let (_dir, store) = store();
        store.create("a").unwrap();
        store.create("b").unwrap();
        let mut names = store.list_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn path_traversal_name_is_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.create("../escape").unwrap_err(),
            DocumentStoreError::InvalidName(_, _)
        ));
    }
}
