use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::ObjectStore;
use crate::error::{PipelineErr, Result};

/// A bucket rooted at a local directory.
///
/// Keys map to paths relative to the root; a `/` in a key becomes a
/// subdirectory, so `processed/train.csv` lands where a remote bucket
/// would put it.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FsStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        fs::read(self.blob_path(key)).map_err(|source| PipelineErr::Store {
            key: key.to_string(),
            source,
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(key);
        let wrap = |source: io::Error| PipelineErr::Store {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(wrap)?;
        }
        fs::write(path, bytes).map_err(wrap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        store.put("cleaned_events.csv", b"a,b\n1,2\n").unwrap();
        assert_eq!(store.get("cleaned_events.csv").unwrap(), b"a,b\n1,2\n");
    }

    #[test]
    fn nested_keys_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        store.put("processed/train.csv", b"payload").unwrap();
        assert_eq!(store.get("processed/train.csv").unwrap(), b"payload");
    }

    #[test]
    fn missing_blob_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        let err = store.get("absent.csv").unwrap_err();
        assert!(matches!(err, PipelineErr::Store { .. }), "got {err:?}");
    }
}
