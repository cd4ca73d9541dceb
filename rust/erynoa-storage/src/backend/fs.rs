use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use erynoa_common::base58btc_encode;

use crate::{KeyValueStore, StorageError};

/// A basic file-system-based [KeyValueStore] implementation. All values are
/// stored inside a root directory as files named after their (base58-encoded)
/// keys.
///
/// Writes land in a sibling temporary file that is then renamed over the
/// target, so a reader never observes a half-written value.
#[derive(Clone, Debug)]
pub struct FileSystemStore {
    root_dir: PathBuf,
}

impl FileSystemStore {
    /// Creates a new [`FileSystemStore`] that stores files in `root_dir`.
    pub fn new<Pathlike>(root_dir: Pathlike) -> Result<Self, StorageError>
    where
        Pathlike: AsRef<Path>,
    {
        let root_dir = root_dir.as_ref().to_owned();
        std::fs::create_dir_all(&root_dir)
            .map_err(|error| StorageError::Backend(format!("{error}")))?;
        Ok(Self { root_dir })
    }

    /// The directory values are stored in.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn make_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(base58btc_encode(key.as_bytes()))
    }
}

impl KeyValueStore for FileSystemStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read(self.make_path(key)) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StorageError::InvalidValue {
                    key: key.to_string(),
                }),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StorageError::Backend(format!("{error}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.make_path(key);
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, value)
            .map_err(|error| StorageError::Backend(format!("{error}")))?;
        std::fs::rename(&staging, &path)
            .map_err(|error| StorageError::Backend(format!("{error}")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.make_path(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(StorageError::Backend(format!("{error}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn it_names_files_by_base58_key() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = FileSystemStore::new(root.path().join("nested"))?;

        store.set("erynoa_passkey_did", "did:erynoa:self:00")?;

        let expected = root
            .path()
            .join("nested")
            .join(base58btc_encode(b"erynoa_passkey_did"));
        assert_eq!(std::fs::read_to_string(expected)?, "did:erynoa:self:00");
        Ok(())
    }

    #[test]
    fn it_persists_across_instances() -> Result<()> {
        let root = tempfile::tempdir()?;
        FileSystemStore::new(root.path())?.set("k", "v")?;
        assert_eq!(
            FileSystemStore::new(root.path())?.get("k")?.as_deref(),
            Some("v")
        );
        Ok(())
    }

    #[test]
    fn it_reports_non_utf8_values() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = FileSystemStore::new(root.path())?;
        std::fs::write(store.make_path("k"), [0xff, 0xfe])?;
        assert_eq!(
            store.get("k"),
            Err(StorageError::InvalidValue {
                key: "k".to_string()
            })
        );
        Ok(())
    }
}
