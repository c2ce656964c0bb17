//! EEPROM image on disk.
//!
//! The image is a flat file of `capacity` bytes. A missing file is created
//! erased (`0xFF`), which reads as an unprovisioned credential record.

use std::{
    fs::{self, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use doorlock_core::{
    StorageError,
    store::{CredentialStore, ERASED, check_bounds},
};

/// Credential store backed by an image file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    capacity: usize,
}

impl FileStore {
    /// Open the image at `path`, creating an erased one of `capacity` bytes
    /// if it does not exist.
    pub fn open_or_create(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fs::write(&path, vec![ERASED; capacity])?;
            tracing::info!(path = %path.display(), capacity, "created erased store image");
        }

        let capacity = usize::try_from(fs::metadata(&path)?.len())
            .map_err(|_| StorageError::OutOfBounds { offset: 0, len: 0, capacity: usize::MAX })?;
        Ok(Self { path, capacity })
    }

    /// Image path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn write(&mut self, offset: u16, bytes: &[u8]) -> Result<(), StorageError> {
        check_bounds(offset, bytes.len(), self.capacity)?;
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        file.write_all(bytes)?;
        file.sync_data()?;
        Ok(())
    }

    fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>, StorageError> {
        check_bounds(offset, len, self.capacity)?;
        let image = fs::read(&self.path)?;
        let start = offset as usize;
        image.get(start..start + len).map(<[u8]>::to_vec).ok_or(StorageError::OutOfBounds {
            offset,
            len,
            capacity: image.len(),
        })
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use doorlock_core::{CredentialManager, Provisioning};
    use doorlock_proto::{CREDENTIAL_OFFSET, Credential};

    use super::*;

    #[test]
    fn new_image_is_erased() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open_or_create(dir.path().join("eeprom.bin"), 1024).unwrap();
        assert_eq!(store.capacity(), 1024);
        assert_eq!(store.read(CREDENTIAL_OFFSET, 1).unwrap(), vec![ERASED]);
    }

    #[test]
    fn credential_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");
        let pin = Credential::new(b"2468").unwrap();

        let store = FileStore::open_or_create(&path, 1024).unwrap();
        let mut manager = CredentialManager::new(store, CREDENTIAL_OFFSET);
        manager.enroll(&pin, &pin).unwrap();

        let reopened = FileStore::open_or_create(&path, 1024).unwrap();
        let manager = CredentialManager::new(reopened, CREDENTIAL_OFFSET);
        assert_eq!(manager.provisioning().unwrap(), Provisioning::Provisioned { len: 4 });
        assert!(manager.verify(&pin).unwrap().is_match());
    }

    #[test]
    fn existing_image_keeps_its_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.bin");
        fs::write(&path, [ERASED; 16]).unwrap();

        let mut store = FileStore::open_or_create(&path, 1024).unwrap();
        assert_eq!(store.capacity(), 16);
        assert!(matches!(store.write(CREDENTIAL_OFFSET, b"\x01"), Err(StorageError::OutOfBounds { .. })));
    }
}
