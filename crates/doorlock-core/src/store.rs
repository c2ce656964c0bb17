//! Byte-addressable persistent storage for the credential record.
//!
//! Models an external EEPROM: erased cells read `0xFF`, and every access is
//! an explicit offset plus length.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StorageError;

/// Value of an erased cell.
pub const ERASED: u8 = 0xFF;

/// Default capacity, matching a 1 KiB serial EEPROM.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Persistent byte store.
pub trait CredentialStore {
    /// Write `bytes` starting at `offset`.
    fn write(&mut self, offset: u16, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read `len` bytes starting at `offset`.
    fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>, StorageError>;

    /// Store size in bytes.
    fn capacity(&self) -> usize;
}

/// Check an access against the store size.
pub fn check_bounds(offset: u16, len: usize, capacity: usize) -> Result<(), StorageError> {
    let end = offset as usize + len;
    if end > capacity {
        return Err(StorageError::OutOfBounds { offset, len, capacity });
    }
    Ok(())
}

/// In-memory store.
///
/// Clones share the same cells, so a test can inspect what a node wrote.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    cells: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStore {
    /// Freshly erased store of [`DEFAULT_CAPACITY`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Freshly erased store of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { cells: Arc::new(Mutex::new(vec![ERASED; capacity])) }
    }

    /// Copy of every cell.
    pub fn snapshot(&self) -> Vec<u8> {
        self.cells().clone()
    }

    fn cells(&self) -> MutexGuard<'_, Vec<u8>> {
        // Every write is a single copy, so cells stay consistent across poison.
        self.cells.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn write(&mut self, offset: u16, bytes: &[u8]) -> Result<(), StorageError> {
        let mut cells = self.cells();
        check_bounds(offset, bytes.len(), cells.len())?;
        let start = offset as usize;
        cells[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>, StorageError> {
        let cells = self.cells();
        check_bounds(offset, len, cells.len())?;
        let start = offset as usize;
        Ok(cells[start..start + len].to_vec())
    }

    fn capacity(&self) -> usize {
        self.cells().len()
    }
}
