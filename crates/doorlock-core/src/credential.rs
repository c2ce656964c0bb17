//! Credential enrollment and verification.
//!
//! # Record layout
//!
//! ```text
//! offset      offset+1
//! ┌──────────┬──────────────────────┐
//! │ length   │ credential bytes     │
//! └──────────┴──────────────────────┘
//! ```
//!
//! A length byte of `0xFF` (erased) or `0` means nothing is enrolled. Any
//! other value above [`MAX_CREDENTIAL_LEN`] is a corrupt record.
//!
//! # Invariants
//!
//! - The record is written in a single store write, and only after the
//!   credential and its confirmation matched.
//! - An unprovisioned store never verifies, not even against an empty
//!   candidate.

use doorlock_proto::{Credential, MAX_CREDENTIAL_LEN};

use crate::{
    error::StorageError,
    store::{CredentialStore, ERASED, check_bounds},
};

/// What the store currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// No credential enrolled.
    Unprovisioned,
    /// A credential of this length is enrolled.
    Provisioned {
        /// Stored credential length
        len: u8,
    },
}

/// Outcome of one enrollment round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrollment {
    /// Entries matched and the record was written.
    Committed,
    /// Entries differ; nothing was written.
    Mismatch,
    /// Entries were empty; nothing was written.
    Empty,
}

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Candidate equals the stored credential.
    Match,
    /// Candidate differs in length or content.
    Mismatch,
    /// Nothing is enrolled, so nothing can match.
    Unprovisioned,
}

impl Verification {
    /// True only for an exact match.
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

/// Owns the credential record inside a [`CredentialStore`].
#[derive(Debug)]
pub struct CredentialManager<S> {
    store: S,
    offset: u16,
}

impl<S: CredentialStore> CredentialManager<S> {
    /// Manage the record at `offset` in `store`.
    pub fn new(store: S, offset: u16) -> Self {
        Self { store, offset }
    }

    /// Read the length header.
    pub fn provisioning(&self) -> Result<Provisioning, StorageError> {
        let header = self.store.read(self.offset, 1)?;
        match header.first().copied() {
            None | Some(ERASED | 0) => Ok(Provisioning::Unprovisioned),
            Some(len) if len as usize <= MAX_CREDENTIAL_LEN => Ok(Provisioning::Provisioned { len }),
            Some(length) => Err(StorageError::Corrupt { length }),
        }
    }

    /// One enrollment round: commit `entry` if `confirmation` matches it.
    pub fn enroll(
        &mut self,
        entry: &Credential,
        confirmation: &Credential,
    ) -> Result<Enrollment, StorageError> {
        if entry != confirmation {
            return Ok(Enrollment::Mismatch);
        }
        if entry.is_empty() {
            return Ok(Enrollment::Empty);
        }

        let mut record = Vec::with_capacity(entry.len() + 1);
        record.push(entry.len() as u8);
        record.extend_from_slice(entry.as_bytes());
        self.store.write(self.offset, &record)?;

        Ok(Enrollment::Committed)
    }

    /// Compare `candidate` with the stored credential, including its length.
    pub fn verify(&self, candidate: &Credential) -> Result<Verification, StorageError> {
        let len = match self.provisioning()? {
            Provisioning::Unprovisioned => return Ok(Verification::Unprovisioned),
            Provisioning::Provisioned { len } => len as usize,
        };

        if candidate.len() != len {
            return Ok(Verification::Mismatch);
        }

        let body = self.offset.checked_add(1).ok_or(StorageError::OutOfBounds {
            offset: self.offset,
            len: len + 1,
            capacity: self.store.capacity(),
        })?;
        let stored = self.store.read(body, len)?;
        if stored.as_slice() == candidate.as_bytes() {
            Ok(Verification::Match)
        } else {
            Ok(Verification::Mismatch)
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check that a full-length record fits in the store.
    pub fn check_layout(&self) -> Result<(), StorageError> {
        check_bounds(self.offset, MAX_CREDENTIAL_LEN + 1, self.store.capacity())
    }
}
