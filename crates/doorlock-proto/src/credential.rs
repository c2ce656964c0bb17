//! Credential value type and `#`-terminated framing.
//!
//! # Invariants
//!
//! - A [`Credential`] holds at most [`MAX_CREDENTIAL_LEN`] bytes.
//! - A [`Credential`] never contains [`TERMINATOR`].
//! - [`CredentialDecoder`] keeps framing aligned: an oversized payload is
//!   swallowed up to its terminator and reported once.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtoError;

/// Maximum credential payload length.
pub const MAX_CREDENTIAL_LEN: usize = 5;

/// Credential frame terminator.
pub const TERMINATOR: u8 = b'#';

/// A secret entered on the keypad and compared against the stored one.
///
/// Fixed-size storage, no allocation. `Debug` is redacted so the secret
/// never reaches a log line.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Credential {
    bytes: [u8; MAX_CREDENTIAL_LEN],
    len: u8,
}

impl Credential {
    /// Build a credential from raw bytes.
    ///
    /// # Errors
    ///
    /// - `CredentialTooLong` if more than [`MAX_CREDENTIAL_LEN`] bytes
    /// - `TerminatorInPayload` if any byte equals [`TERMINATOR`]
    pub fn new(payload: &[u8]) -> Result<Self, ProtoError> {
        if payload.len() > MAX_CREDENTIAL_LEN {
            return Err(ProtoError::CredentialTooLong {
                len: payload.len(),
                max: MAX_CREDENTIAL_LEN,
            });
        }
        if payload.contains(&TERMINATOR) {
            return Err(ProtoError::TerminatorInPayload);
        }

        let mut bytes = [0u8; MAX_CREDENTIAL_LEN];
        bytes[..payload.len()].copy_from_slice(payload);
        Ok(Self { bytes, len: payload.len() as u8 })
    }

    /// The empty credential.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True for a zero-length credential.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append the framed credential (payload then terminator) to `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(self.as_bytes());
        buf.put_u8(TERMINATOR);
    }

    /// The framed credential as a standalone buffer.
    pub fn to_frame(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len() + 1);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode exactly one framed credential.
    ///
    /// # Errors
    ///
    /// `MissingTerminator` if the frame does not end with [`TERMINATOR`],
    /// otherwise the same errors as [`Credential::new`].
    pub fn decode(frame: &[u8]) -> Result<Self, ProtoError> {
        match frame.split_last() {
            Some((&TERMINATOR, payload)) => Self::new(payload),
            _ => Err(ProtoError::MissingTerminator),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted {} bytes>)", self.len)
    }
}

/// Incremental decoder fed one link byte at a time.
#[derive(Debug, Clone, Default)]
pub struct CredentialDecoder {
    buf: [u8; MAX_CREDENTIAL_LEN],
    len: usize,
    overflow: usize,
}

impl CredentialDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(credential))` when a terminator completes a frame and
    /// `Ok(None)` while a frame is still accumulating.
    ///
    /// # Errors
    ///
    /// `CredentialTooLong` when the terminator closes a frame whose payload
    /// exceeded [`MAX_CREDENTIAL_LEN`]. The decoder is reset either way.
    pub fn push(&mut self, byte: u8) -> Result<Option<Credential>, ProtoError> {
        if byte == TERMINATOR {
            let result = if self.overflow > 0 {
                Err(ProtoError::CredentialTooLong {
                    len: self.len + self.overflow,
                    max: MAX_CREDENTIAL_LEN,
                })
            } else {
                Credential::new(&self.buf[..self.len]).map(Some)
            };
            self.reset();
            return result;
        }

        if self.len < MAX_CREDENTIAL_LEN {
            self.buf[self.len] = byte;
            self.len += 1;
        } else {
            self.overflow += 1;
        }
        Ok(None)
    }

    /// True while part of a frame has been received.
    pub fn is_mid_frame(&self) -> bool {
        self.len > 0 || self.overflow > 0
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.len = 0;
        self.overflow = 0;
    }
}
