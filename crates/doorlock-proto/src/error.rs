//! Protocol decode errors.

use thiserror::Error;

/// Errors raised while interpreting bytes from the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// Byte is not part of the control alphabet.
    #[error("unknown message byte {0:#04x}")]
    UnknownMessage(u8),

    /// Credential payload ran past the maximum length before its terminator.
    #[error("credential payload of {len} bytes exceeds maximum of {max}")]
    CredentialTooLong {
        /// Payload bytes seen before the terminator.
        len: usize,
        /// Maximum payload length.
        max: usize,
    },

    /// Credential payload contains the terminator byte.
    #[error("credential payload contains the terminator byte")]
    TerminatorInPayload,

    /// Frame ended without a terminator.
    #[error("credential frame is missing its terminator")]
    MissingTerminator,
}
