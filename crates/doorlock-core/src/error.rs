//! Protocol and storage error types.

use doorlock_proto::ProtoError;
use thiserror::Error;

use crate::state::ProtocolState;

/// Credential store failures.
///
/// Always fatal: continuing after a failed read or write could authenticate
/// against a credential nobody enrolled.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Access falls outside the store.
    #[error("store access {offset:#06x}+{len} outside capacity {capacity}")]
    OutOfBounds {
        /// Start offset
        offset: u16,
        /// Access length
        len: usize,
        /// Store size in bytes
        capacity: usize,
    },

    /// Length header holds an impossible value.
    #[error("corrupt credential record: length byte {length}")]
    Corrupt {
        /// Raw length byte
        length: u8,
    },

    /// Backing device rejected a write.
    #[error("write rejected at {offset:#06x}")]
    WriteRejected {
        /// Start offset
        offset: u16,
    },

    /// Backing file I/O failed.
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the node state machines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Peer sent a byte the current state does not accept.
    #[error("protocol violation in {state}: unexpected byte {received:#04x}")]
    Violation {
        /// State when the byte arrived
        state: ProtocolState,
        /// Offending byte
        received: u8,
    },

    /// Credential frame could not be decoded.
    #[error("framing violation in {state}: {source}")]
    Framing {
        /// State when the frame closed
        state: ProtocolState,
        /// Decode failure
        #[source]
        source: ProtoError,
    },

    /// Peer stayed silent while it owed a reply.
    #[error("link silent in {state} while a reply was pending")]
    LinkTimeout {
        /// State while waiting
        state: ProtocolState,
    },

    /// Driver fed an event the current state cannot take.
    #[error("event {event} is not valid in {state}")]
    InvalidState {
        /// Current state
        state: ProtocolState,
        /// Event name
        event: &'static str,
    },

    /// Credential store failed.
    #[error("credential store: {0}")]
    Storage(#[from] StorageError),
}

impl ProtocolError {
    /// Returns true if the node cannot continue.
    ///
    /// Violations, framing faults and link timeouts reset the node to its
    /// post-rendezvous idle state. Storage faults and driver misuse stop it.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Violation { .. } | Self::Framing { .. } | Self::LinkTimeout { .. } => false,
            Self::InvalidState { .. } | Self::Storage(_) => true,
        }
    }
}
