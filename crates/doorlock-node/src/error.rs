//! Node runtime error types.

use std::io;

use doorlock_core::{ProtocolError, StorageError, TimerJob};
use thiserror::Error;

/// Errors that stop a node runtime.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Link I/O failed or the peer hung up
    #[error("link error: {0}")]
    Link(#[source] io::Error),

    /// Protocol error the node cannot recover from
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Credential store failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Keypad input ended
    #[error("operator input closed")]
    OperatorClosed,

    /// The node waited on a timer nobody bound
    #[error("no {0} timer bound")]
    TimerMissing(TimerJob),
}

impl NodeError {
    /// Keypad failures: end of input stops the node, anything else is I/O.
    pub fn from_keypad(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof { Self::OperatorClosed } else { Self::Link(err) }
    }
}
