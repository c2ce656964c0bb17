//! Operations for model-based testing.
//!
//! Operations are what an operator can do at the keypad, plus idle time.
//! They are generated randomly by proptest and applied to both the model and
//! the coupled state machines.

use arbitrary::Arbitrary;
use doorlock_proto::Intent;

/// Menu choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModelIntent {
    /// `+`
    Open,
    /// `-`
    Change,
}

impl ModelIntent {
    /// Protocol intent.
    pub fn intent(self) -> Intent {
        match self {
            Self::Open => Intent::OpenDoor,
            Self::Change => Intent::ChangeCredential,
        }
    }

    /// Keypad key selecting this intent.
    pub fn key(self) -> u8 {
        self.intent().message().to_byte()
    }
}

/// Small credential space so random guesses hit the stored one often.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct ModelPin {
    /// Pin seed (expanded to digits).
    pub seed: u8,
}

impl ModelPin {
    /// Distinct pins the seed space maps onto.
    pub const SPACE: u8 = 6;

    /// Expand to keypad digits: one or two copies of a digit in `0..3`.
    pub fn to_bytes(self) -> Vec<u8> {
        let seed = self.seed % Self::SPACE;
        let digit = b'0' + seed / 2;
        vec![digit; 1 + usize::from(seed % 2)]
    }

    /// Keys that type and submit this pin.
    pub fn keys(self) -> Vec<u8> {
        let mut keys = self.to_bytes();
        keys.push(b'=');
        keys
    }
}

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Pick an intent at the menu and type a credential.
    ///
    /// If the previous attempt was rejected the HMI is still prompting for
    /// that attempt's intent and the menu key is ignored.
    Attempt {
        /// Menu choice.
        intent: ModelIntent,
        /// Credential typed.
        pin: ModelPin,
        /// New credential, typed twice if a change is granted.
        replacement: ModelPin,
    },

    /// Nothing happens for a while.
    Idle {
        /// Ticks to let pass.
        ticks: u8,
    },
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Nothing observable happened.
    Ok,

    /// A full door cycle ran.
    Opened,

    /// The stored credential was replaced.
    Changed,

    /// The attempt failed.
    Error(OperationError),
}

/// Ways an attempt can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Wrong credential, attempts remain.
    Rejected,

    /// Wrong credential, attempt budget exhausted.
    LockedOut,
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        !self.is_err()
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

