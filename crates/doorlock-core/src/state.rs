//! Protocol states shared by both node state machines.
//!
//! ```text
//!              'A'                 pair confirmed
//! ┌───────────┐    ┌───────────┐ ─────────────────> ┌─────────────────┐
//! │ AwaitSync │───>│ Enrolling │                     │ AwaitCredential │<─────────┐
//! └───────────┘    └───────────┘ <───────────┐       └─────────────────┘          │
//!                        ▲                    │        │ 'T'        │ 3rd 'F'      │
//!                        │ '-'                │        ▼            ▼              │
//!                        │            ┌─────────────┐       ┌─────────┐   expiry   │
//!                        └────────────│ AwaitIntent │       │ Lockout │────────────┤
//!                                     └─────────────┘       └─────────┘            │
//!                                            │ '+'                                 │
//!                                            ▼                                     │
//!                          ┌──────────────────────────────────┐       'D'          │
//!                          │ Cycling(Opening→Passing→Closing) │────────────────────┘
//!                          └──────────────────────────────────┘
//! ```
//!
//! A protocol violation in any post-rendezvous state returns the node to
//! `AwaitCredential` (or `Enrolling` if nothing is enrolled yet).

use std::fmt;

/// Door movement phase within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorPhase {
    /// Motor clockwise until the travel timer flags open
    Opening,
    /// Door held open until the presence sensor clears
    Passing,
    /// Motor counter-clockwise until the travel timer flags closed
    Closing,
}

/// Protocol state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    /// Sync sent, discarding input until the peer's sync arrives
    AwaitSync,
    /// Credential and confirmation being exchanged
    Enrolling,
    /// Idle, waiting for a login attempt
    AwaitCredential,
    /// Authenticated, waiting for the operator's request
    AwaitIntent,
    /// Running a door cycle
    Cycling(DoorPhase),
    /// Alarm cooldown after exhausting the attempt budget
    Lockout,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitSync => f.write_str("await-sync"),
            Self::Enrolling => f.write_str("enrolling"),
            Self::AwaitCredential => f.write_str("await-credential"),
            Self::AwaitIntent => f.write_str("await-intent"),
            Self::Cycling(DoorPhase::Opening) => f.write_str("cycling/opening"),
            Self::Cycling(DoorPhase::Passing) => f.write_str("cycling/passing"),
            Self::Cycling(DoorPhase::Closing) => f.write_str("cycling/closing"),
            Self::Lockout => f.write_str("lockout"),
        }
    }
}

/// The input a node blocks on next.
///
/// Drivers obtain exactly this input and feed it back as an event. Every wait
/// is unbounded unless the driver applies its own link timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Next byte from the link.
    Link {
        /// The peer owes this node a reply, so silence is a fault rather than
        /// an idle operator.
        reply_pending: bool,
    },
    /// Operator picks open or change on the keypad.
    OperatorIntent,
    /// Operator types a credential on the keypad.
    OperatorCredential,
    /// Door travel timer flag reaches this value.
    DoorFlag {
        /// Awaited flag value: true once opened, false once closed
        open: bool,
    },
    /// Presence sensor reports nobody in the doorway.
    PresenceClear,
    /// Lockout timer reports the cooldown finished.
    LockoutExpiry,
}

/// Severity of a log entry emitted as an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug-level detail
    Debug,
    /// Informational milestone
    Info,
    /// Recoverable fault
    Warn,
}
