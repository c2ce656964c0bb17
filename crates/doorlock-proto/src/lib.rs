//! Door lock link protocol definitions.
//!
//! Shared by both nodes of the lock: the HMI node (keypad and display) and the
//! Control node (motor, presence sensor, alarm). Every byte value, tick
//! threshold and store offset lives here exactly once so the two node
//! implementations cannot drift apart.
//!
//! # Wire format
//!
//! The link is a reliable, ordered byte channel. Control traffic is a single
//! byte drawn from the closed [`Message`] alphabet. Credentials travel as raw
//! bytes followed by the [`TERMINATOR`] byte:
//!
//! ```text
//! ┌─────────────────────────┬─────┐
//! │ payload (0..=5 bytes)   │ '#' │
//! └─────────────────────────┴─────┘
//! ```
//!
//! There is no escaping; a payload may not contain the terminator.
//!
//! # Components
//!
//! - [`message`]: the single-byte control alphabet and operator [`Intent`]
//! - [`credential`]: the [`Credential`] value type and its framing codec
//! - [`config`]: tick thresholds, attempt limit, store layout, link settings
//! - [`error`]: protocol-level decode errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credential;
pub mod error;
pub mod message;

pub use config::{
    ATTEMPT_LIMIT, CREDENTIAL_OFFSET, DOOR_TRAVEL_TICKS, LOCKOUT_TICKS, LinkSettings, Parity,
    ProtocolConfig,
};
pub use credential::{Credential, CredentialDecoder, MAX_CREDENTIAL_LEN, TERMINATOR};
pub use error::ProtoError;
pub use message::{Intent, Message, SYNC};
