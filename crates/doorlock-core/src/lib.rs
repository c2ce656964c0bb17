//! Door lock protocol logic.
//!
//! Pure state machines for the two nodes of a door lock sharing one serial
//! link. Nothing in this crate performs I/O: each node takes an event,
//! updates its state and returns the actions a driver must perform.
//!
//! ## Architecture
//!
//! ```text
//! doorlock-core
//!   ├─ ControlNode        (verifies credentials, drives motor and alarm)
//!   ├─ HmiNode            (keypad and display side, initiates exchanges)
//!   ├─ Session            (attempt budget, one per node)
//!   ├─ CredentialManager  (enroll and verify over a CredentialStore)
//!   ├─ DoorTimer          (tick-driven travel flag)
//!   ├─ LockoutTimer       (tick-driven cooldown)
//!   └─ TickChannel        (one callback per timer channel)
//! ```
//!
//! Collaborators the drivers supply: [`link::Link`], [`tick::TickSource`],
//! [`store::CredentialStore`], [`actuator::Actuator`], [`operator::Keypad`],
//! [`operator::StatusDisplay`] and [`env::Environment`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actuator;
pub mod control;
pub mod credential;
pub mod env;
pub mod error;
pub mod hmi;
pub mod link;
pub mod operator;
pub mod session;
pub mod state;
pub mod store;
pub mod tick;
pub mod timer;

pub use actuator::{Actuator, MotorDirection};
pub use control::{ControlAction, ControlEvent, ControlNode};
pub use credential::{CredentialManager, Enrollment, Provisioning, Verification};
pub use env::Environment;
pub use error::{ProtocolError, StorageError};
pub use hmi::{HmiAction, HmiEvent, HmiNode};
pub use link::{Link, StreamLink};
pub use operator::{ENTER_KEY, Keypad, KeypadEntry, Screen, StatusDisplay};
pub use session::{AttemptOutcome, Session};
pub use state::{DoorPhase, Expectation, LogLevel, ProtocolState};
pub use store::{CredentialStore, MemoryStore};
pub use tick::{TickCallback, TickChannel, TickSource, TimerJob};
pub use timer::{DoorTimer, LockoutTimer, TimerSlots};
