//! Reference model for model-based testing.
//!
//! The model captures what an operator observes of the door lock (which
//! attempts open the door, which change the credential, when the system
//! locks) without links, timers or framing. It is the oracle the coupled
//! state machines are checked against.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Observable behavior only: no wire bytes, no tick counts
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod world;

pub use operation::{ModelIntent, ModelPin, Operation, OperationError, OperationResult};
pub use world::{ModelWorld, ObservableState};
