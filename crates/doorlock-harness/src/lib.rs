//! Deterministic test harness for the door lock protocol.
//!
//! Two ways to run both nodes together:
//!
//! - [`Bench`]: the two state machines coupled in-process, with ticks
//!   delivered by hand. Every run is deterministic and measured in ticks.
//! - [`SimEnv`] and [`sim_link`]: turmoil-backed environment and link for
//!   running the real async runtimes over a simulated TCP connection with
//!   virtual time.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of what an
//! operator observes. Operations are applied to both the model and a
//! [`Bench`], and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bench;
pub mod devices;
pub mod model;
pub mod sim_env;
pub mod sim_link;

pub use bench::{Bench, Fault, NodeId, Wire};
pub use devices::{
    ActuatorEvent, ChaoticStore, ManualTicker, RecordingDisplay, ScriptedActuator, ScriptedKeypad,
};
pub use model::{
    ModelIntent, ModelPin, ModelWorld, ObservableState, Operation, OperationError,
    OperationResult,
};
pub use sim_env::SimEnv;
pub use sim_link::SimLink;
