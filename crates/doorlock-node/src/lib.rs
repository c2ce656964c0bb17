//! Door lock hosted node runtime.
//!
//! Runs either node of the door lock as a process:
//! - Tokio for the async runtime and the emulated serial link (TCP)
//! - An interval task as the hardware tick source
//! - A file as the EEPROM holding the credential record
//!
//! ## Architecture
//!
//! ```text
//! doorlock-node
//!   ├─ ControlRuntime   (drives ControlNode: link, actuator, timers, store)
//!   ├─ HmiRuntime       (drives HmiNode: link, keypad, display, timers)
//!   ├─ SystemEnv        (production Environment impl)
//!   ├─ IntervalTicker   (tick source)
//!   ├─ FileStore        (EEPROM image)
//!   └─ devices          (console actuator, stream keypad, log display)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod control;
pub mod devices;
mod error;
mod executor;
mod file_store;
mod hmi;
pub mod link;
mod system_env;
mod ticker;

pub use config::{DEFAULT_TICK_PERIOD, NodeConfig};
pub use control::ControlRuntime;
pub use devices::{ConsoleActuator, LogDisplay, StreamKeypad};
pub use error::NodeError;
pub use file_store::FileStore;
pub use hmi::HmiRuntime;
pub use link::TcpLink;
pub use system_env::SystemEnv;
pub use ticker::IntervalTicker;
