//! Environment abstraction for deterministic testing.
//!
//! Drivers read time and sleep through [`Environment`] so the same runtime
//! code runs against the system clock in production and against a virtual
//! clock under simulation. The state machines themselves never see time;
//! they only see ticks.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Isolation: implementations must not share global state

use std::time::{Duration, Instant};

/// Abstract environment providing time and async sleeping.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time. Never decreases.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code sleeps: the tick source between ticks and the
    /// presence poll between samples.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
