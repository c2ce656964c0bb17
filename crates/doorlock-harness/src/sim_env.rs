//! Simulated environment for turmoil hosts.

use std::time::{Duration, Instant};

use doorlock_core::Environment;

/// Environment backed by the turmoil virtual clock.
///
/// Turmoil drives each host's tokio runtime with paused time, so tokio's
/// clock and sleeps advance only as the simulation steps.
#[derive(Debug, Clone, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Create a new simulated environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
