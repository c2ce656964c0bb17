//! Interval-driven tick source.
//!
//! Stands in for the hardware timer compare interrupt: a spawned task sleeps
//! one period through the [`Environment`] and fires the bound callback.

use std::time::Duration;

use doorlock_core::{Environment, TickCallback, TickSource};
use tokio::task::JoinHandle;

/// Tick source backed by a tokio task.
///
/// Must be bound from inside a tokio runtime.
#[derive(Debug)]
pub struct IntervalTicker<E> {
    env: E,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl<E: Environment> IntervalTicker<E> {
    /// Idle ticker firing every `period` once bound.
    pub fn new(env: E, period: Duration) -> Self {
        Self { env, period, task: None }
    }
}

impl<E: Environment> TickSource for IntervalTicker<E> {
    fn bind(&mut self, mut callback: TickCallback) {
        self.unbind();
        let env = self.env.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            loop {
                env.sleep(period).await;
                callback();
            }
        }));
    }

    fn unbind(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_bound(&self) -> bool {
        self.task.is_some()
    }
}

impl<E> Drop for IntervalTicker<E> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;
    use crate::system_env::SystemEnv;

    fn counting() -> (Arc<AtomicU32>, TickCallback) {
        let count = Arc::new(AtomicU32::new(0));
        let inner = Arc::clone(&count);
        (count, Box::new(move || {
            inner.fetch_add(1, Ordering::Relaxed);
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period() {
        let mut ticker = IntervalTicker::new(SystemEnv::new(), Duration::from_secs(1));
        let (count, callback) = counting();
        ticker.bind(callback);

        tokio::time::sleep(Duration::from_millis(15_500)).await;
        assert_eq!(count.load(Ordering::Relaxed), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn unbind_stops_ticks() {
        let mut ticker = IntervalTicker::new(SystemEnv::new(), Duration::from_secs(1));
        let (count, callback) = counting();
        ticker.bind(callback);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        ticker.unbind();
        assert!(!ticker.is_bound());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
