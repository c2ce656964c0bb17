//! Periodic tick source and its binding discipline.
//!
//! A physical timer channel holds at most one callback. Door travel and
//! lockout share the channel at different times, so every bind goes through
//! [`TickChannel`], which unbinds first.

use std::fmt;

/// Zero-argument callback fired once per tick.
///
/// Runs in tick context: it may only touch the atomic timer cells, never the
/// store or the actuator.
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// What a bound callback is timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerJob {
    /// Door travel, toggling the open flag every threshold.
    DoorTravel,
    /// Lockout cooldown, finishing once at the threshold.
    Lockout,
}

impl fmt::Display for TimerJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoorTravel => f.write_str("door-travel"),
            Self::Lockout => f.write_str("lockout"),
        }
    }
}

/// One hardware timer channel.
pub trait TickSource {
    /// Install `callback`. The channel starts ticking immediately.
    fn bind(&mut self, callback: TickCallback);

    /// Remove the installed callback, if any.
    fn unbind(&mut self);

    /// Whether a callback is installed.
    fn is_bound(&self) -> bool;
}

/// Enforces unbind-before-bind on a [`TickSource`].
#[derive(Debug)]
pub struct TickChannel<T> {
    source: T,
    bound: Option<TimerJob>,
}

impl<T: TickSource> TickChannel<T> {
    /// Wrap an idle source.
    pub fn new(source: T) -> Self {
        Self { source, bound: None }
    }

    /// Bind `callback` for `job`, replacing any bound callback.
    pub fn bind(&mut self, job: TimerJob, callback: TickCallback) {
        if let Some(previous) = self.bound {
            tracing::warn!(%previous, next = %job, "tick channel rebound while active");
        }
        self.unbind();
        self.source.bind(callback);
        self.bound = Some(job);
    }

    /// Unbind whatever is bound. Idempotent.
    pub fn unbind(&mut self) {
        if self.source.is_bound() {
            self.source.unbind();
        }
        self.bound = None;
    }

    /// The job currently bound.
    pub fn bound(&self) -> Option<TimerJob> {
        self.bound
    }

    /// Underlying source.
    pub fn source(&self) -> &T {
        &self.source
    }

    /// Underlying source, mutably.
    pub fn source_mut(&mut self) -> &mut T {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        callback: Option<TickCallback>,
        binds: usize,
        unbinds: usize,
    }

    impl CountingSource {
        fn fire(&mut self) {
            if let Some(callback) = self.callback.as_mut() {
                callback();
            }
        }
    }

    impl TickSource for CountingSource {
        fn bind(&mut self, callback: TickCallback) {
            assert!(self.callback.is_none(), "bound twice without unbind");
            self.binds += 1;
            self.callback = Some(callback);
        }

        fn unbind(&mut self) {
            self.unbinds += 1;
            self.callback = None;
        }

        fn is_bound(&self) -> bool {
            self.callback.is_some()
        }
    }

    fn counter() -> (Arc<AtomicUsize>, TickCallback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&hits);
        (hits, Box::new(move || {
            inner.fetch_add(1, Ordering::Relaxed);
        }))
    }

    #[test]
    fn rebind_unbinds_first() {
        let mut channel = TickChannel::new(CountingSource::default());
        let (door_hits, door) = counter();
        let (lockout_hits, lockout) = counter();

        channel.bind(TimerJob::DoorTravel, door);
        channel.source_mut().fire();
        channel.bind(TimerJob::Lockout, lockout);
        channel.source_mut().fire();

        assert_eq!(door_hits.load(Ordering::Relaxed), 1);
        assert_eq!(lockout_hits.load(Ordering::Relaxed), 1);
        assert_eq!(channel.bound(), Some(TimerJob::Lockout));
        assert_eq!(channel.source().binds, 2);
        assert_eq!(channel.source().unbinds, 1);
    }

    #[test]
    fn unbind_is_idempotent() {
        let mut channel = TickChannel::new(CountingSource::default());
        channel.unbind();
        channel.unbind();
        assert_eq!(channel.source().unbinds, 0);
        assert_eq!(channel.bound(), None);
    }
}
