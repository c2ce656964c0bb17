//! Tick-driven timer cells for door travel and lockout.
//!
//! # Concurrency
//!
//! Each cell has exactly one writer per field. The tick callback owns the
//! counter and the flag while bound; the main loop only reads the flag and
//! wakes on the cell's [`Notify`]. A fresh cell is created for every door
//! cycle and every lockout, so the main loop never resets a cell the
//! callback could still be writing.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use doorlock_proto::ProtocolConfig;
use tokio::sync::Notify;

use crate::tick::{TickCallback, TickChannel, TickSource, TimerJob};

/// Door travel timer.
///
/// Counts ticks and toggles the open flag every `threshold` ticks, then
/// starts counting again. It has no notion of opening or closing; the caller
/// decides motor direction from the flag it waits for.
#[derive(Debug)]
pub struct DoorTimer {
    threshold: u32,
    ticks: AtomicU32,
    open: AtomicBool,
    notify: Notify,
}

impl DoorTimer {
    /// Closed door, zero ticks.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            ticks: AtomicU32::new(0),
            open: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Count one tick. Returns true if this tick toggled the flag.
    pub fn tick(&self) -> bool {
        let ticks = self.ticks.load(Ordering::Acquire) + 1;
        if ticks < self.threshold {
            self.ticks.store(ticks, Ordering::Release);
            return false;
        }

        self.ticks.store(0, Ordering::Release);
        self.open.fetch_xor(true, Ordering::AcqRel);
        self.notify.notify_one();
        true
    }

    /// Current flag value.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Ticks counted since the last toggle.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Ticks per toggle.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Wait until the flag equals `open`. Unbounded.
    pub async fn wait_for(&self, open: bool) {
        while self.is_open() != open {
            self.notify.notified().await;
        }
    }

    /// Callback that ticks this cell.
    pub fn callback(self: &Arc<Self>) -> TickCallback {
        let cell = Arc::clone(self);
        Box::new(move || {
            cell.tick();
        })
    }
}

/// Lockout cooldown timer. Finishes exactly once.
#[derive(Debug)]
pub struct LockoutTimer {
    threshold: u32,
    ticks: AtomicU32,
    finished: AtomicBool,
    notify: Notify,
}

impl LockoutTimer {
    /// Fresh cooldown.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            ticks: AtomicU32::new(0),
            finished: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Count one tick. Returns true only for the tick that finished the
    /// cooldown.
    pub fn tick(&self) -> bool {
        if self.is_finished() {
            return false;
        }

        let ticks = self.ticks.load(Ordering::Acquire) + 1;
        self.ticks.store(ticks, Ordering::Release);
        if ticks < self.threshold {
            return false;
        }

        self.finished.store(true, Ordering::Release);
        self.notify.notify_one();
        true
    }

    /// Whether the cooldown is over.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Ticks counted so far.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Wait until the cooldown is over. Unbounded.
    pub async fn wait_finished(&self) {
        while !self.is_finished() {
            self.notify.notified().await;
        }
    }

    /// Callback that ticks this cell.
    pub fn callback(self: &Arc<Self>) -> TickCallback {
        let cell = Arc::clone(self);
        Box::new(move || {
            cell.tick();
        })
    }
}

/// The node's single tick channel together with its live timer cells.
///
/// Drivers forward `BindTimer` and `UnbindTimer` actions here. The door cell
/// survives the unbind that follows opening, so the closing leg continues
/// toggling the same flag back to closed.
#[derive(Debug)]
pub struct TimerSlots<T> {
    channel: TickChannel<T>,
    door_travel_ticks: u32,
    lockout_ticks: u32,
    door: Option<Arc<DoorTimer>>,
    lockout: Option<Arc<LockoutTimer>>,
}

impl<T: TickSource> TimerSlots<T> {
    /// Idle slots on `source` with thresholds from `config`.
    pub fn new(source: T, config: &ProtocolConfig) -> Self {
        Self {
            channel: TickChannel::new(source),
            door_travel_ticks: config.door_travel_ticks,
            lockout_ticks: config.lockout_ticks,
            door: None,
            lockout: None,
        }
    }

    /// Bind the callback for `job`.
    pub fn bind(&mut self, job: TimerJob) {
        let callback = match job {
            TimerJob::DoorTravel => {
                let threshold = self.door_travel_ticks;
                self.door.get_or_insert_with(|| Arc::new(DoorTimer::new(threshold))).callback()
            },
            TimerJob::Lockout => {
                let cell = Arc::new(LockoutTimer::new(self.lockout_ticks));
                let callback = cell.callback();
                self.lockout = Some(cell);
                callback
            },
        };
        self.channel.bind(job, callback);
    }

    /// Unbind, then drop cells whose job is complete.
    pub fn unbind(&mut self) {
        self.channel.unbind();
        if self.door.as_ref().is_some_and(|door| !door.is_open()) {
            self.door = None;
        }
        self.lockout = None;
    }

    /// Unbind and drop every cell.
    pub fn reset(&mut self) {
        self.channel.unbind();
        self.door = None;
        self.lockout = None;
    }

    /// Live door cell.
    pub fn door(&self) -> Option<Arc<DoorTimer>> {
        self.door.clone()
    }

    /// Live lockout cell.
    pub fn lockout(&self) -> Option<Arc<LockoutTimer>> {
        self.lockout.clone()
    }

    /// Job currently bound.
    pub fn bound(&self) -> Option<TimerJob> {
        self.channel.bound()
    }

    /// Underlying tick source.
    pub fn source(&self) -> &T {
        self.channel.source()
    }

    /// Underlying tick source, mutably.
    pub fn source_mut(&mut self) -> &mut T {
        self.channel.source_mut()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn door_flag_toggles_exactly_at_threshold() {
        let door = DoorTimer::new(15);
        for _ in 0..14 {
            assert!(!door.tick());
        }
        assert!(!door.is_open());
        assert!(door.tick());
        assert!(door.is_open());
        assert_eq!(door.ticks(), 0);

        for _ in 0..14 {
            assert!(!door.tick());
        }
        assert!(door.is_open());
        assert!(door.tick());
        assert!(!door.is_open());
    }

    #[test]
    fn lockout_finishes_once() {
        let lockout = LockoutTimer::new(60);
        let fired = (0..200).filter(|_| lockout.tick()).count();
        assert_eq!(fired, 1);
        assert!(lockout.is_finished());
        assert_eq!(lockout.ticks(), 60);
    }

    proptest! {
        #[test]
        fn door_toggles_every_threshold(threshold in 1u32..40, ticks in 0u32..400) {
            let door = DoorTimer::new(threshold);
            let toggles = (0..ticks).filter(|_| door.tick()).count() as u32;
            prop_assert_eq!(toggles, ticks / threshold);
            prop_assert_eq!(door.is_open(), toggles % 2 == 1);
        }

        #[test]
        fn lockout_never_finishes_early(ticks in 0u32..60) {
            let lockout = LockoutTimer::new(60);
            for _ in 0..ticks {
                lockout.tick();
            }
            prop_assert!(!lockout.is_finished());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_wakes_on_toggle() {
        let door = Arc::new(DoorTimer::new(3));
        let ticker = Arc::clone(&door);
        let handle = tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                ticker.tick();
            }
        });

        door.wait_for(true).await;
        assert!(door.is_open());
        handle.await.unwrap();
    }

    #[derive(Clone, Default)]
    struct SharedSource(Arc<Mutex<Option<TickCallback>>>);

    impl SharedSource {
        fn fire(&self) {
            if let Some(callback) = self.0.lock().unwrap().as_mut() {
                callback();
            }
        }
    }

    impl TickSource for SharedSource {
        fn bind(&mut self, callback: TickCallback) {
            *self.0.lock().unwrap() = Some(callback);
        }

        fn unbind(&mut self) {
            *self.0.lock().unwrap() = None;
        }

        fn is_bound(&self) -> bool {
            self.0.lock().unwrap().is_some()
        }
    }

    #[test]
    fn door_cell_survives_the_open_unbind() {
        let source = SharedSource::default();
        let mut slots = TimerSlots::new(source.clone(), &ProtocolConfig::default());

        slots.bind(TimerJob::DoorTravel);
        for _ in 0..15 {
            source.fire();
        }
        slots.unbind();
        assert!(slots.door().unwrap().is_open());

        slots.bind(TimerJob::DoorTravel);
        for _ in 0..15 {
            source.fire();
        }
        assert!(!slots.door().unwrap().is_open());
        slots.unbind();
        assert!(slots.door().is_none());
    }

    #[test]
    fn lockout_cell_is_fresh_each_time() {
        let source = SharedSource::default();
        let mut slots = TimerSlots::new(source.clone(), &ProtocolConfig::default());

        slots.bind(TimerJob::Lockout);
        for _ in 0..60 {
            source.fire();
        }
        assert!(slots.lockout().unwrap().is_finished());
        slots.unbind();
        assert!(slots.lockout().is_none());

        slots.bind(TimerJob::Lockout);
        assert_eq!(slots.lockout().unwrap().ticks(), 0);
        assert_eq!(slots.bound(), Some(TimerJob::Lockout));
    }
}
