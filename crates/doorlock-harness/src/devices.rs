//! Scripted stand-ins for the hardware each node drives.
//!
//! Every device that a test inspects after handing it to a runtime shares
//! its state through an `Arc`, so clones observe the same log.

use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use doorlock_core::{
    Actuator, CredentialStore, Keypad, MemoryStore, MotorDirection, Screen, StatusDisplay,
    StorageError, TickCallback, TickSource,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tick source fired by hand.
#[derive(Default)]
pub struct ManualTicker {
    callback: Option<TickCallback>,
    fired: u64,
}

impl ManualTicker {
    /// Idle ticker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one tick. Returns whether a callback was bound to receive it.
    pub fn fire(&mut self) -> bool {
        match self.callback.as_mut() {
            Some(callback) => {
                callback();
                self.fired += 1;
                true
            },
            None => false,
        }
    }

    /// Ticks delivered to a bound callback so far.
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

impl TickSource for ManualTicker {
    fn bind(&mut self, callback: TickCallback) {
        self.callback = Some(callback);
    }

    fn unbind(&mut self) {
        self.callback = None;
    }

    fn is_bound(&self) -> bool {
        self.callback.is_some()
    }
}

/// One output change on the Control node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorEvent {
    /// Motor direction and duty.
    Motor(MotorDirection, u8),
    /// Alarm on or off.
    Alarm(bool),
}

#[derive(Debug, Default)]
struct ActuatorState {
    events: Vec<ActuatorEvent>,
    occupied_polls: u32,
}

/// Actuator that logs outputs and reports someone in the doorway for a fixed
/// number of polls after each opening.
#[derive(Debug, Clone)]
pub struct ScriptedActuator {
    state: Arc<Mutex<ActuatorState>>,
    presence_polls: u32,
}

impl ScriptedActuator {
    /// Report presence for `presence_polls` samples once the door opens.
    pub fn new(presence_polls: u32) -> Self {
        Self { state: Arc::new(Mutex::new(ActuatorState::default())), presence_polls }
    }

    /// Every output change so far.
    pub fn events(&self) -> Vec<ActuatorEvent> {
        lock(&self.state).events.clone()
    }

    /// Last motor direction driven, `Stop` if none.
    pub fn motor(&self) -> MotorDirection {
        lock(&self.state)
            .events
            .iter()
            .rev()
            .find_map(|event| match event {
                ActuatorEvent::Motor(direction, _) => Some(*direction),
                ActuatorEvent::Alarm(_) => None,
            })
            .unwrap_or_default()
    }

    /// Whether the alarm is currently on.
    pub fn alarm(&self) -> bool {
        lock(&self.state)
            .events
            .iter()
            .rev()
            .find_map(|event| match event {
                ActuatorEvent::Alarm(on) => Some(*on),
                ActuatorEvent::Motor(..) => None,
            })
            .unwrap_or(false)
    }
}

impl Actuator for ScriptedActuator {
    fn drive_motor(&mut self, direction: MotorDirection, speed_percent: u8) {
        let mut state = lock(&self.state);
        if direction == MotorDirection::Clockwise {
            state.occupied_polls = self.presence_polls;
        }
        state.events.push(ActuatorEvent::Motor(direction, speed_percent));
    }

    fn presence_detected(&mut self) -> bool {
        let mut state = lock(&self.state);
        if state.occupied_polls == 0 {
            return false;
        }
        state.occupied_polls -= 1;
        true
    }

    fn set_alarm(&mut self, on: bool) {
        lock(&self.state).events.push(ActuatorEvent::Alarm(on));
    }
}

/// Keypad replaying a fixed key sequence, then reporting end of input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeypad {
    keys: VecDeque<u8>,
}

impl ScriptedKeypad {
    /// Keypad that will yield `keys` in order.
    pub fn new(keys: &[u8]) -> Self {
        Self { keys: keys.iter().copied().collect() }
    }

    /// Append more keys.
    pub fn press(&mut self, keys: &[u8]) {
        self.keys.extend(keys.iter().copied());
    }

    /// Next key without blocking.
    pub fn pop(&mut self) -> Option<u8> {
        self.keys.pop_front()
    }
}

#[async_trait]
impl Keypad for ScriptedKeypad {
    async fn next_key(&mut self) -> io::Result<u8> {
        self.pop().ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

/// Display that records every screen shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    screens: Arc<Mutex<Vec<Screen>>>,
}

impl RecordingDisplay {
    /// Empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Screens in the order shown.
    pub fn screens(&self) -> Vec<Screen> {
        lock(&self.screens).clone()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, screen: Screen) {
        lock(&self.screens).push(screen);
    }
}

/// Memory store whose reads and writes can be made to fail.
///
/// Clones share the switches, so a test keeps a handle after moving the
/// store into a node.
#[derive(Debug, Clone, Default)]
pub struct ChaoticStore {
    inner: MemoryStore,
    reject_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl ChaoticStore {
    /// Healthy store over fresh erased cells.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or stop rejecting writes.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Start or stop failing reads.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Backing cells.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl CredentialStore for ChaoticStore {
    fn write(&mut self, offset: u16, bytes: &[u8]) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected { offset });
        }
        self.inner.write(offset, bytes)
    }

    fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other(format!("read fault at {offset:#06x}"))));
        }
        self.inner.read(offset, len)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[test]
    fn manual_ticker_fires_only_when_bound() {
        let count = Arc::new(AtomicU32::new(0));
        let mut ticker = ManualTicker::new();
        assert!(!ticker.fire());

        let seen = Arc::clone(&count);
        ticker.bind(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(ticker.fire());
        assert!(ticker.fire());
        ticker.unbind();
        assert!(!ticker.fire());

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(ticker.fired(), 2);
    }

    #[test]
    fn presence_holds_for_the_scripted_polls() {
        let mut actuator = ScriptedActuator::new(2);
        assert!(!actuator.presence_detected());

        actuator.drive_motor(MotorDirection::Clockwise, 100);
        actuator.drive_motor(MotorDirection::Stop, 0);
        assert!(actuator.presence_detected());
        assert!(actuator.presence_detected());
        assert!(!actuator.presence_detected());
        assert_eq!(actuator.motor(), MotorDirection::Stop);
    }

    #[test]
    fn alarm_tracks_the_last_change() {
        let mut actuator = ScriptedActuator::new(0);
        assert!(!actuator.alarm());
        actuator.set_alarm(true);
        assert!(actuator.alarm());
        actuator.set_alarm(false);
        assert!(!actuator.alarm());
    }

    #[test]
    fn rejected_writes_leave_cells_untouched() {
        let mut store = ChaoticStore::new();
        store.reject_writes(true);
        assert!(matches!(store.write(0, b"x"), Err(StorageError::WriteRejected { offset: 0 })));
        assert_eq!(store.read(0, 1).unwrap(), vec![0xFF]);

        store.reject_writes(false);
        store.write(0, b"x").unwrap();
        assert_eq!(store.inner().snapshot()[0], b'x');
    }
}
