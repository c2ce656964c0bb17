//! Both node runtimes over an in-memory link with a paused clock.
//!
//! Keypad input is scripted; the HMI runs until the script is exhausted.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use doorlock_core::{
    CredentialStore, MemoryStore, MotorDirection, ProtocolError, ProtocolState, Screen,
    StatusDisplay, StorageError, StreamLink,
};
use doorlock_node::{
    ConsoleActuator, ControlRuntime, HmiRuntime, IntervalTicker, NodeConfig, NodeError,
    StreamKeypad, SystemEnv,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

type DuplexLink = StreamLink<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;
type TestControl = ControlRuntime<
    FaultyStore,
    DuplexLink,
    ConsoleActuator<SystemEnv>,
    IntervalTicker<SystemEnv>,
    SystemEnv,
>;

#[derive(Clone, Default)]
struct RecordingDisplay(Arc<Mutex<Vec<Screen>>>);

impl RecordingDisplay {
    fn screens(&self) -> Vec<Screen> {
        self.0.lock().map(|screens| screens.clone()).unwrap_or_default()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, screen: Screen) {
        if let Ok(mut screens) = self.0.lock() {
            screens.push(screen);
        }
    }
}

/// Memory store with switchable read and write faults.
#[derive(Clone, Default)]
struct FaultyStore {
    inner: MemoryStore,
    fail_reads: bool,
    fail_writes: bool,
}

impl CredentialStore for FaultyStore {
    fn write(&mut self, offset: u16, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteRejected { offset });
        }
        self.inner.write(offset, bytes)
    }

    fn read(&self, offset: u16, len: usize) -> Result<Vec<u8>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Io(std::io::Error::other("bus fault")));
        }
        self.inner.read(offset, len)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

fn link_pair() -> (DuplexLink, DuplexLink) {
    let (hmi, control) = tokio::io::duplex(64);
    let (hmi_read, hmi_write) = tokio::io::split(hmi);
    let (control_read, control_write) = tokio::io::split(control);
    (StreamLink::new(hmi_read, hmi_write), StreamLink::new(control_read, control_write))
}

/// Run both nodes until the HMI keypad script ends. Returns the screens the
/// HMI showed, the control store and the virtual time taken.
async fn run_script(keys: &'static [u8], config: NodeConfig) -> (Vec<Screen>, MemoryStore, Duration) {
    let started = tokio::time::Instant::now();
    let env = SystemEnv::new();
    let (hmi_link, control_link) = link_pair();
    let store = MemoryStore::new();

    let control = ControlRuntime::start(
        config.clone(),
        store.clone(),
        control_link,
        ConsoleActuator::new(env.clone(), Duration::from_secs(3)),
        IntervalTicker::new(env.clone(), config.tick_period),
        env.clone(),
    )
    .await
    .unwrap();
    let control = tokio::spawn(control.run());

    let display = RecordingDisplay::default();
    let mut hmi = HmiRuntime::start(
        config.clone(),
        hmi_link,
        StreamKeypad::new(keys),
        display.clone(),
        IntervalTicker::new(env.clone(), config.tick_period),
        env,
    )
    .await
    .unwrap();

    loop {
        match hmi.step().await {
            Ok(()) => {},
            Err(NodeError::OperatorClosed) => break,
            Err(err) => panic!("hmi failed: {err}"),
        }
    }
    control.abort();

    (display.screens(), store, started.elapsed())
}

#[tokio::test(start_paused = true)]
async fn enroll_then_open_door() {
    let (screens, store, elapsed) = run_script(b"0000=0000=+0000=", NodeConfig::default()).await;

    assert_eq!(
        screens,
        vec![
            Screen::EnterNewCredential,
            Screen::ConfirmCredential,
            Screen::Menu,
            Screen::EnterCurrentCredential,
            Screen::DoorUnlocking,
            Screen::WaitForPassage,
            Screen::DoorLocking,
            Screen::Menu,
        ]
    );
    assert_eq!(&store.snapshot()[0x0200..0x0205], b"\x040000");
    // two door travels of 15 one-second ticks plus the doorway hold
    assert!(elapsed >= Duration::from_secs(33), "cycle took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn three_wrong_entries_lock_out_for_a_minute() {
    let (screens, _, elapsed) = run_script(b"1=1=+9=9=9=", NodeConfig::default()).await;

    assert_eq!(
        screens,
        vec![
            Screen::EnterNewCredential,
            Screen::ConfirmCredential,
            Screen::Menu,
            Screen::EnterCurrentCredential,
            Screen::EnterCurrentCredential,
            Screen::EnterCurrentCredential,
            Screen::SystemLocked,
            Screen::Menu,
        ]
    );
    assert!(elapsed >= Duration::from_secs(60), "lockout took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn mismatched_enrollment_reprompts() {
    let (screens, store, _) = run_script(b"12=13=5=5=", NodeConfig::default()).await;

    assert_eq!(
        screens,
        vec![
            Screen::EnterNewCredential,
            Screen::ConfirmCredential,
            Screen::EnterNewCredential,
            Screen::ConfirmCredential,
            Screen::Menu,
        ]
    );
    assert_eq!(&store.snapshot()[0x0200..0x0202], b"\x015");
}

/// Read from the peer end up to and including `last`.
async fn read_through(peer: &mut DuplexStream, last: u8) -> Vec<u8> {
    let mut seen = Vec::new();
    loop {
        let byte = peer.read_u8().await.unwrap();
        seen.push(byte);
        if byte == last {
            return seen;
        }
    }
}

/// Control runtime whose peer is a raw stream the test writes to.
async fn control_with_peer(store: FaultyStore) -> (TestControl, DuplexStream) {
    let env = SystemEnv::new();
    let config = NodeConfig::default();
    let (control_end, peer) = tokio::io::duplex(64);
    let (read, write) = tokio::io::split(control_end);

    let control = ControlRuntime::start(
        config.clone(),
        store,
        StreamLink::new(read, write),
        ConsoleActuator::new(env.clone(), Duration::from_secs(3)),
        IntervalTicker::new(env.clone(), config.tick_period),
        env,
    )
    .await
    .unwrap();
    (control, peer)
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out_and_hmi_reenrolls() {
    let env = SystemEnv::new();
    let config = NodeConfig { link_timeout: Some(Duration::from_secs(2)), ..NodeConfig::default() };
    let (hmi_end, mut peer) = tokio::io::duplex(64);
    let (read, write) = tokio::io::split(hmi_end);
    let display = RecordingDisplay::default();

    let mut hmi = HmiRuntime::start(
        config.clone(),
        StreamLink::new(read, write),
        StreamKeypad::new(b"1=1=".as_slice()),
        display.clone(),
        IntervalTicker::new(env.clone(), config.tick_period),
        env,
    )
    .await
    .unwrap();

    // Peer answers the rendezvous, then never replies to the enrollment.
    peer.write_all(b"A").await.unwrap();
    let started = tokio::time::Instant::now();
    let err = loop {
        if let Err(err) = hmi.step().await {
            break err;
        }
    };

    assert!(matches!(err, NodeError::OperatorClosed), "{err}");
    assert_eq!(hmi.node().state(), ProtocolState::Enrolling);
    assert_eq!(
        display.screens(),
        vec![Screen::EnterNewCredential, Screen::ConfirmCredential, Screen::EnterNewCredential]
    );
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn rejected_write_stops_control_with_outputs_safe() {
    let store = FaultyStore { fail_writes: true, ..FaultyStore::default() };
    let (mut control, mut peer) = control_with_peer(store).await;

    peer.write_all(b"A1#1#").await.unwrap();
    let err = loop {
        if let Err(err) = control.step().await {
            break err;
        }
    };

    assert!(matches!(
        err,
        NodeError::Protocol(ProtocolError::Storage(StorageError::WriteRejected { offset: 0x0200 }))
    ));
    assert_eq!(control.actuator().motor(), MotorDirection::Stop);
    assert!(!control.actuator().alarm());
}

#[tokio::test(start_paused = true)]
async fn store_fault_during_recovery_stops_control() {
    let store = FaultyStore { fail_reads: true, ..FaultyStore::default() };
    let (mut control, mut peer) = control_with_peer(store).await;

    // Oversized frame forces a recovery, which must read the record header.
    peer.write_all(b"A999999#").await.unwrap();
    let err = loop {
        if let Err(err) = control.step().await {
            break err;
        }
    };

    assert!(matches!(err, NodeError::Protocol(ProtocolError::Storage(StorageError::Io(_)))));
    assert_eq!(control.actuator().motor(), MotorDirection::Stop);
    assert!(!control.actuator().alarm());
}

#[tokio::test(start_paused = true)]
async fn record_outside_the_store_is_refused_at_start() {
    let env = SystemEnv::new();
    let config = NodeConfig::default();
    let (control_end, _peer) = tokio::io::duplex(64);
    let (read, write) = tokio::io::split(control_end);

    let result = ControlRuntime::start(
        config.clone(),
        MemoryStore::with_capacity(0x0100),
        StreamLink::new(read, write),
        ConsoleActuator::new(env.clone(), Duration::from_secs(3)),
        IntervalTicker::new(env.clone(), config.tick_period),
        env,
    )
    .await;
    assert!(matches!(result, Err(NodeError::Storage(StorageError::OutOfBounds { .. }))));
}

#[tokio::test(start_paused = true)]
async fn control_discards_bytes_sent_during_lockout() {
    let (control, mut peer) = control_with_peer(FaultyStore::default()).await;
    let control = tokio::spawn(control.run());

    peer.write_all(b"A1#1#9#9#9#").await.unwrap();
    assert_eq!(read_through(&mut peer, b'W').await, b"ATFFFW");

    // Queued before the lockout ends; would otherwise prefix the next credential.
    peer.write_all(b"77").await.unwrap();
    let started = tokio::time::Instant::now();
    assert_eq!(read_through(&mut peer, b'K').await, b"K");
    assert!(started.elapsed() >= Duration::from_secs(59));

    peer.write_all(b"1#").await.unwrap();
    assert_eq!(peer.read_u8().await.unwrap(), b'T');
    control.abort();
}
