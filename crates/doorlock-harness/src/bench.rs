//! Both state machines coupled in-process over an in-memory wire.
//!
//! The bench plays every driver role at once: it carries bytes between the
//! nodes, types scripted keys, samples the scripted presence sensor and
//! delivers ticks by hand. Ticks are only delivered when neither node can
//! make progress, so a run is fully deterministic and measured in ticks.

use std::{collections::VecDeque, fmt};

use doorlock_core::{
    Actuator, ControlAction, ControlEvent, ControlNode, CredentialManager, CredentialStore,
    Expectation, HmiAction, HmiEvent, HmiNode, KeypadEntry, LogLevel, MemoryStore, MotorDirection,
    ProtocolError, ProtocolState, Screen, StatusDisplay, TimerSlots,
};
use doorlock_proto::{Intent, Message, ProtocolConfig};

use crate::devices::{
    ActuatorEvent, ManualTicker, RecordingDisplay, ScriptedActuator, ScriptedKeypad,
};

/// Motor duty the bench drives at.
pub const MOTOR_SPEED: u8 = 100;

/// Default tick budget for one [`Bench::run`].
pub const DEFAULT_MAX_TICKS: u64 = 10_000;

/// Which node an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    /// Motor, sensor, alarm and store side.
    Control,
    /// Keypad and display side.
    Hmi,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => f.write_str("control"),
            Self::Hmi => f.write_str("hmi"),
        }
    }
}

/// One transmission on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    /// Sender.
    pub from: NodeId,
    /// Bytes written in one action.
    pub bytes: Vec<u8>,
}

/// A recoverable error a node hit and recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Node that raised it.
    pub node: NodeId,
    /// State the node was in.
    pub state: ProtocolState,
    /// Rendered error.
    pub error: String,
}

/// In-process coupling of a [`ControlNode`] and an [`HmiNode`].
pub struct Bench<S = MemoryStore> {
    control: ControlNode<S>,
    hmi: HmiNode,
    control_timers: TimerSlots<ManualTicker>,
    hmi_timers: TimerSlots<ManualTicker>,
    to_control: VecDeque<u8>,
    to_hmi: VecDeque<u8>,
    keypad: ScriptedKeypad,
    entry: KeypadEntry,
    actuator: ScriptedActuator,
    display: RecordingDisplay,
    transcript: Vec<Wire>,
    outputs: Vec<(u64, ActuatorEvent)>,
    logs: Vec<(NodeId, LogLevel, String)>,
    faults: Vec<Fault>,
    ticks: u64,
    max_ticks: u64,
}

impl Bench<MemoryStore> {
    /// Boot both nodes on an erased memory store.
    pub fn new(config: ProtocolConfig, presence_polls: u32) -> Self {
        Self::with_store(config, MemoryStore::new(), presence_polls)
    }

    /// Boot, then enroll `pin` through the keypad.
    pub fn enrolled(config: ProtocolConfig, pin: &str) -> Result<Self, ProtocolError> {
        let mut bench = Self::new(config, 3);
        bench.press(format!("{pin}={pin}=").as_bytes());
        bench.run()?;
        Ok(bench)
    }
}

impl<S: CredentialStore> Bench<S> {
    /// Boot both nodes, Control first, on `store`.
    pub fn with_store(config: ProtocolConfig, store: S, presence_polls: u32) -> Self {
        let manager = CredentialManager::new(store, config.credential_offset);
        let (control, control_boot) = ControlNode::boot(config, manager);
        let (hmi, hmi_boot) = HmiNode::boot(config);

        let mut bench = Self {
            control,
            hmi,
            control_timers: TimerSlots::new(ManualTicker::new(), &config),
            hmi_timers: TimerSlots::new(ManualTicker::new(), &config),
            to_control: VecDeque::new(),
            to_hmi: VecDeque::new(),
            keypad: ScriptedKeypad::default(),
            entry: KeypadEntry::new(),
            actuator: ScriptedActuator::new(presence_polls),
            display: RecordingDisplay::new(),
            transcript: Vec::new(),
            outputs: Vec::new(),
            logs: Vec::new(),
            faults: Vec::new(),
            ticks: 0,
            max_ticks: DEFAULT_MAX_TICKS,
        };
        bench.execute_control(control_boot);
        bench.execute_hmi(hmi_boot);
        bench
    }

    /// Cap the ticks a run may deliver.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Queue keypad presses.
    pub fn press(&mut self, keys: &[u8]) {
        self.keypad.press(keys);
    }

    /// Put raw bytes on the wire towards Control.
    pub fn inject_to_control(&mut self, bytes: &[u8]) {
        self.to_control.extend(bytes.iter().copied());
    }

    /// Put raw bytes on the wire towards the HMI.
    pub fn inject_to_hmi(&mut self, bytes: &[u8]) {
        self.to_hmi.extend(bytes.iter().copied());
    }

    /// Step until neither node can progress and no timer or sensor is
    /// pending, or the tick budget runs out.
    ///
    /// # Errors
    ///
    /// The first fatal error from either node. Recoverable errors are
    /// recovered from and recorded in [`Self::faults`].
    pub fn run(&mut self) -> Result<(), ProtocolError> {
        while self.step()? {}
        Ok(())
    }

    /// Deliver exactly `ticks` ticks, letting both nodes settle after each.
    pub fn advance(&mut self, ticks: u64) -> Result<(), ProtocolError> {
        for _ in 0..ticks {
            self.settle()?;
            self.tick();
        }
        self.settle()
    }

    /// Make one unit of progress. Returns false once the bench is idle.
    pub fn step(&mut self) -> Result<bool, ProtocolError> {
        if self.step_control()? || self.step_hmi()? {
            return Ok(true);
        }

        let waiting = self.control_timers.bound().is_some()
            || self.hmi_timers.bound().is_some()
            || self.control.expecting() == Expectation::PresenceClear;
        if !waiting || self.ticks >= self.max_ticks {
            return Ok(false);
        }
        self.tick();
        Ok(true)
    }

    fn settle(&mut self) -> Result<(), ProtocolError> {
        while self.step_control()? || self.step_hmi()? {}
        Ok(())
    }

    fn tick(&mut self) {
        self.control_timers.source_mut().fire();
        self.hmi_timers.source_mut().fire();
        self.ticks += 1;
    }

    fn step_control(&mut self) -> Result<bool, ProtocolError> {
        let state = self.control.state();
        let event = match self.control.expecting() {
            Expectation::Link { .. } => self.to_control.pop_front().map(ControlEvent::Received),
            Expectation::DoorFlag { open } => self
                .control_timers
                .door()
                .filter(|door| door.is_open() == open)
                .map(|_| ControlEvent::DoorTravelled { open }),
            Expectation::PresenceClear => {
                (!self.actuator.presence_detected()).then_some(ControlEvent::PresenceCleared)
            },
            Expectation::LockoutExpiry => {
                if self.control_timers.lockout().is_some_and(|lockout| lockout.is_finished()) {
                    Some(ControlEvent::LockoutExpired)
                } else {
                    self.to_control.pop_front().map(ControlEvent::Received)
                }
            },
            Expectation::OperatorIntent | Expectation::OperatorCredential => {
                return Err(ProtocolError::InvalidState { state, event: "operator-input" });
            },
        };
        let Some(event) = event else {
            return Ok(false);
        };

        match self.control.handle(event) {
            Ok(actions) => self.execute_control(actions),
            Err(err) if !err.is_fatal() => {
                self.faults.push(Fault { node: NodeId::Control, state, error: err.to_string() });
                match self.control.recover() {
                    Ok(actions) => {
                        self.execute_control(actions);
                        self.control_timers.reset();
                    },
                    Err(fatal) => return Err(self.halt_control(fatal)),
                }
            },
            Err(err) => return Err(self.halt_control(err)),
        }
        Ok(true)
    }

    fn halt_control(&mut self, err: ProtocolError) -> ProtocolError {
        self.control_timers.reset();
        self.drive(MotorDirection::Stop);
        self.alarm(false);
        err
    }

    fn step_hmi(&mut self) -> Result<bool, ProtocolError> {
        let state = self.hmi.state();
        let event = match self.hmi.expecting() {
            Expectation::Link { .. } => self.to_hmi.pop_front().map(HmiEvent::Received),
            Expectation::OperatorIntent => std::iter::from_fn(|| self.keypad.pop())
                .find_map(Intent::from_key)
                .map(HmiEvent::IntentChosen),
            Expectation::OperatorCredential => {
                let entry = &mut self.entry;
                let credential =
                    std::iter::from_fn(|| self.keypad.pop()).find_map(|key| entry.push(key));
                if credential.is_some() {
                    self.entry = KeypadEntry::new();
                }
                credential.map(HmiEvent::CredentialEntered)
            },
            Expectation::DoorFlag { open } => self
                .hmi_timers
                .door()
                .filter(|door| door.is_open() == open)
                .map(|_| HmiEvent::DoorTravelled { open }),
            Expectation::LockoutExpiry => self
                .hmi_timers
                .lockout()
                .filter(|lockout| lockout.is_finished())
                .map(|_| HmiEvent::LockoutExpired),
            Expectation::PresenceClear => {
                return Err(ProtocolError::InvalidState { state, event: "presence" });
            },
        };
        let Some(event) = event else {
            return Ok(false);
        };

        match self.hmi.handle(event) {
            Ok(actions) => self.execute_hmi(actions),
            Err(err) if !err.is_fatal() => {
                self.faults.push(Fault { node: NodeId::Hmi, state, error: err.to_string() });
                let actions = self.hmi.recover();
                self.execute_hmi(actions);
                self.hmi_timers.reset();
            },
            Err(err) => {
                self.hmi_timers.reset();
                return Err(err);
            },
        }
        Ok(true)
    }

    fn execute_control(&mut self, actions: Vec<ControlAction>) {
        for action in actions {
            match action {
                ControlAction::Send(message) => self.transmit(NodeId::Control, &[message.to_byte()]),
                ControlAction::Motor(direction) => self.drive(direction),
                ControlAction::Alarm(on) => self.alarm(on),
                ControlAction::BindTimer(job) => self.control_timers.bind(job),
                ControlAction::UnbindTimer => self.control_timers.unbind(),
                ControlAction::Log { level, message } => {
                    self.logs.push((NodeId::Control, level, message));
                },
            }
        }
    }

    fn execute_hmi(&mut self, actions: Vec<HmiAction>) {
        for action in actions {
            match action {
                HmiAction::Send(message) => self.transmit(NodeId::Hmi, &[message.to_byte()]),
                HmiAction::SendCredential(credential) => {
                    self.transmit(NodeId::Hmi, &credential.to_frame());
                },
                HmiAction::Display(screen) => self.display.show(screen),
                HmiAction::BindTimer(job) => self.hmi_timers.bind(job),
                HmiAction::UnbindTimer => self.hmi_timers.unbind(),
                HmiAction::Log { level, message } => self.logs.push((NodeId::Hmi, level, message)),
            }
        }
    }

    fn transmit(&mut self, from: NodeId, bytes: &[u8]) {
        let queue = match from {
            NodeId::Control => &mut self.to_hmi,
            NodeId::Hmi => &mut self.to_control,
        };
        queue.extend(bytes.iter().copied());
        self.transcript.push(Wire { from, bytes: bytes.to_vec() });
    }

    fn drive(&mut self, direction: MotorDirection) {
        let duty = direction.duty(MOTOR_SPEED);
        self.actuator.drive_motor(direction, duty);
        self.outputs.push((self.ticks, ActuatorEvent::Motor(direction, duty)));
    }

    fn alarm(&mut self, on: bool) {
        self.actuator.set_alarm(on);
        self.outputs.push((self.ticks, ActuatorEvent::Alarm(on)));
    }

    /// Control state machine.
    pub fn control(&self) -> &ControlNode<S> {
        &self.control
    }

    /// HMI state machine.
    pub fn hmi(&self) -> &HmiNode {
        &self.hmi
    }

    /// Control's credential store.
    pub fn store(&self) -> &S {
        self.control.credentials().store()
    }

    /// Every transmission, in order.
    pub fn wire(&self) -> &[Wire] {
        &self.transcript
    }

    /// Transcript rendered one transmission per line, `sender> bytes`.
    pub fn transcript(&self) -> String {
        self.transcript
            .iter()
            .map(|wire| format!("{}> {}", wire.from, String::from_utf8_lossy(&wire.bytes)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// How many times `from` sent `message`.
    pub fn sent(&self, from: NodeId, message: Message) -> usize {
        self.transcript
            .iter()
            .filter(|wire| wire.from == from && wire.bytes == [message.to_byte()])
            .count()
    }

    /// Motor and alarm changes stamped with the tick they happened at.
    pub fn outputs(&self) -> &[(u64, ActuatorEvent)] {
        &self.outputs
    }

    /// Screens the HMI showed, in order.
    pub fn screens(&self) -> Vec<Screen> {
        self.display.screens()
    }

    /// Log entries both nodes emitted.
    pub fn logs(&self) -> &[(NodeId, LogLevel, String)] {
        &self.logs
    }

    /// Recoverable errors hit so far.
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether the motor is currently stopped.
    pub fn motor_stopped(&self) -> bool {
        self.actuator.motor() == MotorDirection::Stop
    }

    /// Whether the alarm is currently on.
    pub fn alarm_on(&self) -> bool {
        self.actuator.alarm()
    }
}
