//! Control node state machine.
//!
//! The Control node owns the motor, presence sensor, alarm and credential
//! store. It never initiates an exchange after rendezvous: every link byte it
//! sends answers something the HMI sent, or reports progress of an action
//! the HMI requested.
//!
//! # Events and actions
//!
//! The node is Sans-IO. Drivers feed [`ControlEvent`]s obtained per
//! [`ControlNode::expecting`] and execute the returned [`ControlAction`]s in
//! order. Credential bytes are fed one at a time; the node frames them
//! itself.
//!
//! # Invariants
//!
//! - The lockout alarm sounds for the full configured tick count. Link bytes
//!   arriving during a lockout are discarded.
//! - Recovery never resets the attempt count, so a garbage byte cannot wipe
//!   out failed attempts.
//! - Storage faults are returned, never swallowed.

use doorlock_proto::{Credential, CredentialDecoder, Intent, Message, ProtocolConfig, SYNC};

use crate::{
    actuator::MotorDirection,
    credential::{CredentialManager, Enrollment, Provisioning, Verification},
    error::ProtocolError,
    session::{AttemptOutcome, Session},
    state::{DoorPhase, Expectation, LogLevel, ProtocolState},
    store::CredentialStore,
    tick::TimerJob,
};

/// Inputs to the Control node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Byte read from the link.
    Received(u8),
    /// Door timer flag reached `open`.
    DoorTravelled {
        /// Flag value observed
        open: bool,
    },
    /// Presence sensor reports the doorway empty.
    PresenceCleared,
    /// Lockout timer finished.
    LockoutExpired,
}

/// Side effects requested by the Control node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Send one control byte.
    Send(Message),
    /// Drive the motor.
    Motor(MotorDirection),
    /// Switch the buzzer.
    Alarm(bool),
    /// Bind the tick channel for a job.
    BindTimer(TimerJob),
    /// Unbind the tick channel.
    UnbindTimer,
    /// Emit a log entry.
    Log {
        /// Severity
        level: LogLevel,
        /// Entry text
        message: String,
    },
}

impl ControlAction {
    fn info(message: impl Into<String>) -> Self {
        Self::Log { level: LogLevel::Info, message: message.into() }
    }

    fn debug(message: impl Into<String>) -> Self {
        Self::Log { level: LogLevel::Debug, message: message.into() }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self::Log { level: LogLevel::Warn, message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitSync,
    Enrolling { first: Option<Credential> },
    AwaitCredential,
    AwaitIntent,
    Cycling(DoorPhase),
    Lockout,
}

/// Control node protocol state machine.
#[derive(Debug)]
pub struct ControlNode<S> {
    config: ProtocolConfig,
    credentials: CredentialManager<S>,
    session: Session,
    decoder: CredentialDecoder,
    phase: Phase,
}

impl<S: CredentialStore> ControlNode<S> {
    /// Power on. Returns the node in `AwaitSync` and the sync announcement.
    pub fn boot(config: ProtocolConfig, credentials: CredentialManager<S>) -> (Self, Vec<ControlAction>) {
        let node = Self {
            session: Session::new(config.attempt_limit),
            config,
            credentials,
            decoder: CredentialDecoder::new(),
            phase: Phase::AwaitSync,
        };
        let actions = vec![
            ControlAction::Send(Message::Sync),
            ControlAction::Motor(MotorDirection::Stop),
            ControlAction::Alarm(false),
            ControlAction::debug("sync sent, waiting for peer"),
        ];
        (node, actions)
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        match self.phase {
            Phase::AwaitSync => ProtocolState::AwaitSync,
            Phase::Enrolling { .. } => ProtocolState::Enrolling,
            Phase::AwaitCredential => ProtocolState::AwaitCredential,
            Phase::AwaitIntent => ProtocolState::AwaitIntent,
            Phase::Cycling(phase) => ProtocolState::Cycling(phase),
            Phase::Lockout => ProtocolState::Lockout,
        }
    }

    /// The input the driver should obtain next.
    pub fn expecting(&self) -> Expectation {
        match self.phase {
            Phase::AwaitSync => Expectation::Link { reply_pending: false },
            Phase::Enrolling { .. } | Phase::AwaitCredential => {
                Expectation::Link { reply_pending: self.decoder.is_mid_frame() }
            },
            Phase::AwaitIntent => Expectation::Link { reply_pending: true },
            Phase::Cycling(DoorPhase::Opening) => Expectation::DoorFlag { open: true },
            Phase::Cycling(DoorPhase::Passing) => Expectation::PresenceClear,
            Phase::Cycling(DoorPhase::Closing) => Expectation::DoorFlag { open: false },
            Phase::Lockout => Expectation::LockoutExpiry,
        }
    }

    /// Login session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Credential manager.
    pub fn credentials(&self) -> &CredentialManager<S> {
        &self.credentials
    }

    /// Protocol configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Process one event.
    ///
    /// # Errors
    ///
    /// Recoverable errors (see [`ProtocolError::is_fatal`]) leave the node
    /// where it was; the driver must call [`Self::recover`] before feeding
    /// more events.
    pub fn handle(&mut self, event: ControlEvent) -> Result<Vec<ControlAction>, ProtocolError> {
        match event {
            ControlEvent::Received(byte) => self.handle_byte(byte),
            ControlEvent::DoorTravelled { open } => self.handle_door_travelled(open),
            ControlEvent::PresenceCleared => self.handle_presence_cleared(),
            ControlEvent::LockoutExpired => self.handle_lockout_expired(),
        }
    }

    /// Return to the post-rendezvous idle state after a recoverable error.
    ///
    /// Outputs are driven safe first: timer unbound, motor stopped, alarm
    /// off. The attempt count survives.
    pub fn recover(&mut self) -> Result<Vec<ControlAction>, ProtocolError> {
        let from = self.state();
        self.decoder.reset();
        self.session.end_operation();

        let mut actions = vec![
            ControlAction::UnbindTimer,
            ControlAction::Motor(MotorDirection::Stop),
            ControlAction::Alarm(false),
        ];

        if self.phase == Phase::AwaitSync {
            return Ok(actions);
        }

        self.phase = match self.credentials.provisioning()? {
            Provisioning::Unprovisioned => Phase::Enrolling { first: None },
            Provisioning::Provisioned { .. } => Phase::AwaitCredential,
        };
        actions.push(ControlAction::warn(format!(
            "recovered from {from} to {}, attempts used {}",
            self.state(),
            self.session.attempts_used()
        )));
        Ok(actions)
    }

    fn handle_byte(&mut self, byte: u8) -> Result<Vec<ControlAction>, ProtocolError> {
        match self.phase {
            Phase::AwaitSync if byte == SYNC => {
                self.phase = Phase::Enrolling { first: None };
                Ok(vec![ControlAction::info("rendezvous complete")])
            },
            Phase::AwaitSync => {
                Ok(vec![ControlAction::debug(format!("discarded {byte:#04x} before sync"))])
            },
            Phase::Enrolling { .. } | Phase::AwaitCredential => {
                let state = self.state();
                match self.decoder.push(byte) {
                    Ok(None) => Ok(Vec::new()),
                    Ok(Some(credential)) => self.handle_credential(credential),
                    Err(source) => Err(ProtocolError::Framing { state, source }),
                }
            },
            Phase::AwaitIntent => match Intent::from_byte(byte) {
                Some(Intent::OpenDoor) => {
                    self.phase = Phase::Cycling(DoorPhase::Opening);
                    Ok(vec![
                        ControlAction::Send(Message::DoorOpening),
                        ControlAction::Motor(MotorDirection::Clockwise),
                        ControlAction::BindTimer(TimerJob::DoorTravel),
                        ControlAction::info("door cycle started"),
                    ])
                },
                Some(Intent::ChangeCredential) => {
                    self.session.end_operation();
                    self.phase = Phase::Enrolling { first: None };
                    Ok(vec![ControlAction::info("credential change requested")])
                },
                None => Err(self.violation(byte)),
            },
            Phase::Lockout => {
                Ok(vec![ControlAction::debug(format!("discarded {byte:#04x} during lockout"))])
            },
            Phase::Cycling(_) => Err(self.violation(byte)),
        }
    }

    fn handle_credential(
        &mut self,
        credential: Credential,
    ) -> Result<Vec<ControlAction>, ProtocolError> {
        match self.phase {
            Phase::Enrolling { first: None } => {
                self.phase = Phase::Enrolling { first: Some(credential) };
                Ok(Vec::new())
            },
            Phase::Enrolling { first: Some(first) } => {
                match self.credentials.enroll(&first, &credential)? {
                    Enrollment::Committed => {
                        self.phase = Phase::AwaitCredential;
                        Ok(vec![
                            ControlAction::Send(Message::Accepted),
                            ControlAction::info("credential enrolled"),
                        ])
                    },
                    outcome @ (Enrollment::Mismatch | Enrollment::Empty) => {
                        self.phase = Phase::Enrolling { first: None };
                        Ok(vec![
                            ControlAction::Send(Message::Rejected),
                            ControlAction::debug(format!("enrollment refused: {outcome:?}")),
                        ])
                    },
                }
            },
            Phase::AwaitCredential => self.handle_login(&credential),
            _ => Err(ProtocolError::InvalidState { state: self.state(), event: "credential" }),
        }
    }

    fn handle_login(&mut self, candidate: &Credential) -> Result<Vec<ControlAction>, ProtocolError> {
        let verification = self.credentials.verify(candidate)?;
        if verification.is_match() {
            self.session.record_success();
            self.phase = Phase::AwaitIntent;
            return Ok(vec![ControlAction::Send(Message::Accepted), ControlAction::info("authenticated")]);
        }

        let mut actions = vec![ControlAction::Send(Message::Rejected)];
        if verification == Verification::Unprovisioned {
            actions.push(ControlAction::warn("login attempted with no credential enrolled"));
        }

        match self.session.record_failure() {
            AttemptOutcome::Retry { remaining } => {
                actions.push(ControlAction::debug(format!("credential rejected, {remaining} left")));
            },
            AttemptOutcome::LockedOut => {
                self.phase = Phase::Lockout;
                actions.extend([
                    ControlAction::Send(Message::Lockout),
                    ControlAction::Alarm(true),
                    ControlAction::BindTimer(TimerJob::Lockout),
                    ControlAction::warn(format!(
                        "attempt limit {} reached, lockout started",
                        self.session.attempt_limit()
                    )),
                ]);
            },
        }
        Ok(actions)
    }

    fn handle_door_travelled(&mut self, open: bool) -> Result<Vec<ControlAction>, ProtocolError> {
        match (self.phase, open) {
            (Phase::Cycling(DoorPhase::Opening), true) => {
                self.phase = Phase::Cycling(DoorPhase::Passing);
                Ok(vec![
                    ControlAction::UnbindTimer,
                    ControlAction::Motor(MotorDirection::Stop),
                    ControlAction::Send(Message::PersonPassing),
                ])
            },
            (Phase::Cycling(DoorPhase::Closing), false) => {
                self.session.end_operation();
                self.phase = Phase::AwaitCredential;
                Ok(vec![
                    ControlAction::UnbindTimer,
                    ControlAction::Motor(MotorDirection::Stop),
                    ControlAction::Send(Message::CycleDone),
                    ControlAction::info("door cycle complete"),
                ])
            },
            _ => Err(ProtocolError::InvalidState { state: self.state(), event: "door-travelled" }),
        }
    }

    fn handle_presence_cleared(&mut self) -> Result<Vec<ControlAction>, ProtocolError> {
        if self.phase != Phase::Cycling(DoorPhase::Passing) {
            return Err(ProtocolError::InvalidState { state: self.state(), event: "presence-cleared" });
        }
        self.phase = Phase::Cycling(DoorPhase::Closing);
        Ok(vec![
            ControlAction::Send(Message::DoorClosing),
            ControlAction::Motor(MotorDirection::CounterClockwise),
            ControlAction::BindTimer(TimerJob::DoorTravel),
        ])
    }

    fn handle_lockout_expired(&mut self) -> Result<Vec<ControlAction>, ProtocolError> {
        if self.phase != Phase::Lockout {
            return Err(ProtocolError::InvalidState { state: self.state(), event: "lockout-expired" });
        }
        self.session.complete_lockout();
        self.phase = Phase::AwaitCredential;
        Ok(vec![
            ControlAction::Alarm(false),
            ControlAction::UnbindTimer,
            ControlAction::Send(Message::SystemOk),
            ControlAction::info("lockout over"),
        ])
    }

    fn violation(&self, received: u8) -> ProtocolError {
        ProtocolError::Violation { state: self.state(), received }
    }
}
