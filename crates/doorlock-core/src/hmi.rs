//! HMI node state machine.
//!
//! The HMI node owns the keypad and the display and initiates every exchange
//! after rendezvous. It keeps its own [`Session`] and its own timers; it
//! never learns the Control node's state except through the bytes it
//! receives, so any byte that contradicts its own bookkeeping is a protocol
//! violation.
//!
//! # Operator flow
//!
//! ```text
//! menu ──'+'/'-'──> enter credential ──> verdict
//!                        ▲                 │ 'F' (below limit)
//!                        └─────────────────┘
//! verdict 'T' + '+' ──> O ─(timer open)─> S ... S ─> C ─(timer closed)─> D ──> menu
//! verdict 'T' + '-' ──> enrollment ──> menu
//! verdict 'F' at limit ──> W ─(lockout timer)─> K ──> menu
//! ```

use doorlock_proto::{Credential, Intent, Message, ProtocolConfig, SYNC};

use crate::{
    error::ProtocolError,
    operator::Screen,
    session::{AttemptOutcome, Session},
    state::{DoorPhase, Expectation, LogLevel, ProtocolState},
    tick::TimerJob,
};

/// Inputs to the HMI node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmiEvent {
    /// Byte read from the link.
    Received(u8),
    /// Operator picked an operation at the menu.
    IntentChosen(Intent),
    /// Operator submitted a credential on the keypad.
    CredentialEntered(Credential),
    /// Door timer flag reached `open`.
    DoorTravelled {
        /// Flag value observed
        open: bool,
    },
    /// Lockout timer finished.
    LockoutExpired,
}

/// Side effects requested by the HMI node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HmiAction {
    /// Send one control byte.
    Send(Message),
    /// Send a framed credential.
    SendCredential(Credential),
    /// Replace the display contents.
    Display(Screen),
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

impl HmiAction {
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
enum Step {
    AwaitSync,
    EnrollEntry { confirming: bool },
    EnrollVerdict,
    Menu,
    CredentialEntry { intent: Intent },
    AwaitVerdict { intent: Intent },
    AwaitLockoutNotice,
    Lockout,
    AwaitResume,
    AwaitCycleStart,
    DoorOpening,
    AwaitPassing,
    Passing,
    DoorClosing,
    AwaitCycleDone,
}

/// HMI node protocol state machine.
#[derive(Debug)]
pub struct HmiNode {
    config: ProtocolConfig,
    session: Session,
    enrolled: bool,
    step: Step,
}

impl HmiNode {
    /// Power on. Returns the node in `AwaitSync` and the sync announcement.
    pub fn boot(config: ProtocolConfig) -> (Self, Vec<HmiAction>) {
        let node =
            Self { session: Session::new(config.attempt_limit), config, enrolled: false, step: Step::AwaitSync };
        let actions =
            vec![HmiAction::Send(Message::Sync), HmiAction::debug("sync sent, waiting for peer")];
        (node, actions)
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        match self.step {
            Step::AwaitSync => ProtocolState::AwaitSync,
            Step::EnrollEntry { .. } | Step::EnrollVerdict => ProtocolState::Enrolling,
            Step::Menu | Step::CredentialEntry { .. } | Step::AwaitVerdict { .. } => {
                ProtocolState::AwaitCredential
            },
            Step::AwaitCycleStart => ProtocolState::AwaitIntent,
            Step::DoorOpening | Step::AwaitPassing => ProtocolState::Cycling(DoorPhase::Opening),
            Step::Passing => ProtocolState::Cycling(DoorPhase::Passing),
            Step::DoorClosing | Step::AwaitCycleDone => ProtocolState::Cycling(DoorPhase::Closing),
            Step::AwaitLockoutNotice | Step::Lockout | Step::AwaitResume => ProtocolState::Lockout,
        }
    }

    /// The input the driver should obtain next.
    pub fn expecting(&self) -> Expectation {
        match self.step {
            Step::AwaitSync | Step::Passing => Expectation::Link { reply_pending: false },
            Step::EnrollVerdict
            | Step::AwaitVerdict { .. }
            | Step::AwaitLockoutNotice
            | Step::AwaitResume
            | Step::AwaitCycleStart
            | Step::AwaitPassing
            | Step::AwaitCycleDone => Expectation::Link { reply_pending: true },
            Step::EnrollEntry { .. } | Step::CredentialEntry { .. } => {
                Expectation::OperatorCredential
            },
            Step::Menu => Expectation::OperatorIntent,
            Step::DoorOpening => Expectation::DoorFlag { open: true },
            Step::DoorClosing => Expectation::DoorFlag { open: false },
            Step::Lockout => Expectation::LockoutExpiry,
        }
    }

    /// Login session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether an enrollment has been confirmed since boot.
    pub fn is_enrolled(&self) -> bool {
        self.enrolled
    }

    /// Protocol configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Process one event.
    ///
    /// # Errors
    ///
    /// Recoverable errors leave the node where it was; the driver must call
    /// [`Self::recover`] before feeding more events.
    pub fn handle(&mut self, event: HmiEvent) -> Result<Vec<HmiAction>, ProtocolError> {
        match event {
            HmiEvent::Received(byte) => self.handle_byte(byte),
            HmiEvent::IntentChosen(intent) => self.handle_intent(intent),
            HmiEvent::CredentialEntered(credential) => self.handle_credential(credential),
            HmiEvent::DoorTravelled { open } => self.handle_door_travelled(open),
            HmiEvent::LockoutExpired => self.handle_lockout_expired(),
        }
    }

    /// Return to the menu (or to enrollment if none was ever confirmed)
    /// after a recoverable error. The attempt count survives.
    pub fn recover(&mut self) -> Vec<HmiAction> {
        let from = self.state();
        self.session.end_operation();

        let mut actions = vec![HmiAction::UnbindTimer];
        if self.step == Step::AwaitSync {
            return actions;
        }

        self.step = if self.enrolled { Step::Menu } else { Step::EnrollEntry { confirming: false } };
        actions.push(HmiAction::Display(self.prompt()));
        actions.push(HmiAction::warn(format!(
            "recovered from {from} to {}, attempts used {}",
            self.state(),
            self.session.attempts_used()
        )));
        actions
    }

    fn prompt(&self) -> Screen {
        match self.step {
            Step::EnrollEntry { confirming: false } => Screen::EnterNewCredential,
            Step::EnrollEntry { confirming: true } => Screen::ConfirmCredential,
            Step::CredentialEntry { .. } => Screen::EnterCurrentCredential,
            _ => Screen::Menu,
        }
    }

    fn enter(&mut self, step: Step) -> HmiAction {
        self.step = step;
        HmiAction::Display(self.prompt())
    }

    fn handle_byte(&mut self, byte: u8) -> Result<Vec<HmiAction>, ProtocolError> {
        if self.step == Step::AwaitSync {
            if byte != SYNC {
                return Ok(vec![HmiAction::debug(format!("discarded {byte:#04x} before sync"))]);
            }
            let display = self.enter(Step::EnrollEntry { confirming: false });
            return Ok(vec![display, HmiAction::info("rendezvous complete")]);
        }

        let Some(message) = Message::from_byte(byte) else {
            return Err(self.violation(byte));
        };

        match (self.step, message) {
            (Step::EnrollVerdict, Message::Accepted) => {
                self.enrolled = true;
                Ok(vec![self.enter(Step::Menu), HmiAction::info("credential enrolled")])
            },
            (Step::EnrollVerdict, Message::Rejected) => Ok(vec![
                self.enter(Step::EnrollEntry { confirming: false }),
                HmiAction::debug("entries differ, enrollment restarted"),
            ]),
            (Step::AwaitVerdict { intent }, Message::Accepted) => Ok(self.authenticated(intent)),
            (Step::AwaitVerdict { intent }, Message::Rejected) => Ok(self.rejected(intent)),
            (Step::AwaitLockoutNotice, Message::Lockout) => {
                self.step = Step::Lockout;
                Ok(vec![
                    HmiAction::Display(Screen::SystemLocked),
                    HmiAction::BindTimer(TimerJob::Lockout),
                    HmiAction::warn("locked out"),
                ])
            },
            (Step::AwaitResume, Message::SystemOk) => {
                Ok(vec![self.enter(Step::Menu), HmiAction::info("lockout over")])
            },
            (Step::AwaitCycleStart, Message::DoorOpening) => {
                self.step = Step::DoorOpening;
                Ok(vec![
                    HmiAction::Display(Screen::DoorUnlocking),
                    HmiAction::BindTimer(TimerJob::DoorTravel),
                ])
            },
            (Step::AwaitPassing | Step::Passing, Message::PersonPassing) => {
                let first = self.step == Step::AwaitPassing;
                self.step = Step::Passing;
                Ok(if first { vec![HmiAction::Display(Screen::WaitForPassage)] } else { Vec::new() })
            },
            (Step::Passing, Message::DoorClosing) => {
                self.step = Step::DoorClosing;
                Ok(vec![
                    HmiAction::Display(Screen::DoorLocking),
                    HmiAction::BindTimer(TimerJob::DoorTravel),
                ])
            },
            (Step::AwaitCycleDone, Message::CycleDone) => {
                self.session.end_operation();
                Ok(vec![self.enter(Step::Menu), HmiAction::info("door cycle complete")])
            },
            _ => Err(self.violation(byte)),
        }
    }

    fn authenticated(&mut self, intent: Intent) -> Vec<HmiAction> {
        self.session.record_success();
        let mut actions = vec![HmiAction::Send(intent.message())];
        match intent {
            Intent::OpenDoor => {
                self.step = Step::AwaitCycleStart;
                actions.push(HmiAction::info("authenticated, opening door"));
            },
            Intent::ChangeCredential => {
                self.session.end_operation();
                actions.push(self.enter(Step::EnrollEntry { confirming: false }));
                actions.push(HmiAction::info("authenticated, changing credential"));
            },
        }
        actions
    }

    fn rejected(&mut self, intent: Intent) -> Vec<HmiAction> {
        match self.session.record_failure() {
            AttemptOutcome::Retry { remaining } => vec![
                self.enter(Step::CredentialEntry { intent }),
                HmiAction::debug(format!("credential rejected, {remaining} left")),
            ],
            AttemptOutcome::LockedOut => {
                self.step = Step::AwaitLockoutNotice;
                vec![HmiAction::debug("attempt limit reached, expecting lockout")]
            },
        }
    }

    fn handle_intent(&mut self, intent: Intent) -> Result<Vec<HmiAction>, ProtocolError> {
        if self.step != Step::Menu {
            return Err(ProtocolError::InvalidState { state: self.state(), event: "intent-chosen" });
        }
        Ok(vec![self.enter(Step::CredentialEntry { intent })])
    }

    fn handle_credential(
        &mut self,
        credential: Credential,
    ) -> Result<Vec<HmiAction>, ProtocolError> {
        let (next, display) = match self.step {
            Step::EnrollEntry { confirming: false } => {
                (Step::EnrollEntry { confirming: true }, Some(Screen::ConfirmCredential))
            },
            Step::EnrollEntry { confirming: true } => (Step::EnrollVerdict, None),
            Step::CredentialEntry { intent } => (Step::AwaitVerdict { intent }, None),
            _ => {
                return Err(ProtocolError::InvalidState {
                    state: self.state(),
                    event: "credential-entered",
                });
            },
        };
        self.step = next;

        let mut actions = vec![HmiAction::SendCredential(credential)];
        actions.extend(display.map(HmiAction::Display));
        Ok(actions)
    }

    fn handle_door_travelled(&mut self, open: bool) -> Result<Vec<HmiAction>, ProtocolError> {
        match (self.step, open) {
            (Step::DoorOpening, true) => {
                self.step = Step::AwaitPassing;
                Ok(vec![HmiAction::UnbindTimer])
            },
            (Step::DoorClosing, false) => {
                self.step = Step::AwaitCycleDone;
                Ok(vec![HmiAction::UnbindTimer])
            },
            _ => Err(ProtocolError::InvalidState { state: self.state(), event: "door-travelled" }),
        }
    }

    fn handle_lockout_expired(&mut self) -> Result<Vec<HmiAction>, ProtocolError> {
        if self.step != Step::Lockout {
            return Err(ProtocolError::InvalidState { state: self.state(), event: "lockout-expired" });
        }
        self.session.complete_lockout();
        self.step = Step::AwaitResume;
        Ok(vec![HmiAction::UnbindTimer])
    }

    fn violation(&self, received: u8) -> ProtocolError {
        ProtocolError::Violation { state: self.state(), received }
    }
}
