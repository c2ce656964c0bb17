//! Fuzz target for the [`ControlNode`] state machine
//!
//! Prevent opening the door or rewriting the credential without a
//! successful exchange.
//!
//! # Strategy
//!
//! - Link noise: arbitrary bytes, including stray terminators and intent
//!   bytes out of turn
//! - Framed credentials: payloads of any length, terminated
//! - Driver events out of order: door flags, presence and lockout expiry in
//!   any state
//! - Recovery after every recoverable error, the way the runtime does
//!
//! # Invariants
//!
//! - Motor clockwise ONLY from `AwaitIntent` on an open request
//! - `AwaitIntent` ONLY reachable by an accepted credential
//! - Alarm on ONLY together with the lockout notice
//! - Stored record changes ONLY on an accepted enrollment
//! - Errors leave the state unchanged; fatal ones end the run
//! - Attempts stay below the limit outside `Lockout`
//! - NEVER panic on unexpected input

#![no_main]

use arbitrary::Arbitrary;
use doorlock_core::{
    ControlAction, ControlEvent, ControlNode, CredentialManager, MemoryStore, MotorDirection,
    ProtocolState,
};
use doorlock_proto::{Credential, Message, ProtocolConfig, CREDENTIAL_OFFSET, TERMINATOR};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    Byte(u8),
    Frame(Vec<u8>),
    DoorTravelled { open: bool },
    PresenceCleared,
    LockoutExpired,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    /// Credential already in the store at power on, if any.
    enrolled: Option<Vec<u8>>,
    /// Whether the peer's sync arrives before the events.
    synced: bool,
    events: Vec<FuzzEvent>,
}

fn record(node: &ControlNode<MemoryStore>) -> Vec<u8> {
    let start = usize::from(CREDENTIAL_OFFSET);
    node.credentials().store().snapshot()[start..start + 6].to_vec()
}

/// Feed one event. Returns false once the node hit a fatal error and the
/// runtime would halt.
fn feed(node: &mut ControlNode<MemoryStore>, event: ControlEvent) -> bool {
    let before = node.state();
    let record_before = record(node);

    let actions = match node.handle(event) {
        Ok(actions) => actions,
        Err(err) => {
            assert_eq!(node.state(), before, "error moved the node");
            if err.is_fatal() {
                return false;
            }
            let actions = node.recover().unwrap_or_default();
            assert!(actions.contains(&ControlAction::Motor(MotorDirection::Stop)));
            assert!(actions.contains(&ControlAction::Alarm(false)));
            return true;
        },
    };

    let accepted = actions.contains(&ControlAction::Send(Message::Accepted));

    if actions.contains(&ControlAction::Motor(MotorDirection::Clockwise)) {
        assert_eq!(before, ProtocolState::AwaitIntent, "door opened without login");
    }
    if node.state() == ProtocolState::AwaitIntent && before != ProtocolState::AwaitIntent {
        assert_eq!(before, ProtocolState::AwaitCredential);
        assert!(accepted, "AwaitIntent reached without an accepted credential");
    }
    if actions.contains(&ControlAction::Alarm(true)) {
        assert!(actions.contains(&ControlAction::Send(Message::Lockout)));
        assert_eq!(node.state(), ProtocolState::Lockout);
    }
    if record(node) != record_before {
        assert_eq!(before, ProtocolState::Enrolling);
        assert!(accepted, "record rewritten without an accepted enrollment");
    }

    let session = node.session();
    if node.state() != ProtocolState::Lockout {
        assert!(session.attempts_used() < session.attempt_limit());
    }
    true
}

fuzz_target!(|input: FuzzInput| {
    let mut manager = CredentialManager::new(MemoryStore::new(), CREDENTIAL_OFFSET);
    if let Some(pin) = input.enrolled.as_deref().and_then(|bytes| Credential::new(bytes).ok()) {
        let _ = manager.enroll(&pin, &pin);
    }

    let (mut node, _) = ControlNode::boot(ProtocolConfig::default(), manager);
    if input.synced {
        feed(&mut node, ControlEvent::Received(Message::Sync.to_byte()));
    }

    for event in input.events {
        let running = match event {
            FuzzEvent::Byte(byte) => feed(&mut node, ControlEvent::Received(byte)),
            FuzzEvent::Frame(payload) => payload
                .into_iter()
                .chain([TERMINATOR])
                .all(|byte| feed(&mut node, ControlEvent::Received(byte))),
            FuzzEvent::DoorTravelled { open } => {
                feed(&mut node, ControlEvent::DoorTravelled { open })
            },
            FuzzEvent::PresenceCleared => feed(&mut node, ControlEvent::PresenceCleared),
            FuzzEvent::LockoutExpired => feed(&mut node, ControlEvent::LockoutExpired),
        };
        if !running {
            break;
        }
    }
});
