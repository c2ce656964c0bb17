//! Single-byte control alphabet.
//!
//! Values are printable ASCII so a captured link trace reads naturally, but
//! the only requirement is that both nodes agree on them.

use std::fmt;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::ProtoError;

/// Boot rendezvous byte.
pub const SYNC: u8 = b'A';

/// Control messages exchanged over the link.
///
/// | Byte | Meaning | Direction |
/// |---|---|---|
/// | `A` | boot rendezvous | either |
/// | `F` | credential rejected | Control -> HMI |
/// | `T` | credential accepted | Control -> HMI |
/// | `+` | open the door | HMI -> Control |
/// | `-` | change the credential | HMI -> Control |
/// | `O` | door opening | Control -> HMI |
/// | `S` | person passing | Control -> HMI |
/// | `C` | door closing | Control -> HMI |
/// | `D` | open/close cycle done | Control -> HMI |
/// | `W` | lockout engaged | Control -> HMI |
/// | `K` | system OK, continue | Control -> HMI |
/// | `#` | credential terminator | framing |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Message {
    /// Boot rendezvous
    Sync = b'A',
    /// Credential rejected
    Rejected = b'F',
    /// Credential accepted
    Accepted = b'T',
    /// Request: open the door
    OpenDoor = b'+',
    /// Request: change the stored credential
    ChangeCredential = b'-',
    /// Status: door is opening
    DoorOpening = b'O',
    /// Status: door is open, person passing
    PersonPassing = b'S',
    /// Status: door is closing
    DoorClosing = b'C',
    /// Status: open/close cycle finished
    CycleDone = b'D',
    /// Too many failed attempts, lockout engaged
    Lockout = b'W',
    /// System OK, continue
    SystemOk = b'K',
    /// Credential payload terminator
    Terminator = b'#',
}

impl Message {
    /// Every message in the alphabet.
    pub const ALL: [Self; 12] = [
        Self::Sync,
        Self::Rejected,
        Self::Accepted,
        Self::OpenDoor,
        Self::ChangeCredential,
        Self::DoorOpening,
        Self::PersonPassing,
        Self::DoorClosing,
        Self::CycleDone,
        Self::Lockout,
        Self::SystemOk,
        Self::Terminator,
    ];

    /// Wire value of this message.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Look up a wire byte in the alphabet.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|message| message.to_byte() == byte)
    }
}

impl TryFrom<u8> for Message {
    type Error = ProtoError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(ProtoError::UnknownMessage(byte))
    }
}

impl From<Message> for u8 {
    fn from(message: Message) -> Self {
        message.to_byte()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.to_byte()))
    }
}

/// Operation the operator asks for after authenticating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Run one open/close door cycle.
    OpenDoor,
    /// Replace the stored credential.
    ChangeCredential,
}

impl Intent {
    /// The request message carrying this intent.
    pub fn message(self) -> Message {
        match self {
            Self::OpenDoor => Message::OpenDoor,
            Self::ChangeCredential => Message::ChangeCredential,
        }
    }

    /// Decode an intent request from a link byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match Message::from_byte(byte)? {
            Message::OpenDoor => Some(Self::OpenDoor),
            Message::ChangeCredential => Some(Self::ChangeCredential),
            _ => None,
        }
    }

    /// Decode a keypad key. The keypad carries `+` and `-` keys whose codes
    /// match the request bytes.
    pub fn from_key(key: u8) -> Option<Self> {
        Self::from_byte(key)
    }
}
