//! HMI operator surface: keypad input and the two-row status display.

use std::io;

use async_trait::async_trait;
use doorlock_proto::{Credential, MAX_CREDENTIAL_LEN};

/// Key that submits a typed credential.
pub const ENTER_KEY: u8 = b'=';

/// Keypad matrix.
#[async_trait]
pub trait Keypad: Send {
    /// Wait for the next key press. Unbounded.
    async fn next_key(&mut self) -> io::Result<u8>;
}

/// Two-row character display.
pub trait StatusDisplay {
    /// Replace the display contents.
    fn show(&mut self, screen: Screen);
}

/// Screens the HMI node shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Main menu
    Menu,
    /// First entry of a new credential
    EnterNewCredential,
    /// Confirmation entry of a new credential
    ConfirmCredential,
    /// Login before an operation
    EnterCurrentCredential,
    /// Door opening
    DoorUnlocking,
    /// Door held open
    WaitForPassage,
    /// Door closing
    DoorLocking,
    /// Lockout cooldown
    SystemLocked,
}

impl Screen {
    /// Row contents, top then bottom.
    pub fn lines(self) -> [&'static str; 2] {
        match self {
            Self::Menu => ["+ : OPEN DOOR", "- : CHANGE PASS"],
            Self::EnterNewCredential => ["Plz enter pass:", ""],
            Self::ConfirmCredential => ["Plz re-enter the", "same pass: "],
            Self::EnterCurrentCredential => ["Plz enter old", "pass :"],
            Self::DoorUnlocking => ["Door Unlocking", "Please wait"],
            Self::WaitForPassage => ["wait for people", "To Enter"],
            Self::DoorLocking => ["Door Locking", ""],
            Self::SystemLocked => ["System LOCKED", "wait for 1 min"],
        }
    }
}

/// Collects digits into a credential until the enter key.
///
/// Digits beyond [`MAX_CREDENTIAL_LEN`] are dropped. Other keys are ignored.
#[derive(Debug, Default)]
pub struct KeypadEntry {
    digits: Vec<u8>,
}

impl KeypadEntry {
    /// Empty entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key. Returns the credential when `key` submits.
    pub fn push(&mut self, key: u8) -> Option<Credential> {
        match key {
            ENTER_KEY => {
                let credential = Credential::new(&self.digits).ok();
                self.digits.clear();
                credential
            },
            b'0'..=b'9' if self.digits.len() < MAX_CREDENTIAL_LEN => {
                self.digits.push(key);
                None
            },
            _ => None,
        }
    }

    /// Digits typed so far.
    pub fn typed(&self) -> usize {
        self.digits.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn type_keys(entry: &mut KeypadEntry, keys: &[u8]) -> Option<Credential> {
        keys.iter().find_map(|&key| entry.push(key))
    }

    #[test]
    fn enter_submits_digits() {
        let mut entry = KeypadEntry::new();
        let credential = type_keys(&mut entry, b"1234=").unwrap();
        assert_eq!(credential.as_bytes(), b"1234");
        assert_eq!(entry.typed(), 0);
    }

    #[test]
    fn extra_digits_are_dropped() {
        let mut entry = KeypadEntry::new();
        let credential = type_keys(&mut entry, b"1234567=").unwrap();
        assert_eq!(credential.as_bytes(), b"12345");
    }

    #[test]
    fn non_digit_keys_are_ignored() {
        let mut entry = KeypadEntry::new();
        let credential = type_keys(&mut entry, b"1+2-*3=").unwrap();
        assert_eq!(credential.as_bytes(), b"123");
    }

    #[test]
    fn menu_lines_fit_the_display() {
        for screen in [
            Screen::Menu,
            Screen::EnterNewCredential,
            Screen::ConfirmCredential,
            Screen::EnterCurrentCredential,
            Screen::DoorUnlocking,
            Screen::WaitForPassage,
            Screen::DoorLocking,
            Screen::SystemLocked,
        ] {
            for line in screen.lines() {
                assert!(line.len() <= 16, "{screen:?} overflows: {line:?}");
            }
        }
    }
}
