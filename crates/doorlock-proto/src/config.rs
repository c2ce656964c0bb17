//! Shared protocol constants and configuration.
//!
//! Both nodes must be built with the same [`ProtocolConfig`]; nothing on the
//! link negotiates these values.

use serde::{Deserialize, Serialize};

/// Consecutive failed attempts before a lockout.
pub const ATTEMPT_LIMIT: u8 = 3;

/// Ticks for the door to travel fully open or fully closed.
pub const DOOR_TRAVEL_TICKS: u32 = 15;

/// Ticks the alarm sounds during a lockout.
pub const LOCKOUT_TICKS: u32 = 60;

/// Offset of the credential record in the credential store.
pub const CREDENTIAL_OFFSET: u16 = 0x0200;

/// Protocol parameters shared by both nodes.
///
/// Fields missing from a serialized config take the legacy constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Failed attempts that trigger a lockout.
    pub attempt_limit: u8,
    /// Tick threshold for one door travel (open or close).
    pub door_travel_ticks: u32,
    /// Tick threshold for the lockout cooldown.
    pub lockout_ticks: u32,
    /// Credential record offset in the store.
    pub credential_offset: u16,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            attempt_limit: ATTEMPT_LIMIT,
            door_travel_ticks: DOOR_TRAVEL_TICKS,
            lockout_ticks: LOCKOUT_TICKS,
            credential_offset: CREDENTIAL_OFFSET,
        }
    }
}

/// Parity bit setting of the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    /// No parity bit
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Serial frame format. Both ends must match; the hosted runtime records it
/// for diagnostics only since its link is a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Bits per second
    pub baud_rate: u32,
    /// Data bits per frame
    pub data_bits: u8,
    /// Parity bit
    pub parity: Parity,
    /// Stop bits per frame
    pub stop_bits: u8,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self { baud_rate: 19_200, data_bits: 8, parity: Parity::None, stop_bits: 1 }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn defaults_match_legacy_constants() {
        let config = ProtocolConfig::default();
        assert_eq!(config.attempt_limit, 3);
        assert_eq!(config.door_travel_ticks, 15);
        assert_eq!(config.lockout_ticks, 60);
        assert_eq!(config.credential_offset, 0x0200);
    }

    #[test]
    fn legacy_link_format_is_8n1() {
        let link = LinkSettings::default();
        assert_eq!((link.baud_rate, link.data_bits, link.parity, link.stop_bits), (19_200, 8, Parity::None, 1));
    }

    #[test]
    fn protocol_config_serde() {
        let config = ProtocolConfig { lockout_ticks: 120, ..ProtocolConfig::default() };
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&config, &mut bytes).expect("encode");

        let decoded: ProtocolConfig = ciborium::de::from_reader(&bytes[..]).expect("decode");
        assert_eq!(decoded, config);
    }

    #[test]
    fn missing_fields_take_legacy_constants() {
        let partial = BTreeMap::from([("door_travel_ticks", 20u32)]);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&partial, &mut bytes).expect("encode");

        let decoded: ProtocolConfig = ciborium::de::from_reader(&bytes[..]).expect("decode");
        assert_eq!(decoded.door_travel_ticks, 20);
        assert_eq!(decoded.attempt_limit, ATTEMPT_LIMIT);
        assert_eq!(decoded.lockout_ticks, LOCKOUT_TICKS);
        assert_eq!(decoded.credential_offset, CREDENTIAL_OFFSET);
    }

    #[test]
    fn link_settings_serde() {
        let link = LinkSettings { baud_rate: 9_600, parity: Parity::Even, ..LinkSettings::default() };
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&link, &mut bytes).expect("encode");

        let decoded: LinkSettings = ciborium::de::from_reader(&bytes[..]).expect("decode");
        assert_eq!(decoded, link);
    }
}
