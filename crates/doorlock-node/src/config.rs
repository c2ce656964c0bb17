//! Node runtime configuration.

use std::time::Duration;

use doorlock_proto::{LinkSettings, ProtocolConfig};

use crate::error::NodeError;

/// Legacy timer compare period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Configuration for a node runtime.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Thresholds, attempt limit and store layout shared with the peer
    pub protocol: ProtocolConfig,
    /// Period of the tick source
    pub tick_period: Duration,
    /// Bound on waits for a reply the peer owes. `None` blocks forever.
    pub link_timeout: Option<Duration>,
    /// Motor duty while running, in percent
    pub motor_speed: u8,
    /// Interval between presence sensor samples
    pub presence_poll: Duration,
    /// Serial framing of the physical link (informational when hosted)
    pub link: LinkSettings,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            tick_period: DEFAULT_TICK_PERIOD,
            link_timeout: None,
            motor_speed: 100,
            presence_poll: Duration::from_millis(100),
            link: LinkSettings::default(),
        }
    }
}

impl NodeConfig {
    /// Reject configurations the runtime cannot honor.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.tick_period.is_zero() {
            return Err(NodeError::Config("tick period must be non-zero".to_string()));
        }
        if self.presence_poll.is_zero() {
            return Err(NodeError::Config("presence poll must be non-zero".to_string()));
        }
        if self.motor_speed == 0 || self.motor_speed > 100 {
            return Err(NodeError::Config(format!(
                "motor speed {}% outside 1..=100",
                self.motor_speed
            )));
        }
        if self.link_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(NodeError::Config("link timeout must be non-zero".to_string()));
        }
        if self.protocol.attempt_limit == 0 {
            return Err(NodeError::Config("attempt limit must be at least 1".to_string()));
        }
        if self.protocol.door_travel_ticks == 0 || self.protocol.lockout_ticks == 0 {
            return Err(NodeError::Config("tick thresholds must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_tick_period_is_rejected() {
        let config = NodeConfig { tick_period: Duration::ZERO, ..NodeConfig::default() };
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn motor_speed_is_bounded() {
        let config = NodeConfig { motor_speed: 101, ..NodeConfig::default() };
        assert!(config.validate().is_err());
    }
}
