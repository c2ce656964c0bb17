//! Control node hardware: door motor, presence sensor, alarm buzzer.

use std::fmt;

/// Motor drive direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MotorDirection {
    /// Motor off
    #[default]
    Stop,
    /// Opens the door
    Clockwise,
    /// Closes the door
    CounterClockwise,
}

impl MotorDirection {
    /// Duty cycle for this direction given the configured running speed.
    pub fn duty(self, speed_percent: u8) -> u8 {
        match self {
            Self::Stop => 0,
            Self::Clockwise | Self::CounterClockwise => speed_percent.min(100),
        }
    }
}

impl fmt::Display for MotorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("stop"),
            Self::Clockwise => f.write_str("cw"),
            Self::CounterClockwise => f.write_str("ccw"),
        }
    }
}

/// Actuator outputs and the presence input.
///
/// Implementations are plain register wrappers with no protocol state.
pub trait Actuator {
    /// Drive the motor at `speed_percent` duty.
    fn drive_motor(&mut self, direction: MotorDirection, speed_percent: u8);

    /// Sample the presence sensor. True while someone is in the doorway.
    fn presence_detected(&mut self) -> bool;

    /// Switch the buzzer.
    fn set_alarm(&mut self, on: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_has_zero_duty() {
        assert_eq!(MotorDirection::Stop.duty(100), 0);
        assert_eq!(MotorDirection::Clockwise.duty(100), 100);
        assert_eq!(MotorDirection::CounterClockwise.duty(250), 100);
    }
}
