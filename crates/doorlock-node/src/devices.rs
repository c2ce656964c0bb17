//! Console stand-ins for the node hardware.
//!
//! Outputs go to the log; the presence sensor is simulated by holding the
//! doorway occupied for a fixed time after the door stops opening.

use std::{
    io,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use doorlock_core::{Actuator, Environment, Keypad, MotorDirection, Screen, StatusDisplay};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, Stdin};

/// Actuator that logs every output.
#[derive(Debug)]
pub struct ConsoleActuator<E> {
    env: E,
    presence_hold: Duration,
    motor: MotorDirection,
    alarm: bool,
    occupied_since: Option<Instant>,
}

impl<E: Environment> ConsoleActuator<E> {
    /// Actuator whose doorway stays occupied for `presence_hold` after each
    /// opening.
    pub fn new(env: E, presence_hold: Duration) -> Self {
        Self { env, presence_hold, motor: MotorDirection::Stop, alarm: false, occupied_since: None }
    }

    /// Last commanded direction.
    pub fn motor(&self) -> MotorDirection {
        self.motor
    }

    /// Whether the buzzer is sounding.
    pub fn alarm(&self) -> bool {
        self.alarm
    }
}

impl<E: Environment> Actuator for ConsoleActuator<E> {
    fn drive_motor(&mut self, direction: MotorDirection, speed_percent: u8) {
        if self.motor == MotorDirection::Clockwise && direction == MotorDirection::Stop {
            self.occupied_since = Some(self.env.now());
        }
        self.motor = direction;
        tracing::info!(%direction, speed_percent, "motor");
    }

    fn presence_detected(&mut self) -> bool {
        match self.occupied_since {
            Some(since) if self.env.now().duration_since(since) < self.presence_hold => true,
            Some(_) => {
                self.occupied_since = None;
                tracing::debug!("doorway clear");
                false
            },
            None => false,
        }
    }

    fn set_alarm(&mut self, on: bool) {
        self.alarm = on;
        tracing::info!(on, "alarm");
    }
}

/// Keypad reading key codes from a byte stream, one byte per key.
///
/// Whitespace is skipped so a terminal user can type `1234=` and press
/// return.
#[derive(Debug)]
pub struct StreamKeypad<R> {
    input: BufReader<R>,
}

impl<R: AsyncRead + Unpin + Send> StreamKeypad<R> {
    /// Keypad over `input`.
    pub fn new(input: R) -> Self {
        Self { input: BufReader::new(input) }
    }
}

impl StreamKeypad<Stdin> {
    /// Keypad over the process's standard input.
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> Keypad for StreamKeypad<R> {
    async fn next_key(&mut self) -> io::Result<u8> {
        loop {
            let key = self.input.read_u8().await?;
            if !key.is_ascii_whitespace() {
                return Ok(key);
            }
        }
    }
}

/// Display that logs each screen.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&mut self, screen: Screen) {
        let [top, bottom] = screen.lines();
        tracing::info!(top, bottom, "display");
    }
}
