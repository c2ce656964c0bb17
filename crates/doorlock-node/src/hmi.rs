//! HMI node runtime.

use doorlock_core::{
    Environment, Expectation, HmiAction, HmiEvent, HmiNode, Keypad, KeypadEntry, Link,
    ProtocolError, StatusDisplay, TickSource, TimerSlots,
};
use doorlock_proto::Intent;

use crate::{config::NodeConfig, error::NodeError, executor};

const NODE: &str = "hmi";

/// Drives an [`HmiNode`] against a link, a keypad, a display and a tick
/// source.
pub struct HmiRuntime<L, K, D, T, E> {
    node: HmiNode,
    link: L,
    keypad: K,
    display: D,
    timers: TimerSlots<T>,
    env: E,
    config: NodeConfig,
}

impl<L, K, D, T, E> HmiRuntime<L, K, D, T, E>
where
    L: Link,
    K: Keypad,
    D: StatusDisplay,
    T: TickSource,
    E: Environment,
{
    /// Boot the node and announce sync on the link.
    pub async fn start(
        config: NodeConfig,
        link: L,
        keypad: K,
        display: D,
        ticks: T,
        env: E,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let (node, actions) = HmiNode::boot(config.protocol);
        let timers = TimerSlots::new(ticks, &config.protocol);

        let mut runtime = Self { node, link, keypad, display, timers, env, config };
        runtime.execute(actions).await?;
        Ok(runtime)
    }

    /// State machine.
    pub fn node(&self) -> &HmiNode {
        &self.node
    }

    /// Display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Obtain the input the node expects, feed it, execute the result.
    ///
    /// Recoverable protocol errors are handled here; only fatal ones are
    /// returned.
    pub async fn step(&mut self) -> Result<(), NodeError> {
        let outcome = match self.next_event().await {
            Ok(event) => self.node.handle(event),
            Err(NodeError::Protocol(err)) => Err(err),
            Err(err) => return Err(err),
        };

        match outcome {
            Ok(actions) => self.execute(actions).await,
            Err(err) if !err.is_fatal() => {
                executor::report_recoverable(NODE, &err);
                let actions = self.node.recover();
                self.execute(actions).await?;
                self.timers.reset();
                Ok(())
            },
            Err(err) => {
                tracing::error!(node = NODE, state = %self.node.state(), error = %err, "fatal");
                self.timers.reset();
                Err(err.into())
            },
        }
    }

    /// Step until a fatal error or the keypad closes.
    pub async fn run(mut self) -> Result<(), NodeError> {
        tracing::info!(node = NODE, tick_period = ?self.config.tick_period, "running");
        loop {
            self.step().await?;
        }
    }

    async fn next_event(&mut self) -> Result<HmiEvent, NodeError> {
        let state = self.node.state();
        match self.node.expecting() {
            Expectation::Link { reply_pending } => {
                let byte = executor::recv_byte(
                    &mut self.link,
                    &self.env,
                    state,
                    reply_pending,
                    self.config.link_timeout,
                )
                .await?;
                Ok(HmiEvent::Received(byte))
            },
            Expectation::OperatorIntent => loop {
                let key = self.keypad.next_key().await.map_err(NodeError::from_keypad)?;
                if let Some(intent) = Intent::from_key(key) {
                    break Ok(HmiEvent::IntentChosen(intent));
                }
            },
            Expectation::OperatorCredential => {
                let mut entry = KeypadEntry::new();
                loop {
                    let key = self.keypad.next_key().await.map_err(NodeError::from_keypad)?;
                    if let Some(credential) = entry.push(key) {
                        break Ok(HmiEvent::CredentialEntered(credential));
                    }
                }
            },
            Expectation::DoorFlag { open } => {
                executor::door_travelled(&self.timers, open).await?;
                Ok(HmiEvent::DoorTravelled { open })
            },
            Expectation::LockoutExpiry => {
                executor::lockout_expired(&self.timers).await?;
                Ok(HmiEvent::LockoutExpired)
            },
            Expectation::PresenceClear => {
                Err(ProtocolError::InvalidState { state, event: "presence" }.into())
            },
        }
    }

    async fn execute(&mut self, actions: Vec<HmiAction>) -> Result<(), NodeError> {
        for action in actions {
            match action {
                HmiAction::Send(message) => {
                    tracing::debug!(node = NODE, byte = %message, "send");
                    self.link.send_message(message).await.map_err(NodeError::Link)?;
                },
                HmiAction::SendCredential(credential) => {
                    tracing::debug!(node = NODE, ?credential, "send");
                    self.link.send_credential(&credential).await.map_err(NodeError::Link)?;
                },
                HmiAction::Display(screen) => self.display.show(screen),
                HmiAction::BindTimer(job) => self.timers.bind(job),
                HmiAction::UnbindTimer => self.timers.unbind(),
                HmiAction::Log { level, message } => {
                    executor::emit_log(NODE, self.node.state(), level, &message);
                },
            }
        }
        Ok(())
    }
}
