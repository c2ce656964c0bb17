//! Control node runtime.

use doorlock_core::{
    Actuator, ControlAction, ControlEvent, ControlNode, CredentialManager, CredentialStore,
    Environment, Expectation, Link, MotorDirection, ProtocolError, TickSource, TimerSlots,
};

use crate::{config::NodeConfig, error::NodeError, executor};

const NODE: &str = "control";

/// Drives a [`ControlNode`] against a link, an actuator and a tick source.
pub struct ControlRuntime<S, L, A, T, E> {
    node: ControlNode<S>,
    link: L,
    actuator: A,
    timers: TimerSlots<T>,
    env: E,
    config: NodeConfig,
}

impl<S, L, A, T, E> ControlRuntime<S, L, A, T, E>
where
    S: CredentialStore,
    L: Link,
    A: Actuator,
    T: TickSource,
    E: Environment,
{
    /// Boot the node and announce sync on the link.
    pub async fn start(
        config: NodeConfig,
        store: S,
        link: L,
        actuator: A,
        ticks: T,
        env: E,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let manager = CredentialManager::new(store, config.protocol.credential_offset);
        manager.check_layout()?;
        let (node, actions) = ControlNode::boot(config.protocol, manager);
        let timers = TimerSlots::new(ticks, &config.protocol);

        let mut runtime = Self { node, link, actuator, timers, env, config };
        runtime.execute(actions).await?;
        Ok(runtime)
    }

    /// State machine.
    pub fn node(&self) -> &ControlNode<S> {
        &self.node
    }

    /// Actuator.
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Obtain the input the node expects, feed it, execute the result.
    ///
    /// Recoverable protocol errors are handled here; only fatal ones are
    /// returned, with the outputs already driven safe. A recovery that fails
    /// is fatal.
    pub async fn step(&mut self) -> Result<(), NodeError> {
        let outcome = match self.next_event().await {
            Ok(event) => self.node.handle(event),
            Err(NodeError::Protocol(err)) => Err(err),
            Err(err) => {
                tracing::error!(node = NODE, state = %self.node.state(), error = %err, "stopping");
                self.drive_safe();
                return Err(err);
            },
        };

        match outcome {
            Ok(actions) => self.execute(actions).await,
            Err(err) if !err.is_fatal() => {
                executor::report_recoverable(NODE, &err);
                match self.node.recover() {
                    Ok(actions) => {
                        self.execute(actions).await?;
                        self.timers.reset();
                        Ok(())
                    },
                    Err(fatal) => Err(self.halt(fatal)),
                }
            },
            Err(err) => Err(self.halt(err)),
        }
    }

    /// Step until a fatal error.
    pub async fn run(mut self) -> Result<(), NodeError> {
        tracing::info!(node = NODE, tick_period = ?self.config.tick_period, "running");
        loop {
            self.step().await?;
        }
    }

    async fn next_event(&mut self) -> Result<ControlEvent, NodeError> {
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
                Ok(ControlEvent::Received(byte))
            },
            Expectation::DoorFlag { open } => {
                executor::door_travelled(&self.timers, open).await?;
                Ok(ControlEvent::DoorTravelled { open })
            },
            Expectation::PresenceClear => {
                while self.actuator.presence_detected() {
                    self.env.sleep(self.config.presence_poll).await;
                }
                Ok(ControlEvent::PresenceCleared)
            },
            // The link is drained during the lockout so the node discards
            // whatever the peer sends instead of reading it afterwards.
            Expectation::LockoutExpiry => tokio::select! {
                biased;
                expired = executor::lockout_expired(&self.timers) => {
                    expired?;
                    Ok(ControlEvent::LockoutExpired)
                },
                byte = self.link.recv_byte() => {
                    Ok(ControlEvent::Received(byte.map_err(NodeError::Link)?))
                },
            },
            Expectation::OperatorIntent | Expectation::OperatorCredential => {
                Err(ProtocolError::InvalidState { state, event: "operator-input" }.into())
            },
        }
    }

    fn halt(&mut self, err: ProtocolError) -> NodeError {
        tracing::error!(node = NODE, state = %self.node.state(), error = %err, "fatal");
        self.drive_safe();
        err.into()
    }

    fn drive_safe(&mut self) {
        self.timers.reset();
        self.actuator.drive_motor(MotorDirection::Stop, 0);
        self.actuator.set_alarm(false);
    }

    async fn execute(&mut self, actions: Vec<ControlAction>) -> Result<(), NodeError> {
        for action in actions {
            match action {
                ControlAction::Send(message) => {
                    tracing::debug!(node = NODE, byte = %message, "send");
                    self.link.send_message(message).await.map_err(NodeError::Link)?;
                },
                ControlAction::Motor(direction) => {
                    self.actuator.drive_motor(direction, direction.duty(self.config.motor_speed));
                },
                ControlAction::Alarm(on) => self.actuator.set_alarm(on),
                ControlAction::BindTimer(job) => self.timers.bind(job),
                ControlAction::UnbindTimer => self.timers.unbind(),
                ControlAction::Log { level, message } => {
                    executor::emit_log(NODE, self.node.state(), level, &message);
                },
            }
        }
        Ok(())
    }
}
