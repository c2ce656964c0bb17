//! Input gathering and log emission shared by both runtimes.

use std::time::Duration;

use doorlock_core::{
    Environment, Link, LogLevel, ProtocolError, ProtocolState, TickSource, TimerJob, TimerSlots,
};

use crate::error::NodeError;

/// Forward a state machine log entry to `tracing`.
pub fn emit_log(node: &'static str, state: ProtocolState, level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(node, %state, "{message}"),
        LogLevel::Info => tracing::info!(node, %state, "{message}"),
        LogLevel::Warn => tracing::warn!(node, %state, "{message}"),
    }
}

/// Read the next link byte.
///
/// When the peer owes a reply and a link timeout is configured, silence
/// becomes [`ProtocolError::LinkTimeout`]. Otherwise the wait is unbounded.
pub async fn recv_byte<L: Link, E: Environment>(
    link: &mut L,
    env: &E,
    state: ProtocolState,
    reply_pending: bool,
    timeout: Option<Duration>,
) -> Result<u8, NodeError> {
    let Some(timeout) = timeout.filter(|_| reply_pending) else {
        return link.recv_byte().await.map_err(NodeError::Link);
    };

    tokio::select! {
        byte = link.recv_byte() => byte.map_err(NodeError::Link),
        () = env.sleep(timeout) => Err(ProtocolError::LinkTimeout { state }.into()),
    }
}

/// Wait for the door flag to read `open`.
pub async fn door_travelled<T: TickSource>(
    timers: &TimerSlots<T>,
    open: bool,
) -> Result<(), NodeError> {
    let door = timers.door().ok_or(NodeError::TimerMissing(TimerJob::DoorTravel))?;
    door.wait_for(open).await;
    Ok(())
}

/// Wait for the lockout cooldown to finish.
pub async fn lockout_expired<T: TickSource>(timers: &TimerSlots<T>) -> Result<(), NodeError> {
    let lockout = timers.lockout().ok_or(NodeError::TimerMissing(TimerJob::Lockout))?;
    lockout.wait_finished().await;
    Ok(())
}

/// Log a recoverable protocol error before recovery.
pub fn report_recoverable(node: &'static str, err: &ProtocolError) {
    tracing::warn!(node, error = %err, "protocol fault, recovering");
}
