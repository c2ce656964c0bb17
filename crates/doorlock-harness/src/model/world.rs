//! Model world - the operator's view of the door lock.

use doorlock_proto::ATTEMPT_LIMIT;

use super::operation::{ModelIntent, ModelPin, Operation, OperationError, OperationResult};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Stored credential digits.
    pub stored: Vec<u8>,
    /// Failed attempts since the last success or lockout.
    pub attempts_used: u8,
    /// Completed door cycles.
    pub door_cycles: u32,
    /// Lockouts served.
    pub lockouts: u32,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    stored: Vec<u8>,
    attempt_limit: u8,
    attempts_used: u8,
    /// Intent a rejected attempt is still prompting for.
    pending: Option<ModelIntent>,
    door_cycles: u32,
    lockouts: u32,
}

impl ModelWorld {
    /// World with `pin` enrolled and the default attempt limit.
    pub fn new(pin: ModelPin) -> Self {
        Self::with_limit(pin, ATTEMPT_LIMIT)
    }

    /// World with `pin` enrolled and `attempt_limit` failures before lockout.
    pub fn with_limit(pin: ModelPin, attempt_limit: u8) -> Self {
        Self {
            stored: pin.to_bytes(),
            attempt_limit: attempt_limit.max(1),
            attempts_used: 0,
            pending: None,
            door_cycles: 0,
            lockouts: 0,
        }
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Attempt { intent, pin, replacement } => {
                self.apply_attempt(*intent, *pin, *replacement)
            },
            Operation::Idle { .. } => OperationResult::Ok,
        }
    }

    fn apply_attempt(
        &mut self,
        intent: ModelIntent,
        pin: ModelPin,
        replacement: ModelPin,
    ) -> OperationResult {
        let intent = self.pending.take().unwrap_or(intent);

        if pin.to_bytes() == self.stored {
            self.attempts_used = 0;
            return match intent {
                ModelIntent::Open => {
                    self.door_cycles += 1;
                    OperationResult::Opened
                },
                ModelIntent::Change => {
                    self.stored = replacement.to_bytes();
                    OperationResult::Changed
                },
            };
        }

        self.attempts_used += 1;
        if self.attempts_used >= self.attempt_limit {
            self.attempts_used = 0;
            self.lockouts += 1;
            return OperationResult::Error(OperationError::LockedOut);
        }
        self.pending = Some(intent);
        OperationResult::Error(OperationError::Rejected)
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            stored: self.stored.clone(),
            attempts_used: self.attempts_used,
            door_cycles: self.door_cycles,
            lockouts: self.lockouts,
        }
    }
}
