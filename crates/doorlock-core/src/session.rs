//! Per-node login session.
//!
//! Each node keeps its own [`Session`]. The two copies stay equal because
//! both nodes observe the same verdict bytes in the same order, which is what
//! lets the HMI predict the Control node's lockout.

/// Result of counting a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Budget not exhausted yet.
    Retry {
        /// Attempts left before a lockout
        remaining: u8,
    },
    /// Budget exhausted, lockout must start.
    LockedOut,
}

/// Attempt budget and authentication flag, owned by the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    attempts_used: u8,
    attempt_limit: u8,
    authenticated: bool,
}

impl Session {
    /// New session with a fresh budget.
    pub fn new(attempt_limit: u8) -> Self {
        Self { attempts_used: 0, attempt_limit: attempt_limit.max(1), authenticated: false }
    }

    /// Failed attempts since the last success or lockout.
    pub fn attempts_used(&self) -> u8 {
        self.attempts_used
    }

    /// Failures allowed before a lockout.
    pub fn attempt_limit(&self) -> u8 {
        self.attempt_limit
    }

    /// Whether the last attempt succeeded and its operation is still running.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Count a failure.
    pub fn record_failure(&mut self) -> AttemptOutcome {
        self.authenticated = false;
        self.attempts_used = self.attempts_used.saturating_add(1);
        if self.attempts_used >= self.attempt_limit {
            AttemptOutcome::LockedOut
        } else {
            AttemptOutcome::Retry { remaining: self.attempt_limit - self.attempts_used }
        }
    }

    /// A success clears the budget.
    pub fn record_success(&mut self) {
        self.attempts_used = 0;
        self.authenticated = true;
    }

    /// Lockout expired; the budget starts over.
    pub fn complete_lockout(&mut self) {
        self.attempts_used = 0;
        self.authenticated = false;
    }

    /// The authenticated operation finished or was aborted.
    pub fn end_operation(&mut self) {
        self.authenticated = false;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn third_failure_locks_out() {
        let mut session = Session::new(3);
        assert_eq!(session.record_failure(), AttemptOutcome::Retry { remaining: 2 });
        assert_eq!(session.record_failure(), AttemptOutcome::Retry { remaining: 1 });
        assert_eq!(session.record_failure(), AttemptOutcome::LockedOut);
        assert_eq!(session.attempts_used(), 3);

        session.complete_lockout();
        assert_eq!(session.attempts_used(), 0);
    }

    #[test]
    fn success_resets_budget() {
        let mut session = Session::new(3);
        session.record_failure();
        session.record_failure();
        session.record_success();
        assert_eq!(session.attempts_used(), 0);
        assert!(session.is_authenticated());

        session.end_operation();
        assert!(!session.is_authenticated());
        assert_eq!(session.record_failure(), AttemptOutcome::Retry { remaining: 2 });
    }

    proptest! {
        #[test]
        fn lockout_fires_exactly_at_limit(outcomes in prop::collection::vec(any::<bool>(), 0..40)) {
            let mut session = Session::new(3);
            let mut consecutive = 0u8;
            for success in outcomes {
                if success {
                    session.record_success();
                    consecutive = 0;
                    continue;
                }
                consecutive += 1;
                let outcome = session.record_failure();
                if consecutive == 3 {
                    prop_assert_eq!(outcome, AttemptOutcome::LockedOut);
                    session.complete_lockout();
                    consecutive = 0;
                } else {
                    prop_assert_eq!(outcome, AttemptOutcome::Retry { remaining: 3 - consecutive });
                }
            }
        }
    }
}
