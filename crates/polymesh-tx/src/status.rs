//! Transaction status state machine.

use serde::Serialize;
use std::fmt;

/// Lifecycle of one transaction run.
///
/// Statuses only move forward: `Idle < Unapproved < Running < terminal`, and
/// no terminal status is ever left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionStatus {
    /// Built, not yet submitted.
    Idle,
    /// Waiting for the signer to authorize.
    Unapproved,
    /// Signed and in the submission pipeline.
    Running,
    /// Included and executed without error.
    Succeeded,
    /// Refused before broadcast, or included and reverted.
    Failed,
    /// Dropped from the transaction pool before inclusion.
    Aborted,
    /// The signer declined to sign.
    Rejected,
}

impl TransactionStatus {
    fn rank(self) -> u8 {
        match self {
            TransactionStatus::Idle => 0,
            TransactionStatus::Unapproved => 1,
            TransactionStatus::Running => 2,
            TransactionStatus::Succeeded
            | TransactionStatus::Failed
            | TransactionStatus::Aborted
            | TransactionStatus::Rejected => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 3
    }

    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Idle => "Idle",
            TransactionStatus::Unapproved => "Unapproved",
            TransactionStatus::Running => "Running",
            TransactionStatus::Succeeded => "Succeeded",
            TransactionStatus::Failed => "Failed",
            TransactionStatus::Aborted => "Aborted",
            TransactionStatus::Rejected => "Rejected",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransactionStatus::*;

    const ALL: [TransactionStatus; 7] = [Idle, Unapproved, Running, Succeeded, Failed, Aborted, Rejected];

    #[test]
    fn test_forward_transitions() {
        assert!(Idle.can_transition_to(Unapproved));
        assert!(Unapproved.can_transition_to(Running));
        assert!(Running.can_transition_to(Succeeded));
        assert!(Running.can_transition_to(Aborted));
        assert!(Unapproved.can_transition_to(Rejected));
        assert!(Idle.can_transition_to(Failed));
    }

    #[test]
    fn test_no_backward_or_repeated_transitions() {
        assert!(!Running.can_transition_to(Unapproved));
        assert!(!Running.can_transition_to(Running));
        assert!(!Unapproved.can_transition_to(Idle));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }
}
