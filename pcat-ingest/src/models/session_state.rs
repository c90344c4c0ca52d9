//! Ingestion session state machine
//!
//! IDLE → RUNNING → COMPLETED | FAILED | CANCELLED
//!
//! Precondition failures go straight from IDLE to FAILED, and `cancel()` may
//! be called from IDLE too. Terminal states never transition again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ingestion session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Created, `start` not yet called
    Idle,
    /// Pulling chunks from the stream
    Running,
    /// Stream ended without error
    Completed,
    /// Terminal error surfaced to subscribers
    Failed,
    /// Torn down by the consumer
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Idle, Failed)
                | (Idle, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [
            SessionState::Completed,
            SessionState::Failed,
            SessionState::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            for next in [
                SessionState::Idle,
                SessionState::Running,
                SessionState::Completed,
                SessionState::Failed,
                SessionState::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_idle_only_enters_running_once() {
        assert!(SessionState::Idle.can_transition_to(SessionState::Running));
        assert!(!SessionState::Running.can_transition_to(SessionState::Running));
        assert!(!SessionState::Running.can_transition_to(SessionState::Idle));
    }

    #[test]
    fn test_serialized_uppercase() {
        assert_eq!(
            serde_json::to_string(&SessionState::Running).unwrap(),
            "\"RUNNING\""
        );
    }
}
