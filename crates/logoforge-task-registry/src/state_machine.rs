//! Task state machine enforcement (spec.md §3 invariants, state diagram
//! in §4.11).
//!
//! ```text
//!    [create]          [worker claim]         [workflow ok]
//! pending ──────────▶ processing ───────────▶ completed*
//!    │                     │
//!    │  [reaper/cancel]    │  [permanent err / reaper]
//!    └─────────────▶ failed* ◀────────────────┘
//! (* terminal, immutable)
//! ```

use logoforge_domain::TaskStatus;

use crate::error::TaskRegistryError;

/// Validate a status transition. `pending → failed` is allowed directly
/// (reaper, cancel); `pending → completed` is not — every successful
/// workflow must first be claimed via `processing`.
pub fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<(), TaskRegistryError> {
    use TaskStatus::*;
    let allowed = matches!(
        (from, to),
        (Pending, Processing) | (Pending, Failed) | (Processing, Completed) | (Processing, Failed)
    );
    if allowed {
        Ok(())
    } else if from.is_terminal() {
        Err(TaskRegistryError::InvalidTransition { from, to })
    } else {
        Err(TaskRegistryError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn pending_may_go_to_processing_or_failed() {
        assert!(validate_transition(Pending, Processing).is_ok());
        assert!(validate_transition(Pending, Failed).is_ok());
        assert!(validate_transition(Pending, Completed).is_err());
    }

    #[test]
    fn processing_may_go_to_completed_or_failed() {
        assert!(validate_transition(Processing, Completed).is_ok());
        assert!(validate_transition(Processing, Failed).is_ok());
        assert!(validate_transition(Processing, Pending).is_err());
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for terminal in [Completed, Failed] {
            for target in [Pending, Processing, Completed, Failed] {
                assert!(validate_transition(terminal, target).is_err());
            }
        }
    }
}
