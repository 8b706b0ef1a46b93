//! Lifecycle transition graph
//!
//! `first_access` branches into one of the two onboarding states, both of
//! which converge on `holding_setup`; `holding_opened` is terminal.

use crate::error::WorkflowError;
use holding_model::WorkflowState;

/// Validates a lifecycle transition.
///
/// Staying in the same state is not a transition and is rejected here; the
/// store treats it as a no-op before calling this.
pub fn validate_transition(from: WorkflowState, to: WorkflowState) -> Result<(), WorkflowError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// Targets reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: WorkflowState) -> &'static [WorkflowState] {
    use WorkflowState::*;
    match from {
        FirstAccess => &[OnboardingAi, OnboardingHuman],
        OnboardingAi | OnboardingHuman => &[HoldingSetup],
        HoldingSetup => &[HoldingOpened],
        HoldingOpened => &[],
    }
}

fn allowed(from: WorkflowState, to: WorkflowState) -> bool {
    allowed_transitions(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_access_branches() {
        assert!(validate_transition(WorkflowState::FirstAccess, WorkflowState::OnboardingAi).is_ok());
        assert!(validate_transition(WorkflowState::FirstAccess, WorkflowState::OnboardingHuman).is_ok());

        // Invalid
        assert!(validate_transition(WorkflowState::FirstAccess, WorkflowState::HoldingSetup).is_err());
        assert!(validate_transition(WorkflowState::FirstAccess, WorkflowState::HoldingOpened).is_err());
    }

    #[test]
    fn onboarding_paths_converge() {
        assert!(validate_transition(WorkflowState::OnboardingAi, WorkflowState::HoldingSetup).is_ok());
        assert!(validate_transition(WorkflowState::OnboardingHuman, WorkflowState::HoldingSetup).is_ok());
        assert!(validate_transition(WorkflowState::OnboardingAi, WorkflowState::OnboardingHuman).is_err());
    }

    #[test]
    fn holding_opened_is_terminal() {
        assert!(allowed_transitions(WorkflowState::HoldingOpened).is_empty());
        assert!(validate_transition(WorkflowState::HoldingOpened, WorkflowState::HoldingSetup).is_err());
    }

    proptest! {
        #[test]
        fn prop_validation_agrees_with_table(from in 0usize..5, to in 0usize..5) {
            let from = WorkflowState::ALL[from];
            let to = WorkflowState::ALL[to];
            let res = validate_transition(from, to);
            prop_assert_eq!(res.is_ok(), allowed_transitions(from).contains(&to));
        }

        #[test]
        fn prop_transitions_never_move_backwards(from in 0usize..5) {
            let state = WorkflowState::ALL[from];
            let rank = |s: WorkflowState| WorkflowState::ALL.iter().position(|x| *x == s).unwrap();
            for next in allowed_transitions(state) {
                prop_assert!(rank(*next) > rank(state));
            }
        }
    }
}
