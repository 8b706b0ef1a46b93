//! Error types for the workflow crate
//!
//! Nothing here is fatal to the process. Each variant is scoped to the single
//! operation that produced it and is reported to the immediate caller.

use crate::onboarding::StepId;
use holding_model::{OnboardingPath, UserId, UserRole, WorkflowState};

/// Workflow error type
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// No session; the caller must redirect to login
    #[error("authentication required")]
    AuthenticationRequired,

    /// Reading the profile record failed
    #[error("profile fetch failed for {user}: {reason}")]
    ProfileFetchFailed {
        /// Affected user
        user: UserId,
        /// Backend message
        reason: String,
    },

    /// A write to the profile record did not commit
    #[error("persistence failed for {user}: {reason}")]
    PersistenceFailed {
        /// Affected user
        user: UserId,
        /// Backend message
        reason: String,
    },

    /// Target state is not reachable from the current one
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: WorkflowState,
        /// Requested state
        to: WorkflowState,
    },

    /// Administrative override attempted by a non-staff role
    #[error("role {0} may not override workflow state")]
    NotPrivileged(UserRole),

    /// A different onboarding path was already committed
    #[error("onboarding path already set to {0}")]
    OnboardingPathAlreadySet(OnboardingPath),

    /// Step operation requires a chosen path
    #[error("onboarding path not chosen")]
    OnboardingPathUnset,

    /// Step id not recognized
    #[error("unknown onboarding step: {0}")]
    UnknownStep(String),

    /// Step belongs to the other onboarding path
    #[error("step {step} is not part of the {path} path")]
    StepNotOnPath {
        /// Requested step
        step: StepId,
        /// Chosen path
        path: OnboardingPath,
    },

    /// Predecessors of the requested step are not completed
    #[error("step {step} is locked; incomplete: {missing:?}")]
    StepLocked {
        /// Requested step
        step: StepId,
        /// Incomplete predecessors, in sequence order
        missing: Vec<StepId>,
    },

    /// Onboarding snapshot could not be loaded or saved
    #[error("onboarding storage error: {0}")]
    OnboardingStorage(String),
}

impl WorkflowError {
    /// Check if the caller should send the user to login
    #[inline]
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::AuthenticationRequired)
    }

    /// Check if retrying the same operation may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProfileFetchFailed { .. } | Self::PersistenceFailed { .. } | Self::OnboardingStorage(_)
        )
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        Self::OnboardingStorage(err.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::OnboardingStorage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_error_display() {
        let err = WorkflowError::IllegalTransition {
            from: WorkflowState::FirstAccess,
            to: WorkflowState::HoldingOpened,
        };
        assert_eq!(err.to_string(), "illegal transition: first_access -> holding_opened");
    }

    #[test]
    fn workflow_error_is_retryable() {
        let err = WorkflowError::PersistenceFailed {
            user: UserId::from("u1"),
            reason: "timeout".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!WorkflowError::AuthenticationRequired.is_retryable());
        assert!(WorkflowError::AuthenticationRequired.requires_login());
    }
}
