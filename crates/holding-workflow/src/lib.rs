//! Holding Workflow - account lifecycle gating
//!
//! Three cooperating pieces:
//! - [`WorkflowStateStore`] owns each user's lifecycle state, writing the
//!   remote profile before touching its cache
//! - [`gate::decide`] maps `(area, session, state, path)` to allow/redirect
//! - [`OnboardingStepTracker`] walks the path-specific onboarding checklist
//!
//! # Example
//!
//! ```rust,ignore
//! use holding_workflow::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), WorkflowError> {
//! let store = WorkflowStateStore::new(Arc::new(InMemoryProfileStore::new()));
//! let user = UserId::from("user-1");
//!
//! let input = GateInput::resolve(&store, Some(&user), OnboardingPath::Unset).await;
//! assert_eq!(decide(Area::Protected, &input), GateDecision::Redirect(Route::Welcome));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod gate;
pub mod onboarding;
pub mod profile;
pub mod store;
pub mod transitions;

pub use error::WorkflowError;
pub use gate::{decide, next_step_route, onboarding_entry, require_session, Area, GateDecision, GateInput};
pub use onboarding::{
    InMemoryOnboardingStore, JsonFileOnboardingStore, OnboardingSnapshot, OnboardingStep,
    OnboardingStepTracker, OnboardingStore, StepId, StepProgress,
};
pub use profile::{InMemoryProfileStore, ProfileRecord, ProfileStore, ProfileStoreError, ProfileUpdate};
pub use store::{TransitionReceipt, WorkflowStateStore};
pub use transitions::{allowed_transitions, validate_transition};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the workflow crate
    pub use crate::{
        decide, Area, GateDecision, GateInput, InMemoryOnboardingStore, InMemoryProfileStore,
        OnboardingStepTracker, StepId, WorkflowError, WorkflowStateStore,
    };
    pub use holding_model::{OnboardingPath, Route, UserId, UserRole, WorkflowState};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
