//! Route gate
//!
//! One pure decision function shared by the four guarded areas of the app
//! shell. Resolving the inputs may take I/O ([`GateInput::resolve`]); the
//! decision itself never does.

use crate::error::WorkflowError;
use crate::store::WorkflowStateStore;
use holding_model::{OnboardingPath, Route, UserId, UserRole, WorkflowState};
use serde::{Deserialize, Serialize};

/// Area of the app being entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    /// Marketing pages, login, signup
    Public,
    /// Onboarding flow
    Onboarding,
    /// Dashboard
    Protected,
    /// Consultant area
    Consultant,
}

impl Area {
    /// Every area
    pub const ALL: [Area; 4] = [Area::Public, Area::Onboarding, Area::Protected, Area::Consultant];
}

/// Everything the gate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GateInput {
    /// Session present
    pub authenticated: bool,
    /// Profile role
    pub role: UserRole,
    /// Lifecycle state
    pub state: WorkflowState,
    /// Chosen onboarding path
    pub path: OnboardingPath,
}

impl GateInput {
    /// Input for a visitor without a session
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Input for a signed-in user
    #[must_use]
    pub fn signed_in(role: UserRole, state: WorkflowState, path: OnboardingPath) -> Self {
        Self {
            authenticated: true,
            role,
            state,
            path,
        }
    }

    /// Look up role and state for the session user
    pub async fn resolve(
        store: &WorkflowStateStore,
        session: Option<&UserId>,
        path: OnboardingPath,
    ) -> Self {
        match session {
            None => Self::anonymous(),
            Some(user) => {
                let state = store.get_state(user).await;
                let role = store.get_role(user).await;
                Self::signed_in(role, state, path)
            }
        }
    }
}

/// Gate answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "decision", content = "route", rename_all = "snake_case")]
pub enum GateDecision {
    /// Render the requested area
    Allow,
    /// Navigate elsewhere
    Redirect(Route),
}

impl GateDecision {
    /// True if the area may render
    #[inline]
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Redirect target, if any
    #[inline]
    #[must_use]
    pub fn redirect_to(self) -> Option<Route> {
        match self {
            Self::Allow => None,
            Self::Redirect(route) => Some(route),
        }
    }
}

/// Decide whether `input` may enter `area`
#[must_use]
pub fn decide(area: Area, input: &GateInput) -> GateDecision {
    match area {
        Area::Public => public(input),
        Area::Onboarding => onboarding(input),
        Area::Protected => protected(input),
        Area::Consultant => consultant(input),
    }
}

/// Session user for operations that cannot run anonymously
///
/// # Errors
/// `WorkflowError::AuthenticationRequired` without a session
pub fn require_session(session: Option<&UserId>) -> Result<&UserId, WorkflowError> {
    session.ok_or(WorkflowError::AuthenticationRequired)
}

/// Where to send a user who is not yet allowed into the dashboard
#[must_use]
pub fn next_step_route(state: WorkflowState) -> Route {
    match state {
        WorkflowState::FirstAccess => Route::Welcome,
        WorkflowState::OnboardingAi => Route::Chat,
        WorkflowState::OnboardingHuman => Route::HumanSchedule,
        WorkflowState::HoldingSetup => Route::HoldingSetup,
        WorkflowState::HoldingOpened => Route::Dashboard,
    }
}

/// Entry screen of the onboarding area for a signed-in user
///
/// The chosen path wins; without one, the path implied by the state is used.
#[must_use]
pub fn onboarding_entry(state: WorkflowState, path: OnboardingPath) -> Route {
    if state == WorkflowState::HoldingSetup {
        return Route::HoldingSetup;
    }
    let path = if path.is_set() { path } else { state.onboarding_path() };
    match path {
        OnboardingPath::Ai => Route::Chat,
        OnboardingPath::Human => Route::HumanSchedule,
        OnboardingPath::Unset => Route::OnboardingSelection,
    }
}

fn public(input: &GateInput) -> GateDecision {
    if !input.authenticated {
        return GateDecision::Allow;
    }
    if input.role.is_staff() {
        return GateDecision::Redirect(Route::Consultant);
    }
    if input.state == WorkflowState::HoldingOpened {
        return GateDecision::Redirect(Route::Dashboard);
    }
    GateDecision::Redirect(onboarding_entry(input.state, input.path))
}

fn onboarding(input: &GateInput) -> GateDecision {
    if !input.authenticated {
        GateDecision::Redirect(Route::Login)
    } else if input.state == WorkflowState::HoldingOpened {
        GateDecision::Redirect(Route::Dashboard)
    } else {
        GateDecision::Allow
    }
}

fn protected(input: &GateInput) -> GateDecision {
    if !input.authenticated {
        GateDecision::Redirect(Route::Login)
    } else if input.state == WorkflowState::HoldingOpened {
        GateDecision::Allow
    } else {
        GateDecision::Redirect(next_step_route(input.state))
    }
}

fn consultant(input: &GateInput) -> GateDecision {
    if !input.authenticated {
        GateDecision::Redirect(Route::Login)
    } else if input.role.is_staff() {
        GateDecision::Allow
    } else {
        GateDecision::Redirect(Route::Dashboard)
    }
}
