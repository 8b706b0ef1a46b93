//! Account lifecycle vocabulary
//!
//! `WorkflowState` is the coarse stage of an account, `OnboardingPath` the
//! sub-flow chosen while onboarding, `UserRole` the profile role used by the
//! consultant area.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle stage of a user account
///
/// Exactly one value exists per user. New accounts start at `FirstAccess`;
/// `HoldingOpened` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Signed up, no onboarding path chosen yet
    #[default]
    FirstAccess,
    /// Onboarding guided by the AI assistant
    OnboardingAi,
    /// Onboarding guided by a human consultant
    OnboardingHuman,
    /// Collecting the documents required to open the holding
    HoldingSetup,
    /// Holding opened; dashboard unlocked
    HoldingOpened,
}

impl WorkflowState {
    /// Every state, in lifecycle order
    pub const ALL: [WorkflowState; 5] = [
        WorkflowState::FirstAccess,
        WorkflowState::OnboardingAi,
        WorkflowState::OnboardingHuman,
        WorkflowState::HoldingSetup,
        WorkflowState::HoldingOpened,
    ];

    /// Wire name, as stored on the profile record
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstAccess => "first_access",
            Self::OnboardingAi => "onboarding_ai",
            Self::OnboardingHuman => "onboarding_human",
            Self::HoldingSetup => "holding_setup",
            Self::HoldingOpened => "holding_opened",
        }
    }

    /// True while the account is inside one of the onboarding sub-flows
    #[inline]
    #[must_use]
    pub fn is_onboarding(self) -> bool {
        matches!(self, Self::OnboardingAi | Self::OnboardingHuman)
    }

    /// True once no further lifecycle move exists
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::HoldingOpened)
    }

    /// Onboarding path implied by this state, if any
    #[must_use]
    pub fn onboarding_path(self) -> OnboardingPath {
        match self {
            Self::OnboardingAi => OnboardingPath::Ai,
            Self::OnboardingHuman => OnboardingPath::Human,
            _ => OnboardingPath::Unset,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ModelError::UnknownWorkflowState(s.to_string()))
    }
}

/// Onboarding sub-flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingPath {
    /// Guided by the AI assistant
    Ai,
    /// Guided by a human consultant
    Human,
    /// Not chosen yet
    #[default]
    Unset,
}

impl OnboardingPath {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Human => "human",
            Self::Unset => "unset",
        }
    }

    /// True once a path was chosen
    #[inline]
    #[must_use]
    pub fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Workflow state entered when this path is chosen
    #[must_use]
    pub fn workflow_state(self) -> Option<WorkflowState> {
        match self {
            Self::Ai => Some(WorkflowState::OnboardingAi),
            Self::Human => Some(WorkflowState::OnboardingHuman),
            Self::Unset => None,
        }
    }
}

impl fmt::Display for OnboardingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnboardingPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(Self::Ai),
            "human" => Ok(Self::Human),
            "unset" | "" => Ok(Self::Unset),
            other => Err(ModelError::UnknownOnboardingPath(other.to_string())),
        }
    }
}

/// Role stored on the profile record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular customer
    #[default]
    Client,
    /// Consultant serving clients
    Consultant,
    /// Administrator
    Admin,
}

impl UserRole {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Consultant => "consultant",
            Self::Admin => "admin",
        }
    }

    /// Consultants and admins may enter the consultant area
    #[inline]
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Consultant | Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "consultant" => Ok(Self::Consultant),
            "admin" => Ok(Self::Admin),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}
