//! Navigation targets
//!
//! The route gate answers with one of these; the app shell maps them to its
//! own router.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A screen the app shell can redirect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Login screen
    Login,
    /// First screen after signup
    Welcome,
    /// Onboarding path selection
    OnboardingSelection,
    /// AI onboarding chat
    Chat,
    /// Scheduling with a human consultant
    HumanSchedule,
    /// Document collection during onboarding
    DocumentCollection,
    /// Document review during onboarding
    DocumentReview,
    /// Holding setup (document uploads)
    HoldingSetup,
    /// Main dashboard
    Dashboard,
    /// Consultant area
    Consultant,
}

impl Route {
    /// Path the app shell navigates to
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Welcome => "/welcome",
            Self::OnboardingSelection => "/onboarding",
            Self::Chat => "/onboarding/chat",
            Self::HumanSchedule => "/onboarding/human/schedule",
            Self::DocumentCollection => "/document-collection",
            Self::DocumentReview => "/document-review",
            Self::HoldingSetup => "/holding-setup",
            Self::Dashboard => "/dashboard",
            Self::Consultant => "/consultant",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
