//! Onboarding step sequence
//!
//! Both paths share one ordered sequence. Each path owns one branch step
//! (`chat` for AI, `schedule` for human) and the two converge on
//! `documents` and then `review`.

use crate::error::WorkflowError;
use holding_model::{OnboardingPath, Route};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Onboarding step identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Choosing between the AI and human paths
    Selection,
    /// AI chat (AI path branch)
    Chat,
    /// Consultant scheduling (human path branch)
    Schedule,
    /// Document collection
    Documents,
    /// Document review
    Review,
}

/// Sequence order shared by both paths
pub const SEQUENCE: [StepId; 5] = [
    StepId::Selection,
    StepId::Chat,
    StepId::Schedule,
    StepId::Documents,
    StepId::Review,
];

impl StepId {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Chat => "chat",
            Self::Schedule => "schedule",
            Self::Documents => "documents",
            Self::Review => "review",
        }
    }

    /// Label shown in the progress tracker
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Selection => "Escolha de Onboarding",
            Self::Chat => "Chat com IA",
            Self::Schedule => "Agendamento com Consultor",
            Self::Documents => "Coleta de Documentos",
            Self::Review => "Revisão de Documentos",
        }
    }

    /// Screen that hosts the step
    #[must_use]
    pub fn route(self) -> Route {
        match self {
            Self::Selection => Route::OnboardingSelection,
            Self::Chat => Route::Chat,
            Self::Schedule => Route::HumanSchedule,
            Self::Documents => Route::DocumentCollection,
            Self::Review => Route::DocumentReview,
        }
    }

    /// Position in [`SEQUENCE`]
    #[must_use]
    pub fn position(self) -> usize {
        match self {
            Self::Selection => 0,
            Self::Chat => 1,
            Self::Schedule => 2,
            Self::Documents => 3,
            Self::Review => 4,
        }
    }

    /// True if the step is walked on `path`
    #[must_use]
    pub fn is_on_path(self, path: OnboardingPath) -> bool {
        match self {
            Self::Chat => path == OnboardingPath::Ai,
            Self::Schedule => path == OnboardingPath::Human,
            _ => true,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SEQUENCE
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| WorkflowError::UnknownStep(s.to_string()))
    }
}

/// Branch step owned by `path`
#[must_use]
pub fn branch_step(path: OnboardingPath) -> Option<StepId> {
    match path {
        OnboardingPath::Ai => Some(StepId::Chat),
        OnboardingPath::Human => Some(StepId::Schedule),
        OnboardingPath::Unset => None,
    }
}

/// Step that follows `step` on `path`
#[must_use]
pub fn next_step(path: OnboardingPath, step: StepId) -> Option<StepId> {
    match path {
        OnboardingPath::Ai => next_ai(step),
        OnboardingPath::Human => next_human(step),
        OnboardingPath::Unset => None,
    }
}

fn next_ai(step: StepId) -> Option<StepId> {
    match step {
        StepId::Selection => Some(StepId::Chat),
        StepId::Chat => Some(StepId::Documents),
        StepId::Documents => Some(StepId::Review),
        StepId::Schedule | StepId::Review => None,
    }
}

fn next_human(step: StepId) -> Option<StepId> {
    match step {
        StepId::Selection => Some(StepId::Schedule),
        StepId::Schedule => Some(StepId::Documents),
        StepId::Documents => Some(StepId::Review),
        StepId::Chat | StepId::Review => None,
    }
}

/// One entry of a user's step checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingStep {
    /// Step id
    pub id: StepId,
    /// Display label
    pub display_name: String,
    /// Completed flag
    pub completed: bool,
    /// Hosting screen
    pub route: Route,
}

impl OnboardingStep {
    /// Fresh, uncompleted step
    #[must_use]
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            display_name: id.display_name().to_string(),
            completed: false,
            route: id.route(),
        }
    }
}

/// Fresh checklist in sequence order
#[must_use]
pub fn instantiate() -> Vec<OnboardingStep> {
    SEQUENCE.into_iter().map(OnboardingStep::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_converge_on_documents() {
        assert_eq!(next_step(OnboardingPath::Ai, StepId::Chat), Some(StepId::Documents));
        assert_eq!(next_step(OnboardingPath::Human, StepId::Schedule), Some(StepId::Documents));
        assert_eq!(next_step(OnboardingPath::Ai, StepId::Documents), Some(StepId::Review));
        assert_eq!(next_step(OnboardingPath::Human, StepId::Review), None);
    }

    #[test]
    fn branch_steps_are_exclusive() {
        assert!(StepId::Chat.is_on_path(OnboardingPath::Ai));
        assert!(!StepId::Chat.is_on_path(OnboardingPath::Human));
        assert!(StepId::Schedule.is_on_path(OnboardingPath::Human));
        assert!(StepId::Documents.is_on_path(OnboardingPath::Human));
        assert_eq!(branch_step(OnboardingPath::Unset), None);
    }

    #[test]
    fn positions_match_sequence() {
        for (idx, step) in SEQUENCE.iter().enumerate() {
            assert_eq!(step.position(), idx);
        }
    }

    #[test]
    fn parse_step_ids() {
        assert_eq!("documents".parse::<StepId>().unwrap(), StepId::Documents);
        assert!(matches!(
            "payment".parse::<StepId>(),
            Err(WorkflowError::UnknownStep(_))
        ));
    }
}
