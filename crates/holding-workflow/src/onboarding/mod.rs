//! Onboarding step tracker
//!
//! Scoped to the onboarding macro-state. Each user has one snapshot (path,
//! checklist, current step) persisted through an [`OnboardingStore`] after
//! every mutation. Mutations for the same user are serialized.

mod steps;
mod storage;

pub use steps::{branch_step, instantiate, next_step, OnboardingStep, StepId, SEQUENCE};
pub use storage::{InMemoryOnboardingStore, JsonFileOnboardingStore, OnboardingStore};

use crate::error::WorkflowError;
use crate::store::WorkflowStateStore;
use dashmap::DashMap;
use holding_model::{OnboardingPath, UserId, WorkflowState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Completed over total steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgress {
    /// Completed steps
    pub completed: usize,
    /// Steps in the checklist
    pub total: usize,
}

impl StepProgress {
    /// Rounded percentage
    #[must_use]
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation)]
        let pct = ((self.completed * 100 + self.total / 2) / self.total) as u8;
        pct.min(100)
    }
}

/// A user's onboarding state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSnapshot {
    /// Chosen path
    pub path: OnboardingPath,
    /// Active step
    pub current: StepId,
    /// Checklist in sequence order
    pub steps: Vec<OnboardingStep>,
}

impl Default for OnboardingSnapshot {
    fn default() -> Self {
        Self::fresh()
    }
}

impl OnboardingSnapshot {
    /// No path chosen, nothing completed
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            path: OnboardingPath::Unset,
            current: StepId::Selection,
            steps: instantiate(),
        }
    }

    /// Step entry by id
    #[must_use]
    pub fn step(&self, id: StepId) -> Option<&OnboardingStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// True if `id` is marked completed
    #[must_use]
    pub fn is_completed(&self, id: StepId) -> bool {
        self.step(id).is_some_and(|s| s.completed)
    }

    /// Completed over total, across the whole checklist
    #[must_use]
    pub fn progress(&self) -> StepProgress {
        StepProgress {
            completed: self.steps.iter().filter(|s| s.completed).count(),
            total: self.steps.len(),
        }
    }

    /// True once every step on the chosen path is completed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.path.is_set()
            && self
                .steps
                .iter()
                .filter(|s| s.id.is_on_path(self.path))
                .all(|s| s.completed)
    }

    /// Commit the onboarding path
    ///
    /// Re-committing the same path is a no-op.
    ///
    /// # Errors
    /// - `WorkflowError::OnboardingPathUnset` if `path` is `Unset`
    /// - `WorkflowError::OnboardingPathAlreadySet` if a different path was committed
    pub fn set_path(&mut self, path: OnboardingPath) -> Result<(), WorkflowError> {
        if !path.is_set() {
            return Err(WorkflowError::OnboardingPathUnset);
        }
        if self.path.is_set() {
            return if self.path == path {
                Ok(())
            } else {
                Err(WorkflowError::OnboardingPathAlreadySet(self.path))
            };
        }

        self.steps = instantiate();
        self.path = path;
        self.mark_completed(StepId::Selection);
        self.current = next_step(path, StepId::Selection).unwrap_or(StepId::Selection);
        Ok(())
    }

    /// Mark `step` completed and advance along the path's table
    ///
    /// # Errors
    /// - `WorkflowError::OnboardingPathUnset` before a path is chosen
    /// - `WorkflowError::StepNotOnPath` for the other path's branch step
    pub fn complete_step(&mut self, step: StepId) -> Result<(), WorkflowError> {
        self.require_on_path(step)?;
        self.mark_completed(step);
        if let Some(next) = next_step(self.path, step) {
            self.current = next;
        }
        Ok(())
    }

    /// Jump to `step`
    ///
    /// Allowed when every earlier step on the chosen path is completed. The
    /// other path's branch step is not part of the walk and never blocks.
    ///
    /// # Errors
    /// - `WorkflowError::StepNotOnPath` for a step the path does not walk
    /// - `WorkflowError::StepLocked` listing the incomplete predecessors
    pub fn move_to_step(&mut self, step: StepId) -> Result<(), WorkflowError> {
        if !step.is_on_path(self.path) {
            return Err(WorkflowError::StepNotOnPath { step, path: self.path });
        }

        let missing: Vec<StepId> = SEQUENCE[..step.position()]
            .iter()
            .copied()
            .filter(|s| s.is_on_path(self.path) && !self.is_completed(*s))
            .collect();
        if !missing.is_empty() {
            return Err(WorkflowError::StepLocked { step, missing });
        }

        self.current = step;
        Ok(())
    }

    fn require_on_path(&self, step: StepId) -> Result<(), WorkflowError> {
        if !self.path.is_set() {
            return Err(WorkflowError::OnboardingPathUnset);
        }
        if !step.is_on_path(self.path) {
            return Err(WorkflowError::StepNotOnPath { step, path: self.path });
        }
        Ok(())
    }

    fn mark_completed(&mut self, id: StepId) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.id == id) {
            step.completed = true;
        }
    }
}

/// Tracks onboarding sub-steps per user over a durable store
pub struct OnboardingStepTracker {
    store: Arc<dyn OnboardingStore>,
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for OnboardingStepTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingStepTracker")
            .field("active_users", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl OnboardingStepTracker {
    /// Create tracker over a snapshot store
    #[must_use]
    pub fn new(store: Arc<dyn OnboardingStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Current snapshot, fresh if the user never started
    ///
    /// # Errors
    /// `WorkflowError::OnboardingStorage` if the store cannot be read
    pub async fn snapshot(&self, user: &UserId) -> Result<OnboardingSnapshot, WorkflowError> {
        Ok(self.store.load(user).await?.unwrap_or_default())
    }

    /// Chosen path
    ///
    /// # Errors
    /// `WorkflowError::OnboardingStorage` if the store cannot be read
    pub async fn path(&self, user: &UserId) -> Result<OnboardingPath, WorkflowError> {
        Ok(self.snapshot(user).await?.path)
    }

    /// Completed over total steps
    ///
    /// # Errors
    /// `WorkflowError::OnboardingStorage` if the store cannot be read
    pub async fn progress(&self, user: &UserId) -> Result<StepProgress, WorkflowError> {
        Ok(self.snapshot(user).await?.progress())
    }

    /// Commit the onboarding path and instantiate its checklist
    ///
    /// # Errors
    /// See [`OnboardingSnapshot::set_path`]; storage failures as `OnboardingStorage`
    pub async fn set_path(&self, user: &UserId, path: OnboardingPath) -> Result<OnboardingSnapshot, WorkflowError> {
        let snapshot = self.update(user, |s| s.set_path(path)).await?;
        tracing::info!(user = %user, path = %path, current = %snapshot.current, "onboarding path set");
        Ok(snapshot)
    }

    /// Mark a step completed and advance
    ///
    /// # Errors
    /// See [`OnboardingSnapshot::complete_step`]; storage failures as `OnboardingStorage`
    pub async fn complete_step(&self, user: &UserId, step: StepId) -> Result<OnboardingSnapshot, WorkflowError> {
        let snapshot = self.update(user, |s| s.complete_step(step)).await?;
        tracing::debug!(
            user = %user,
            step = %step,
            current = %snapshot.current,
            progress = snapshot.progress().percent(),
            "onboarding step completed"
        );
        Ok(snapshot)
    }

    /// Jump to a step whose predecessors are completed
    ///
    /// # Errors
    /// See [`OnboardingSnapshot::move_to_step`]; storage failures as `OnboardingStorage`
    pub async fn move_to_step(&self, user: &UserId, step: StepId) -> Result<OnboardingSnapshot, WorkflowError> {
        self.update(user, |s| s.move_to_step(step)).await
    }

    /// Choose a path: transition the lifecycle state, then commit the path
    ///
    /// The lifecycle write comes first; if it fails the checklist is untouched.
    ///
    /// # Errors
    /// Any error from [`WorkflowStateStore::transition`] or [`Self::set_path`]
    pub async fn choose_path(
        &self,
        workflow: &WorkflowStateStore,
        user: &UserId,
        path: OnboardingPath,
    ) -> Result<OnboardingSnapshot, WorkflowError> {
        let target = path.workflow_state().ok_or(WorkflowError::OnboardingPathUnset)?;
        workflow.transition(user, target).await?;
        self.set_path(user, path).await
    }

    /// Retire the checklist once the holding is opened
    ///
    /// Returns `true` if the snapshot was cleared.
    ///
    /// # Errors
    /// `WorkflowError::OnboardingStorage` if the store cannot be cleared
    pub async fn retire_if_opened(&self, workflow: &WorkflowStateStore, user: &UserId) -> Result<bool, WorkflowError> {
        if workflow.get_state(user).await != WorkflowState::HoldingOpened {
            return Ok(false);
        }
        self.reset(user).await?;
        Ok(true)
    }

    /// Clear the user's onboarding state
    ///
    /// # Errors
    /// `WorkflowError::OnboardingStorage` if the store cannot be cleared
    pub async fn reset(&self, user: &UserId) -> Result<(), WorkflowError> {
        let lock = self.lock_for(user);
        let _guard = lock.lock().await;
        self.store.clear(user).await?;
        tracing::info!(user = %user, "onboarding state retired");
        Ok(())
    }

    async fn update<F>(&self, user: &UserId, mutate: F) -> Result<OnboardingSnapshot, WorkflowError>
    where
        F: FnOnce(&mut OnboardingSnapshot) -> Result<(), WorkflowError>,
    {
        let lock = self.lock_for(user);
        let _guard = lock.lock().await;

        let mut snapshot = self.snapshot(user).await?;
        mutate(&mut snapshot)?;
        self.store.save(user, &snapshot).await?;
        Ok(snapshot)
    }

    fn lock_for(&self, user: &UserId) -> Arc<Mutex<()>> {
        self.locks.entry(user.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::InMemoryProfileStore;

    fn tracker() -> OnboardingStepTracker {
        OnboardingStepTracker::new(Arc::new(InMemoryOnboardingStore::new()))
    }

    #[test]
    fn set_path_completes_selection() {
        let mut snapshot = OnboardingSnapshot::fresh();
        snapshot.set_path(OnboardingPath::Human).unwrap();

        assert_eq!(snapshot.path, OnboardingPath::Human);
        assert!(snapshot.is_completed(StepId::Selection));
        assert_eq!(snapshot.current, StepId::Schedule);
        assert_eq!(snapshot.progress(), StepProgress { completed: 1, total: 5 });
    }

    #[test]
    fn path_is_committed_once() {
        let mut snapshot = OnboardingSnapshot::fresh();
        snapshot.set_path(OnboardingPath::Ai).unwrap();
        snapshot.set_path(OnboardingPath::Ai).unwrap();

        let err = snapshot.set_path(OnboardingPath::Human).unwrap_err();
        assert!(matches!(err, WorkflowError::OnboardingPathAlreadySet(OnboardingPath::Ai)));
        assert!(matches!(
            OnboardingSnapshot::fresh().set_path(OnboardingPath::Unset),
            Err(WorkflowError::OnboardingPathUnset)
        ));
    }

    #[test]
    fn ai_chat_completion_moves_to_documents() {
        let mut snapshot = OnboardingSnapshot::fresh();
        snapshot.set_path(OnboardingPath::Ai).unwrap();
        snapshot.complete_step(StepId::Chat).unwrap();

        assert_eq!(snapshot.current, StepId::Documents);
        assert_eq!(snapshot.progress(), StepProgress { completed: 2, total: 5 });
        assert_eq!(snapshot.progress().percent(), 40);
    }

    #[test]
    fn steps_require_a_path() {
        let mut snapshot = OnboardingSnapshot::fresh();
        assert!(matches!(
            snapshot.complete_step(StepId::Documents),
            Err(WorkflowError::OnboardingPathUnset)
        ));
    }

    #[test]
    fn other_branch_cannot_be_completed() {
        let mut snapshot = OnboardingSnapshot::fresh();
        snapshot.set_path(OnboardingPath::Ai).unwrap();
        assert!(matches!(
            snapshot.complete_step(StepId::Schedule),
            Err(WorkflowError::StepNotOnPath { step: StepId::Schedule, .. })
        ));
    }

    #[test]
    fn move_to_step_checks_predecessors_on_path() {
        let mut snapshot = OnboardingSnapshot::fresh();
        snapshot.set_path(OnboardingPath::Human).unwrap();

        let err = snapshot.move_to_step(StepId::Documents).unwrap_err();
        match err {
            WorkflowError::StepLocked { step, missing } => {
                assert_eq!(step, StepId::Documents);
                assert_eq!(missing, vec![StepId::Schedule]);
            }
            other => panic!("unexpected error: {other}"),
        }

        snapshot.complete_step(StepId::Schedule).unwrap();
        // chat is the AI branch and does not block the human path
        snapshot.move_to_step(StepId::Selection).unwrap();
        snapshot.move_to_step(StepId::Documents).unwrap();
        assert_eq!(snapshot.current, StepId::Documents);
    }

    #[test]
    fn finishing_the_path() {
        let mut snapshot = OnboardingSnapshot::fresh();
        snapshot.set_path(OnboardingPath::Ai).unwrap();
        for step in [StepId::Chat, StepId::Documents, StepId::Review] {
            assert!(!snapshot.is_finished());
            snapshot.complete_step(step).unwrap();
        }
        assert!(snapshot.is_finished());
        assert_eq!(snapshot.current, StepId::Review);
        assert_eq!(snapshot.progress().percent(), 80);
    }

    #[tokio::test]
    async fn tracker_persists_mutations() {
        let store = Arc::new(InMemoryOnboardingStore::new());
        let tracker = OnboardingStepTracker::new(store.clone());
        let user = UserId::from("u1");

        tracker.set_path(&user, OnboardingPath::Ai).await.unwrap();
        tracker.complete_step(&user, StepId::Chat).await.unwrap();

        let reopened = OnboardingStepTracker::new(store);
        let snapshot = reopened.snapshot(&user).await.unwrap();
        assert_eq!(snapshot.current, StepId::Documents);
        assert_eq!(reopened.path(&user).await.unwrap(), OnboardingPath::Ai);
    }

    #[tokio::test]
    async fn failed_mutation_is_not_saved() {
        let tracker = tracker();
        let user = UserId::from("u1");

        assert!(tracker.complete_step(&user, StepId::Chat).await.is_err());
        assert_eq!(tracker.snapshot(&user).await.unwrap(), OnboardingSnapshot::fresh());
    }

    #[tokio::test]
    async fn choose_path_moves_lifecycle_state() {
        let workflow = WorkflowStateStore::new(Arc::new(InMemoryProfileStore::new()));
        let tracker = tracker();
        let user = UserId::from("u1");

        let snapshot = tracker.choose_path(&workflow, &user, OnboardingPath::Human).await.unwrap();
        assert_eq!(snapshot.current, StepId::Schedule);
        assert_eq!(workflow.get_state(&user).await, WorkflowState::OnboardingHuman);
    }

    #[tokio::test]
    async fn checklist_retired_once_opened() {
        let workflow = WorkflowStateStore::new(Arc::new(InMemoryProfileStore::new()));
        let tracker = tracker();
        let user = UserId::from("u1");

        tracker.choose_path(&workflow, &user, OnboardingPath::Ai).await.unwrap();
        assert!(!tracker.retire_if_opened(&workflow, &user).await.unwrap());

        workflow.transition(&user, WorkflowState::HoldingSetup).await.unwrap();
        workflow.transition(&user, WorkflowState::HoldingOpened).await.unwrap();
        assert!(tracker.retire_if_opened(&workflow, &user).await.unwrap());
        assert_eq!(tracker.path(&user).await.unwrap(), OnboardingPath::Unset);
    }
}
