//! Lifecycle state store
//!
//! Owns the session cache of each user's `WorkflowState` and role. Reads fall
//! through to the profile store on a miss. Transitions are two-phase:
//! [`WorkflowStateStore::attempt`] writes the remote record and returns a
//! receipt, [`WorkflowStateStore::commit`] applies the receipt to the cache.
//! A failed write therefore never reaches the cache.

use crate::error::WorkflowError;
use crate::profile::{ProfileRecord, ProfileStore, ProfileUpdate};
use crate::transitions::validate_transition;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use holding_model::{UserId, UserRole, WorkflowConfig, WorkflowState};
use std::sync::Arc;

/// Proof that a transition was written to the profile store
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a receipt does nothing until it is committed"]
pub struct TransitionReceipt {
    user: UserId,
    from: Option<WorkflowState>,
    to: WorkflowState,
}

impl TransitionReceipt {
    /// User whose state moved
    #[inline]
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// State before the write, if it was known
    #[inline]
    #[must_use]
    pub fn from(&self) -> Option<WorkflowState> {
        self.from
    }

    /// State written
    #[inline]
    #[must_use]
    pub fn to(&self) -> WorkflowState {
        self.to
    }
}

/// Authoritative lifecycle state per user, with a session cache
pub struct WorkflowStateStore {
    profiles: Arc<dyn ProfileStore>,
    cache: DashMap<UserId, ProfileRecord>,
    /// Bumped on every commit; a fetch that spans a bump is not cached
    epochs: DashMap<UserId, u64>,
    config: WorkflowConfig,
}

impl std::fmt::Debug for WorkflowStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStateStore")
            .field("cached_users", &self.cache.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkflowStateStore {
    /// Create store over a profile backend with default configuration
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self::with_config(profiles, WorkflowConfig::default())
    }

    /// Create store with explicit configuration
    #[must_use]
    pub fn with_config(profiles: Arc<dyn ProfileStore>, config: WorkflowConfig) -> Self {
        Self {
            profiles,
            cache: DashMap::new(),
            epochs: DashMap::new(),
            config,
        }
    }

    /// Current state, never failing
    ///
    /// A fetch failure yields `FirstAccess` so navigation keeps working. The
    /// substituted value is not cached, so the next call retries the backend.
    pub async fn get_state(&self, user: &UserId) -> WorkflowState {
        match self.try_get_state(user).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(user = %user, error = %err, "profile fetch failed; substituting first_access");
                WorkflowState::default()
            }
        }
    }

    /// Current state, surfacing backend failures
    ///
    /// # Errors
    /// `WorkflowError::ProfileFetchFailed` if the profile could not be read
    pub async fn try_get_state(&self, user: &UserId) -> Result<WorkflowState, WorkflowError> {
        self.load(user).await.map(|record| record.workflow_state)
    }

    /// Profile role, falling back to `Client` on fetch failure
    pub async fn get_role(&self, user: &UserId) -> UserRole {
        match self.load(user).await {
            Ok(record) => record.role,
            Err(err) => {
                tracing::warn!(user = %user, error = %err, "profile fetch failed; substituting client role");
                UserRole::default()
            }
        }
    }

    /// Cached state without touching the backend
    #[must_use]
    pub fn cached_state(&self, user: &UserId) -> Option<WorkflowState> {
        self.cache.get(user).map(|record| record.workflow_state)
    }

    /// Drop the cached copy so the next read refetches
    pub fn invalidate(&self, user: &UserId) {
        self.cache.remove(user);
    }

    /// Move `user` to `target`: write remotely, then update the cache
    ///
    /// Moving to the current state is a no-op.
    ///
    /// # Errors
    /// - `WorkflowError::ProfileFetchFailed` if the current state is needed and unreadable
    /// - `WorkflowError::IllegalTransition` if the edge is not in the lifecycle graph
    /// - `WorkflowError::PersistenceFailed` if the write did not commit
    pub async fn transition(&self, user: &UserId, target: WorkflowState) -> Result<(), WorkflowError> {
        if let Some(receipt) = self.attempt(user, target).await? {
            self.commit(receipt);
        }
        Ok(())
    }

    /// First phase: validate and write the profile record
    ///
    /// Returns `None` when `target` equals the current state.
    ///
    /// # Errors
    /// Same as [`WorkflowStateStore::transition`]
    pub async fn attempt(
        &self,
        user: &UserId,
        target: WorkflowState,
    ) -> Result<Option<TransitionReceipt>, WorkflowError> {
        let from = if self.config.enforce_transition_graph {
            let from = self.try_get_state(user).await?;
            if from == target {
                tracing::debug!(user = %user, state = %target, "transition to current state skipped");
                return Ok(None);
            }
            validate_transition(from, target)?;
            Some(from)
        } else {
            self.cached_state(user)
        };

        self.write_state(user, target).await?;
        Ok(Some(TransitionReceipt {
            user: user.clone(),
            from,
            to: target,
        }))
    }

    /// Second phase: apply a written transition to the cache
    ///
    /// Users without a cached record are left uncached; their next read
    /// fetches the freshly written value.
    pub fn commit(&self, receipt: TransitionReceipt) {
        *self.epochs.entry(receipt.user.clone()).or_insert(0) += 1;
        if let Some(mut record) = self.cache.get_mut(&receipt.user) {
            record.workflow_state = receipt.to;
        }
        tracing::info!(
            user = %receipt.user,
            from = ?receipt.from,
            to = %receipt.to,
            "workflow state transitioned"
        );
    }

    /// Administrative move that ignores the lifecycle graph
    ///
    /// # Errors
    /// - `WorkflowError::NotPrivileged` unless `actor` is consultant or admin
    /// - `WorkflowError::PersistenceFailed` if the write did not commit
    pub async fn override_state(
        &self,
        user: &UserId,
        target: WorkflowState,
        actor: UserRole,
    ) -> Result<(), WorkflowError> {
        if !actor.is_staff() {
            return Err(WorkflowError::NotPrivileged(actor));
        }
        let from = self.cached_state(user);
        self.write_state(user, target).await?;
        tracing::warn!(user = %user, from = ?from, to = %target, actor = %actor, "workflow state overridden");
        self.commit(TransitionReceipt {
            user: user.clone(),
            from,
            to: target,
        });
        Ok(())
    }

    async fn write_state(&self, user: &UserId, target: WorkflowState) -> Result<(), WorkflowError> {
        self.profiles
            .write_profile(user, ProfileUpdate::state(target))
            .await
            .map_err(|err| {
                tracing::error!(user = %user, to = %target, error = %err, "workflow state write failed");
                WorkflowError::PersistenceFailed {
                    user: user.clone(),
                    reason: err.to_string(),
                }
            })
    }

    fn epoch(&self, user: &UserId) -> u64 {
        self.epochs.get(user).map_or(0, |epoch| *epoch)
    }

    /// Cached record, or a fetch that never replaces a committed value
    async fn load(&self, user: &UserId) -> Result<ProfileRecord, WorkflowError> {
        loop {
            if let Some(record) = self.cache.get(user) {
                return Ok(*record);
            }

            let epoch = self.epoch(user);
            let fetched = self.profiles.read_profile(user).await.map_err(|err| {
                WorkflowError::ProfileFetchFailed {
                    user: user.clone(),
                    reason: err.to_string(),
                }
            })?;

            let record = fetched.unwrap_or_else(|| {
                tracing::info!(user = %user, "no profile record; treating as new user");
                ProfileRecord::default()
            });

            match self.cache.entry(user.clone()) {
                Entry::Occupied(cached) => return Ok(*cached.get()),
                Entry::Vacant(slot) if self.epoch(user) == epoch => return Ok(*slot.insert(record)),
                Entry::Vacant(_) => {
                    tracing::debug!(user = %user, "state committed during fetch; refetching");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{InMemoryProfileStore, ProfileStoreError};
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Profiles {}

        #[async_trait]
        impl ProfileStore for Profiles {
            async fn read_profile(&self, user: &UserId) -> Result<Option<ProfileRecord>, ProfileStoreError>;
            async fn write_profile(&self, user: &UserId, update: ProfileUpdate) -> Result<(), ProfileStoreError>;
        }
    }

    fn record(state: WorkflowState) -> ProfileRecord {
        ProfileRecord {
            role: UserRole::Client,
            workflow_state: state,
        }
    }

    #[tokio::test]
    async fn missing_profile_reads_as_first_access() {
        let store = WorkflowStateStore::new(Arc::new(InMemoryProfileStore::new()));
        let user = UserId::from("new-user");

        assert_eq!(store.get_state(&user).await, WorkflowState::FirstAccess);
        assert_eq!(store.cached_state(&user), Some(WorkflowState::FirstAccess));
    }

    #[tokio::test]
    async fn reads_are_cached() {
        let mut profiles = MockProfiles::new();
        profiles
            .expect_read_profile()
            .times(1)
            .returning(|_| Ok(Some(record(WorkflowState::HoldingSetup))));

        let store = WorkflowStateStore::new(Arc::new(profiles));
        let user = UserId::from("u1");

        assert_eq!(store.get_state(&user).await, WorkflowState::HoldingSetup);
        assert_eq!(store.get_state(&user).await, WorkflowState::HoldingSetup);
    }

    #[tokio::test]
    async fn fetch_failure_substitutes_default_without_caching() {
        let mut profiles = MockProfiles::new();
        profiles
            .expect_read_profile()
            .times(2)
            .returning(|_| Err(ProfileStoreError::Unavailable("timeout".to_string())));

        let store = WorkflowStateStore::new(Arc::new(profiles));
        let user = UserId::from("u1");

        assert_eq!(store.get_state(&user).await, WorkflowState::FirstAccess);
        assert_eq!(store.cached_state(&user), None);

        let err = store.try_get_state(&user).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ProfileFetchFailed { .. }));
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_untouched() {
        let mut profiles = MockProfiles::new();
        profiles
            .expect_read_profile()
            .returning(|_| Ok(Some(record(WorkflowState::HoldingSetup))));
        profiles
            .expect_write_profile()
            .times(1)
            .returning(|_, _| Err(ProfileStoreError::Rejected("constraint".to_string())));

        let store = WorkflowStateStore::new(Arc::new(profiles));
        let user = UserId::from("u1");

        let err = store
            .transition(&user, WorkflowState::HoldingOpened)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PersistenceFailed { .. }));
        assert_eq!(store.get_state(&user).await, WorkflowState::HoldingSetup);
    }

    #[tokio::test]
    async fn successful_transition_updates_cache() {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let store = WorkflowStateStore::new(profiles.clone());
        let user = UserId::from("u1");

        store.transition(&user, WorkflowState::OnboardingAi).await.unwrap();
        assert_eq!(store.cached_state(&user), Some(WorkflowState::OnboardingAi));
        assert_eq!(
            profiles.get(&user).map(|r| r.workflow_state),
            Some(WorkflowState::OnboardingAi)
        );
    }

    #[tokio::test]
    async fn illegal_edge_is_rejected_before_writing() {
        let mut profiles = MockProfiles::new();
        profiles
            .expect_read_profile()
            .returning(|_| Ok(Some(record(WorkflowState::FirstAccess))));
        profiles.expect_write_profile().never();

        let store = WorkflowStateStore::new(Arc::new(profiles));
        let err = store
            .transition(&UserId::from("u1"), WorkflowState::HoldingOpened)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn same_state_transition_does_not_write() {
        let mut profiles = MockProfiles::new();
        profiles
            .expect_read_profile()
            .returning(|_| Ok(Some(record(WorkflowState::OnboardingAi))));
        profiles.expect_write_profile().never();

        let store = WorkflowStateStore::new(Arc::new(profiles));
        store
            .transition(&UserId::from("u1"), WorkflowState::OnboardingAi)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn permissive_store_accepts_any_target() {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let config = WorkflowConfig {
            enforce_transition_graph: false,
        };
        let store = WorkflowStateStore::with_config(profiles.clone(), config);
        let user = UserId::from("u1");

        store.transition(&user, WorkflowState::HoldingOpened).await.unwrap();
        assert_eq!(store.get_state(&user).await, WorkflowState::HoldingOpened);
    }

    #[tokio::test]
    async fn override_requires_staff() {
        let profiles = Arc::new(InMemoryProfileStore::new());
        profiles.insert(UserId::from("u1"), record(WorkflowState::HoldingOpened));
        let store = WorkflowStateStore::new(profiles);
        let user = UserId::from("u1");
        assert_eq!(store.get_state(&user).await, WorkflowState::HoldingOpened);

        let err = store
            .override_state(&user, WorkflowState::HoldingSetup, UserRole::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotPrivileged(UserRole::Client)));

        store
            .override_state(&user, WorkflowState::HoldingSetup, UserRole::Admin)
            .await
            .unwrap();
        assert_eq!(store.get_state(&user).await, WorkflowState::HoldingSetup);
    }

    #[tokio::test]
    async fn two_phase_receipt_reports_edge() {
        let store = WorkflowStateStore::new(Arc::new(InMemoryProfileStore::new()));
        let user = UserId::from("u1");

        let receipt = store
            .attempt(&user, WorkflowState::OnboardingHuman)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.from(), Some(WorkflowState::FirstAccess));
        assert_eq!(receipt.to(), WorkflowState::OnboardingHuman);

        // Written but not yet committed
        assert_eq!(store.cached_state(&user), Some(WorkflowState::FirstAccess));
        store.commit(receipt);
        assert_eq!(store.cached_state(&user), Some(WorkflowState::OnboardingHuman));
    }
}
