//! Profile store port
//!
//! The authoritative copy of a user's role and lifecycle state lives in a
//! remote profile record. This module defines the boundary and an in-memory
//! adapter.

use async_trait::async_trait;
use dashmap::DashMap;
use holding_model::{UserId, UserRole, WorkflowState};
use serde::{Deserialize, Serialize};

/// Profile fields this core reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Profile role
    pub role: UserRole,
    /// Lifecycle state
    pub workflow_state: WorkflowState,
}

/// Field-level profile update; `None` leaves the field untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New lifecycle state
    pub workflow_state: Option<WorkflowState>,
    /// New role
    pub role: Option<UserRole>,
}

impl ProfileUpdate {
    /// Update only the lifecycle state
    #[inline]
    #[must_use]
    pub fn state(state: WorkflowState) -> Self {
        Self {
            workflow_state: Some(state),
            role: None,
        }
    }

    /// Apply onto an existing record
    #[must_use]
    pub fn apply(self, mut record: ProfileRecord) -> ProfileRecord {
        if let Some(state) = self.workflow_state {
            record.workflow_state = state;
        }
        if let Some(role) = self.role {
            record.role = role;
        }
        record
    }
}

/// Profile backend failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileStoreError {
    /// Backend unreachable or timed out
    #[error("profile store unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the write
    #[error("profile write rejected: {0}")]
    Rejected(String),
}

/// Remote profile record access
///
/// `write_profile` upserts: writing to a user without a record creates one
/// with default values for the fields the update leaves out.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read a profile; `Ok(None)` means the user has no record yet
    async fn read_profile(&self, user: &UserId) -> Result<Option<ProfileRecord>, ProfileStoreError>;

    /// Write the fields set in `update`
    async fn write_profile(&self, user: &UserId, update: ProfileUpdate) -> Result<(), ProfileStoreError>;
}

/// Profile store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    records: DashMap<UserId, ProfileRecord>,
}

impl InMemoryProfileStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record
    pub fn insert(&self, user: UserId, record: ProfileRecord) {
        self.records.insert(user, record);
    }

    /// Current record, bypassing any cache
    #[must_use]
    pub fn get(&self, user: &UserId) -> Option<ProfileRecord> {
        self.records.get(user).map(|r| *r)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records exist
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn read_profile(&self, user: &UserId) -> Result<Option<ProfileRecord>, ProfileStoreError> {
        Ok(self.get(user))
    }

    async fn write_profile(&self, user: &UserId, update: ProfileUpdate) -> Result<(), ProfileStoreError> {
        self.records
            .entry(user.clone())
            .and_modify(|record| *record = update.apply(*record))
            .or_insert_with(|| update.apply(ProfileRecord::default()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_missing_profile() {
        let store = InMemoryProfileStore::new();
        let user = UserId::from("u1");

        assert_eq!(store.read_profile(&user).await.unwrap(), None);

        store
            .write_profile(&user, ProfileUpdate::state(WorkflowState::OnboardingAi))
            .await
            .unwrap();

        let record = store.read_profile(&user).await.unwrap().unwrap();
        assert_eq!(record.workflow_state, WorkflowState::OnboardingAi);
        assert_eq!(record.role, UserRole::Client);
    }

    #[tokio::test]
    async fn write_is_field_level() {
        let store = InMemoryProfileStore::new();
        let user = UserId::from("u1");
        store.insert(
            user.clone(),
            ProfileRecord {
                role: UserRole::Consultant,
                workflow_state: WorkflowState::FirstAccess,
            },
        );

        store
            .write_profile(&user, ProfileUpdate::state(WorkflowState::OnboardingHuman))
            .await
            .unwrap();

        let record = store.get(&user).unwrap();
        assert_eq!(record.role, UserRole::Consultant);
        assert_eq!(record.workflow_state, WorkflowState::OnboardingHuman);
    }
}
