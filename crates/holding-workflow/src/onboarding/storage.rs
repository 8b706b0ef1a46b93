//! Durable onboarding snapshots
//!
//! Snapshots are keyed per user and never expire. The JSON-file adapter
//! writes through a temporary file and renames it into place so a crash
//! mid-write leaves the previous snapshot intact.

use super::OnboardingSnapshot;
use crate::error::WorkflowError;
use async_trait::async_trait;
use dashmap::DashMap;
use holding_model::UserId;
use std::path::{Path, PathBuf};

/// Per-user snapshot persistence
#[async_trait]
pub trait OnboardingStore: Send + Sync {
    /// Load a snapshot; `Ok(None)` if the user never started onboarding
    async fn load(&self, user: &UserId) -> Result<Option<OnboardingSnapshot>, WorkflowError>;

    /// Replace the user's snapshot
    async fn save(&self, user: &UserId, snapshot: &OnboardingSnapshot) -> Result<(), WorkflowError>;

    /// Remove the user's snapshot
    async fn clear(&self, user: &UserId) -> Result<(), WorkflowError>;
}

/// Snapshots held in memory (tests, single-process hosts)
#[derive(Debug, Default)]
pub struct InMemoryOnboardingStore {
    snapshots: DashMap<UserId, OnboardingSnapshot>,
}

impl InMemoryOnboardingStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OnboardingStore for InMemoryOnboardingStore {
    async fn load(&self, user: &UserId) -> Result<Option<OnboardingSnapshot>, WorkflowError> {
        Ok(self.snapshots.get(user).map(|s| s.clone()))
    }

    async fn save(&self, user: &UserId, snapshot: &OnboardingSnapshot) -> Result<(), WorkflowError> {
        self.snapshots.insert(user.clone(), snapshot.clone());
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<(), WorkflowError> {
        self.snapshots.remove(user);
        Ok(())
    }
}

/// One JSON file per user under a directory
#[derive(Debug, Clone)]
pub struct JsonFileOnboardingStore {
    root: PathBuf,
}

impl JsonFileOnboardingStore {
    /// Store snapshots under `root`, creating it if needed
    ///
    /// # Errors
    /// `WorkflowError::OnboardingStorage` if the directory cannot be created
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory holding the snapshots
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercase hex of the id bytes; distinct ids map to distinct files
    /// on case-insensitive file systems too
    fn path_for(&self, user: &UserId) -> PathBuf {
        self.root.join(format!("{}.json", hex::encode(user.as_str())))
    }
}

#[async_trait]
impl OnboardingStore for JsonFileOnboardingStore {
    async fn load(&self, user: &UserId) -> Result<Option<OnboardingSnapshot>, WorkflowError> {
        match tokio::fs::read(self.path_for(user)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, user: &UserId, snapshot: &OnboardingSnapshot) -> Result<(), WorkflowError> {
        let path = self.path_for(user);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<(), WorkflowError> {
        match tokio::fs::remove_file(self.path_for(user)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holding_model::OnboardingPath;

    #[tokio::test]
    async fn json_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileOnboardingStore::open(dir.path().join("onboarding")).await.unwrap();
        let user = UserId::from("user@example.com");

        assert!(store.load(&user).await.unwrap().is_none());

        let snapshot = OnboardingSnapshot::fresh();
        store.save(&user, &snapshot).await.unwrap();
        assert_eq!(store.load(&user).await.unwrap(), Some(snapshot));

        store.clear(&user).await.unwrap();
        assert!(store.load(&user).await.unwrap().is_none());
        store.clear(&user).await.unwrap();
    }

    #[tokio::test]
    async fn user_ids_are_sanitized_into_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileOnboardingStore::open(dir.path()).await.unwrap();
        let path = store.path_for(&UserId::from("../escape/attempt"));
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(store.path_for(&UserId::from("Ab")).file_name().unwrap(), "4162.json");
    }

    #[tokio::test]
    async fn similar_user_ids_do_not_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileOnboardingStore::open(dir.path()).await.unwrap();
        let ana = UserId::from("ana@x.com");
        let other = UserId::from("ana_x_com");
        assert_ne!(store.path_for(&ana), store.path_for(&other));
        assert_ne!(store.path_for(&UserId::from("A")), store.path_for(&UserId::from("a")));

        let mut snapshot = OnboardingSnapshot::fresh();
        snapshot.path = OnboardingPath::Ai;
        store.save(&ana, &snapshot).await.unwrap();

        assert!(store.load(&other).await.unwrap().is_none());
        assert_eq!(store.load(&ana).await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileOnboardingStore::open(dir.path()).await.unwrap();
        let user = UserId::from("u1");
        tokio::fs::write(store.path_for(&user), b"{not json").await.unwrap();

        let err = store.load(&user).await.unwrap_err();
        assert!(matches!(err, WorkflowError::OnboardingStorage(_)));
    }
}
