//! In-memory ledger adapters
//!
//! Used by tests and single-process hosts. The roadmap ledger enforces the
//! `(user, document_key)` unique constraint with all-or-nothing batches, as a
//! transactional database would.

use crate::error::LedgerError;
use crate::ports::{BlobStore, RecommendationSource, RoadmapLedger, UploadLedger};
use crate::records::{DocumentRoadmapEntry, ObjectMetadata, ObjectRef, RoadmapPatch, UploadedDocumentRecord};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use holding_model::{DocumentKey, DocumentRecommendation, SessionId, UserId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Recommendation catalogs keyed by session
#[derive(Debug, Default)]
pub struct InMemoryRecommendations {
    sessions: DashMap<SessionId, Vec<DocumentRecommendation>>,
}

impl InMemoryRecommendations {
    /// Create empty source
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a catalog for a session
    pub fn publish(&self, session: SessionId, recommendations: Vec<DocumentRecommendation>) {
        self.sessions.insert(session, recommendations);
    }
}

#[async_trait]
impl RecommendationSource for InMemoryRecommendations {
    async fn list_recommendations(&self, session: &SessionId) -> Result<Vec<DocumentRecommendation>, LedgerError> {
        Ok(self.sessions.get(session).map(|r| r.clone()).unwrap_or_default())
    }
}

/// Roadmap rows keyed by `(user, document_key)`
#[derive(Debug, Default)]
pub struct InMemoryRoadmapLedger {
    rows: Mutex<HashMap<(UserId, DocumentKey), DocumentRoadmapEntry>>,
}

impl InMemoryRoadmapLedger {
    /// Create empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows for a user, sorted by key
    #[must_use]
    pub fn entries_for(&self, user: &UserId) -> Vec<DocumentRoadmapEntry> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .values()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.document_key.cmp(&b.document_key));
        rows
    }

    /// Total rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// True if no rows exist
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl RoadmapLedger for InMemoryRoadmapLedger {
    async fn list_entries(&self, user: &UserId, keys: &[DocumentKey]) -> Result<Vec<DocumentRoadmapEntry>, LedgerError> {
        let rows = self.rows.lock();
        Ok(keys
            .iter()
            .filter_map(|key| rows.get(&(user.clone(), key.clone())).cloned())
            .collect())
    }

    async fn insert_entries(&self, entries: Vec<DocumentRoadmapEntry>) -> Result<(), LedgerError> {
        let mut rows = self.rows.lock();

        let mut batch = HashSet::with_capacity(entries.len());
        for entry in &entries {
            let id = (entry.user_id.clone(), entry.document_key.clone());
            if rows.contains_key(&id) || !batch.insert(id) {
                return Err(LedgerError::ConstraintViolation(format!(
                    "roadmap entry ({}, {}) already exists",
                    entry.user_id, entry.document_key
                )));
            }
        }

        for entry in entries {
            rows.insert((entry.user_id.clone(), entry.document_key.clone()), entry);
        }
        Ok(())
    }

    async fn update_entry(&self, user: &UserId, key: &DocumentKey, patch: RoadmapPatch) -> Result<(), LedgerError> {
        let mut rows = self.rows.lock();
        match rows.get_mut(&(user.clone(), key.clone())) {
            Some(entry) => {
                patch.apply(entry, Utc::now());
                Ok(())
            }
            None => Err(LedgerError::NotFound(format!("roadmap entry ({user}, {key})"))),
        }
    }
}

/// Append-only upload records
#[derive(Debug, Default)]
pub struct InMemoryUploadLedger {
    records: Mutex<Vec<UploadedDocumentRecord>>,
}

impl InMemoryUploadLedger {
    /// Create empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records for a user, in insertion order
    #[must_use]
    pub fn records_for(&self, user: &UserId) -> Vec<UploadedDocumentRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| &r.user_id == user)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UploadLedger for InMemoryUploadLedger {
    async fn list_records(&self, user: &UserId, keys: &[DocumentKey]) -> Result<Vec<UploadedDocumentRecord>, LedgerError> {
        let wanted: HashSet<&DocumentKey> = keys.iter().collect();
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| &r.user_id == user && wanted.contains(&r.document_key))
            .cloned()
            .collect())
    }

    async fn insert_record(&self, record: UploadedDocumentRecord) -> Result<(), LedgerError> {
        self.records.lock().push(record);
        Ok(())
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<UploadedDocumentRecord>, LedgerError> {
        Ok(self.records.lock().iter().find(|r| r.id == id).cloned())
    }
}

/// Object bytes keyed by `bucket/object_key`
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: DashMap<ObjectRef, Vec<u8>>,
}

impl InMemoryBlobStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes
    #[must_use]
    pub fn get(&self, object: &ObjectRef) -> Option<Vec<u8>> {
        self.objects.get(object).map(|b| b.clone())
    }

    /// Stored object count
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(&self, bytes: Vec<u8>, metadata: ObjectMetadata) -> Result<ObjectRef, LedgerError> {
        let object = ObjectRef {
            bucket: metadata.bucket,
            object_key: metadata.object_key,
        };
        self.objects.insert(object.clone(), bytes);
        Ok(object)
    }

    async fn get_object(&self, object: &ObjectRef) -> Result<Vec<u8>, LedgerError> {
        self.get(object)
            .ok_or_else(|| LedgerError::NotFound(format!("{}/{}", object.bucket, object.object_key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, key: &str) -> DocumentRoadmapEntry {
        let rec = DocumentRecommendation::builder(format!("rec_{key}"), key, "pessoal", key).build();
        DocumentRoadmapEntry::from_recommendation(&UserId::from(user), &rec, Utc::now())
    }

    #[tokio::test]
    async fn roadmap_batches_are_all_or_nothing() {
        let ledger = InMemoryRoadmapLedger::new();
        ledger.insert_entries(vec![entry("u1", "a")]).await.unwrap();

        let err = ledger
            .insert_entries(vec![entry("u1", "b"), entry("u1", "a")])
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_keys_within_a_batch_violate() {
        let ledger = InMemoryRoadmapLedger::new();
        let err = ledger
            .insert_entries(vec![entry("u1", "a"), entry("u1", "a")])
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn same_key_for_different_users_is_fine() {
        let ledger = InMemoryRoadmapLedger::new();
        ledger
            .insert_entries(vec![entry("u1", "a"), entry("u2", "a")])
            .await
            .unwrap();
        assert_eq!(ledger.entries_for(&UserId::from("u2")).len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let ledger = InMemoryRoadmapLedger::new();
        let err = ledger
            .update_entry(&UserId::from("u1"), &DocumentKey::from("a"), RoadmapPatch::sent())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = InMemoryBlobStore::new();
        let object = store
            .put_object(
                vec![7],
                ObjectMetadata {
                    bucket: "documents".into(),
                    object_key: "u1/a".into(),
                    content_type: "application/pdf".into(),
                    size_bytes: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get_object(&object).await.unwrap(), vec![7]);

        let elsewhere = ObjectRef {
            object_key: "u1/b".into(),
            ..object
        };
        let err = store.get_object(&elsewhere).await.unwrap_err();
        assert_eq!(err, LedgerError::NotFound("documents/u1/b".into()));
    }
}
