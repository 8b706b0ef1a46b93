//! Port interfaces for the document ledgers
//!
//! These traits are the boundary between reconciliation logic and whatever
//! storage actually holds the rows and the file bytes.

use crate::error::LedgerError;
use crate::records::{DocumentRoadmapEntry, ObjectMetadata, ObjectRef, RoadmapPatch, UploadedDocumentRecord};
use async_trait::async_trait;
use holding_model::{DocumentKey, DocumentRecommendation, SessionId, UserId};
use uuid::Uuid;

/// Read-only source of recommendation catalogs
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Recommendations issued for a session
    async fn list_recommendations(&self, session: &SessionId) -> Result<Vec<DocumentRecommendation>, LedgerError>;
}

/// Roadmap ledger: one row per `(user, document_key)`
#[async_trait]
pub trait RoadmapLedger: Send + Sync {
    /// Rows for `user` whose key is in `keys`
    async fn list_entries(&self, user: &UserId, keys: &[DocumentKey]) -> Result<Vec<DocumentRoadmapEntry>, LedgerError>;

    /// Insert a batch; the whole batch fails with `ConstraintViolation` if any
    /// row already exists
    async fn insert_entries(&self, entries: Vec<DocumentRoadmapEntry>) -> Result<(), LedgerError>;

    /// Field-level update of one row
    async fn update_entry(&self, user: &UserId, key: &DocumentKey, patch: RoadmapPatch) -> Result<(), LedgerError>;
}

/// Uploaded-files ledger, append-only
#[async_trait]
pub trait UploadLedger: Send + Sync {
    /// Records for `user` whose key is in `keys`
    async fn list_records(&self, user: &UserId, keys: &[DocumentKey]) -> Result<Vec<UploadedDocumentRecord>, LedgerError>;

    /// Append a record
    async fn insert_record(&self, record: UploadedDocumentRecord) -> Result<(), LedgerError>;

    /// Record by row id, whoever owns it
    async fn get_record(&self, id: Uuid) -> Result<Option<UploadedDocumentRecord>, LedgerError>;
}

/// Object store holding the file bytes
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `metadata.bucket` / `metadata.object_key`
    async fn put_object(&self, bytes: Vec<u8>, metadata: ObjectMetadata) -> Result<ObjectRef, LedgerError>;

    /// Stored bytes; `NotFound` if nothing is stored at `object`
    async fn get_object(&self, object: &ObjectRef) -> Result<Vec<u8>, LedgerError>;
}
