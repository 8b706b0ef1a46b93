//! Ledger rows and upload metadata

use chrono::{DateTime, Utc};
use holding_model::{DocumentCategory, DocumentKey, DocumentRecommendation, RecommendationId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roadmap row: `document_key` was recommended to `user_id`
///
/// At most one row exists per `(user_id, document_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRoadmapEntry {
    /// Owner
    pub user_id: UserId,
    /// Document key
    pub document_key: DocumentKey,
    /// Recommendation that produced the row
    pub recommendation_id: RecommendationId,
    /// Display name copied from the recommendation
    pub name: String,
    /// Category copied from the recommendation
    pub category: DocumentCategory,
    /// Priority copied from the recommendation
    pub priority: u8,
    /// Mandatory flag copied from the recommendation
    pub mandatory: bool,
    /// A file was delivered (best effort; may lag the upload ledger)
    pub sent: bool,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last field update
    pub updated_at: DateTime<Utc>,
}

impl DocumentRoadmapEntry {
    /// Unsent row for a recommendation
    #[must_use]
    pub fn from_recommendation(user: &UserId, rec: &DocumentRecommendation, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.clone(),
            document_key: rec.document_key.clone(),
            recommendation_id: rec.recommendation_id.clone(),
            name: rec.name.clone(),
            category: rec.category.clone(),
            priority: rec.priority,
            mandatory: rec.mandatory,
            sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field-level roadmap update; `None` leaves the field as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoadmapPatch {
    /// New `sent` value
    pub sent: Option<bool>,
}

impl RoadmapPatch {
    /// Set `sent = true`
    #[inline]
    #[must_use]
    pub fn sent() -> Self {
        Self { sent: Some(true) }
    }

    /// Apply onto a stored row
    pub fn apply(self, entry: &mut DocumentRoadmapEntry, now: DateTime<Utc>) {
        if let Some(sent) = self.sent {
            entry.sent = sent;
            entry.updated_at = now;
        }
    }
}

/// Upload ledger row; one per successful upload, append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocumentRecord {
    /// Row id
    pub id: Uuid,
    /// Owner
    pub user_id: UserId,
    /// Document key
    pub document_key: DocumentKey,
    /// Recommendation the upload answers
    pub recommendation_id: RecommendationId,
    /// Object-store bucket
    pub bucket: String,
    /// Object key inside the bucket
    pub object_key: String,
    /// Original file name
    pub file_name: String,
    /// MIME type reported by the client
    pub content_type: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update
    pub updated_at: DateTime<Utc>,
}

impl UploadedDocumentRecord {
    /// Where the bytes are stored
    #[must_use]
    pub fn object(&self) -> ObjectRef {
        ObjectRef {
            bucket: self.bucket.clone(),
            object_key: self.object_key.clone(),
        }
    }
}

/// An upload record with its stored bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedDocument {
    /// Ledger row
    pub record: UploadedDocumentRecord,
    /// File bytes
    pub bytes: Vec<u8>,
}

/// Client-side file description accompanying the bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Original file name
    pub file_name: String,
    /// MIME type
    pub content_type: String,
}

impl FileMeta {
    /// Create file metadata
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }
}

/// Metadata handed to the object store with the bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Destination bucket
    pub bucket: String,
    /// Destination key
    pub object_key: String,
    /// MIME type
    pub content_type: String,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Location of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Bucket
    pub bucket: String,
    /// Key
    pub object_key: String,
}

/// Object key for an upload: `{user}/{document_key}_{unix_millis}_{file_name}`
///
/// Characters outside `[A-Za-z0-9.-]` in the file name become `_`.
#[must_use]
pub fn object_key(user: &UserId, key: &DocumentKey, file_name: &str, now: DateTime<Utc>) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{user}/{key}_{}_{sanitized}", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn object_key_sanitizes_file_name() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let key = object_key(
            &UserId::from("u1"),
            &DocumentKey::from("doc_rg_cpf"),
            "RG frente (1).pdf",
            now,
        );
        assert_eq!(key, "u1/doc_rg_cpf_1700000000000_RG_frente__1_.pdf");
    }

    #[test]
    fn roadmap_entry_starts_unsent() {
        let rec = DocumentRecommendation::builder("rec_1", "doc_a", "pessoal", "RG")
            .priority(5)
            .mandatory(true)
            .build();
        let now = Utc::now();
        let entry = DocumentRoadmapEntry::from_recommendation(&UserId::from("u1"), &rec, now);
        assert!(!entry.sent);
        assert!(entry.mandatory);
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn patch_is_field_level() {
        let rec = DocumentRecommendation::builder("rec_1", "doc_a", "pessoal", "RG").build();
        let created = Utc.timestamp_millis_opt(0).unwrap();
        let mut entry = DocumentRoadmapEntry::from_recommendation(&UserId::from("u1"), &rec, created);

        RoadmapPatch::default().apply(&mut entry, Utc::now());
        assert!(!entry.sent);
        assert_eq!(entry.updated_at, created);

        RoadmapPatch::sent().apply(&mut entry, Utc::now());
        assert!(entry.sent);
        assert_eq!(entry.name, "RG");
    }
}
