//! Error types for document reconciliation
//!
//! Provides error handling for:
//! - Ledger and object-store adapter failures
//! - Per-document upload failures (user-recoverable by retry)
//! - Reconciliation read/insert failures
//! - Download lookups and ownership checks

use holding_model::{DocumentKey, UserId};
use uuid::Uuid;

/// Adapter-level failure reported by a ledger or the object store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Unique constraint on `(user, document_key)` rejected an insert
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Row targeted by an update does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend unreachable, timed out or refused the request
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Check if this is the idempotency constraint firing
    #[inline]
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

/// Failure of a single `trigger_upload` call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// An upload for the same key is in flight
    #[error("upload already in progress for {0}")]
    AlreadyInProgress(DocumentKey),

    /// Document key is not in the user's catalog
    #[error("unknown document: {0}")]
    UnknownDocument(DocumentKey),

    /// File is empty
    #[error("file is empty")]
    EmptyFile,

    /// File exceeds the size ceiling
    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge {
        /// File size in bytes
        size: u64,
        /// Configured ceiling in bytes
        limit: u64,
    },

    /// Object store rejected the bytes
    #[error("object store failed: {0}")]
    BlobStoreFailed(LedgerError),

    /// Upload record could not be written
    #[error("upload record insert failed: {0}")]
    LedgerInsertFailed(LedgerError),

    /// Upload finished but the slot moved on; the result was not applied
    #[error("upload result for {0} arrived after the attempt was superseded")]
    Superseded(DocumentKey),
}

impl UploadError {
    /// Check if retrying the upload may succeed
    #[inline]
    #[must_use]
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyFile
                | Self::FileTooLarge { .. }
                | Self::BlobStoreFailed(_)
                | Self::LedgerInsertFailed(_)
        )
    }
}

/// Failure of `initialize` or `reconcile`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// `reconcile` called before any catalog was registered
    #[error("no catalog initialized for {0}")]
    NotInitialized(UserId),

    /// Recommendation source could not be read
    #[error("recommendations unavailable: {0}")]
    RecommendationsUnavailable(LedgerError),

    /// Roadmap ledger could not be read
    #[error("roadmap read failed: {0}")]
    RoadmapReadFailed(LedgerError),

    /// Roadmap insert failed for a reason other than the unique constraint
    #[error("roadmap insert failed: {0}")]
    RoadmapInsertFailed(LedgerError),

    /// Upload ledger could not be read
    #[error("upload records read failed: {0}")]
    UploadReadFailed(LedgerError),
}

/// Failure of `download`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    /// No upload record with this id
    #[error("document {0} not found")]
    NotFound(Uuid),

    /// Record belongs to another user
    #[error("user {user} does not own document {record}")]
    NotOwner {
        /// Requested record
        record: Uuid,
        /// Caller
        user: UserId,
    },

    /// Upload ledger could not be read
    #[error("upload record read failed: {0}")]
    LedgerReadFailed(LedgerError),

    /// Object store could not return the bytes
    #[error("object store failed: {0}")]
    BlobStoreFailed(LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_error_display() {
        let err = UploadError::FileTooLarge {
            size: 11,
            limit: 10,
        };
        assert_eq!(err.to_string(), "file too large: 11 bytes (limit 10)");
    }

    #[test]
    fn upload_error_recoverability() {
        assert!(UploadError::EmptyFile.is_user_recoverable());
        assert!(UploadError::BlobStoreFailed(LedgerError::Unavailable("x".into())).is_user_recoverable());
        assert!(!UploadError::AlreadyInProgress(DocumentKey::from("doc")).is_user_recoverable());
        assert!(!UploadError::UnknownDocument(DocumentKey::from("doc")).is_user_recoverable());
    }

    #[test]
    fn download_error_display() {
        let record = Uuid::nil();
        let err = DownloadError::NotOwner {
            record,
            user: UserId::from("u2"),
        };
        assert_eq!(
            err.to_string(),
            "user u2 does not own document 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn constraint_violation_predicate() {
        assert!(LedgerError::ConstraintViolation("dup".into()).is_constraint_violation());
        assert!(!LedgerError::Unavailable("down".into()).is_constraint_violation());
    }
}
