//! Document catalog reconciliation
//!
//! Merges the two independently written evidence sources (roadmap `sent` flag
//! and upload records) into one status per document, and drives uploads
//! through the object store and the upload ledger. Stored uploads are
//! served back only to their owner.
//!
//! Either evidence source alone is enough for `uploaded`. The roadmap flag is
//! written best effort after the upload record, so it may lag.

use crate::catalog::DocumentCatalog;
use crate::error::{DownloadError, ReconcileError, UploadError};
use crate::ports::{BlobStore, RecommendationSource, RoadmapLedger, UploadLedger};
use crate::progress::{ProgressAggregator, ProgressReport};
use crate::records::{
    object_key, DocumentRoadmapEntry, DownloadedDocument, FileMeta, ObjectMetadata, RoadmapPatch, UploadedDocumentRecord,
};
use crate::status::{StatusBoard, StatusMap, UploadAttempt};
use chrono::Utc;
use dashmap::DashMap;
use holding_model::{DocumentKey, DocumentRecommendation, SessionId, UploadConfig, UploadStatus, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of [`DocumentCatalogReconciler::initialize`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitializeReport {
    /// Roadmap rows written by this call
    pub created: usize,
    /// Rows that already existed, including ones written concurrently
    pub already_present: usize,
    /// Keys with upload evidence, sorted
    pub uploaded: Vec<DocumentKey>,
}

/// Reconciles the recommendation catalog with the document ledgers
pub struct DocumentCatalogReconciler {
    roadmap: Arc<dyn RoadmapLedger>,
    uploads: Arc<dyn UploadLedger>,
    blobs: Arc<dyn BlobStore>,
    config: UploadConfig,
    catalogs: DashMap<UserId, DocumentCatalog>,
    board: StatusBoard,
}

impl std::fmt::Debug for DocumentCatalogReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCatalogReconciler")
            .field("users", &self.catalogs.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DocumentCatalogReconciler {
    /// Create a reconciler over the given ports
    #[must_use]
    pub fn new(
        roadmap: Arc<dyn RoadmapLedger>,
        uploads: Arc<dyn UploadLedger>,
        blobs: Arc<dyn BlobStore>,
        config: UploadConfig,
    ) -> Self {
        Self {
            roadmap,
            uploads,
            blobs,
            config,
            catalogs: DashMap::new(),
            board: StatusBoard::new(),
        }
    }

    /// Upload settings in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Register recommendations and make sure each has a roadmap row
    ///
    /// Safe to run repeatedly and concurrently: a unique-constraint rejection
    /// counts as already initialized. Keys with upload evidence are marked
    /// `uploaded`, and their roadmap rows are flagged `sent` if an upload
    /// finished before the row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if a ledger read fails or an insert fails for a reason
    /// other than the unique constraint.
    pub async fn initialize(
        &self,
        user: &UserId,
        recommendations: &[DocumentRecommendation],
    ) -> Result<InitializeReport, ReconcileError> {
        let incoming = DocumentCatalog::from_recommendations(recommendations.iter().cloned());
        let keys = incoming.keys();

        self.catalogs
            .entry(user.clone())
            .or_default()
            .extend(incoming.iter().cloned());

        let existing = self
            .roadmap
            .list_entries(user, &keys)
            .await
            .map_err(ReconcileError::RoadmapReadFailed)?;
        let present: HashSet<&DocumentKey> = existing.iter().map(|e| &e.document_key).collect();

        let now = Utc::now();
        let missing: Vec<DocumentRoadmapEntry> = incoming
            .iter()
            .filter(|rec| !present.contains(&rec.document_key))
            .map(|rec| DocumentRoadmapEntry::from_recommendation(user, rec, now))
            .collect();

        let mut report = InitializeReport {
            already_present: existing.len(),
            ..InitializeReport::default()
        };
        let mut sent: BTreeSet<DocumentKey> = existing
            .iter()
            .filter(|e| e.sent)
            .map(|e| e.document_key.clone())
            .collect();

        if !missing.is_empty() {
            let batch = missing.len();
            match self.roadmap.insert_entries(missing.clone()).await {
                Ok(()) => report.created = batch,
                Err(err) if err.is_constraint_violation() => {
                    tracing::debug!(user = %user, error = %err, "roadmap batch raced; inserting row by row");
                    self.insert_individually(user, missing, &mut report, &mut sent).await?;
                }
                Err(err) => {
                    tracing::error!(user = %user, error = %err, "roadmap insert failed");
                    return Err(ReconcileError::RoadmapInsertFailed(err));
                }
            }
        }

        let records = self
            .uploads
            .list_records(user, &keys)
            .await
            .map_err(ReconcileError::UploadReadFailed)?;
        let recorded: BTreeSet<DocumentKey> = records.into_iter().map(|r| r.document_key).collect();
        for key in recorded.difference(&sent) {
            self.flag_sent(user, key, "roadmap sent flag repaired from upload record").await;
        }
        sent.extend(recorded);

        self.board.record_evidence(user, &sent);
        report.uploaded = sent.into_iter().collect();

        tracing::info!(
            user = %user,
            documents = keys.len(),
            created = report.created,
            already_present = report.already_present,
            uploaded = report.uploaded.len(),
            "document catalog initialized"
        );
        Ok(report)
    }

    async fn insert_individually(
        &self,
        user: &UserId,
        missing: Vec<DocumentRoadmapEntry>,
        report: &mut InitializeReport,
        sent: &mut BTreeSet<DocumentKey>,
    ) -> Result<(), ReconcileError> {
        let keys: Vec<DocumentKey> = missing.iter().map(|e| e.document_key.clone()).collect();
        let raced = self
            .roadmap
            .list_entries(user, &keys)
            .await
            .map_err(ReconcileError::RoadmapReadFailed)?;
        let present: HashSet<DocumentKey> = raced.iter().map(|e| e.document_key.clone()).collect();
        sent.extend(raced.into_iter().filter(|e| e.sent).map(|e| e.document_key));

        for entry in missing {
            if present.contains(&entry.document_key) {
                report.already_present += 1;
                continue;
            }
            match self.roadmap.insert_entries(vec![entry]).await {
                Ok(()) => report.created += 1,
                Err(err) if err.is_constraint_violation() => report.already_present += 1,
                Err(err) => return Err(ReconcileError::RoadmapInsertFailed(err)),
            }
        }
        Ok(())
    }

    /// Fetch the session's recommendations and [`initialize`](Self::initialize) with them
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::RecommendationsUnavailable`] if the source
    /// fails, otherwise the errors of `initialize`.
    pub async fn initialize_from_source(
        &self,
        user: &UserId,
        session: &SessionId,
        source: &dyn RecommendationSource,
    ) -> Result<InitializeReport, ReconcileError> {
        let recommendations = source
            .list_recommendations(session)
            .await
            .map_err(ReconcileError::RecommendationsUnavailable)?;
        tracing::debug!(user = %user, session = %session, count = recommendations.len(), "recommendations fetched");
        self.initialize(user, &recommendations).await
    }

    /// Upload a file for one document
    ///
    /// Rejected immediately if an upload for the same key is in flight. On
    /// success the upload record is appended and the roadmap row flagged
    /// `sent`; a failure of the flag update is logged and does not fail the
    /// upload. On failure nothing is written and the status becomes `error`.
    ///
    /// # Errors
    ///
    /// See [`UploadError`]. [`UploadError::Superseded`] means the bytes and
    /// record were stored but the attempt had been abandoned before it
    /// finished.
    pub async fn trigger_upload(
        &self,
        user: &UserId,
        key: &DocumentKey,
        bytes: Vec<u8>,
        meta: FileMeta,
    ) -> Result<UploadedDocumentRecord, UploadError> {
        let recommendation = self
            .catalogs
            .get(user)
            .and_then(|catalog| catalog.get(key).cloned())
            .ok_or_else(|| UploadError::UnknownDocument(key.clone()))?;

        if self.board.is_in_flight(user, key) {
            tracing::debug!(user = %user, key = %key, "upload rejected; already in progress");
            return Err(UploadError::AlreadyInProgress(key.clone()));
        }

        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if let Err(err) = self.validate(size) {
            tracing::warn!(user = %user, key = %key, error = %err, "upload rejected");
            self.board.mark_failed(user, key);
            return Err(err);
        }

        let attempt = self
            .board
            .begin(user, key)
            .ok_or_else(|| UploadError::AlreadyInProgress(key.clone()))?;
        tracing::info!(user = %user, key = %key, attempt = attempt.id(), size, "upload started");

        let now = Utc::now();
        let metadata = ObjectMetadata {
            bucket: self.config.bucket.clone(),
            object_key: object_key(user, key, &meta.file_name, now),
            content_type: meta.content_type.clone(),
            size_bytes: size,
        };

        let object = match self.blobs.put_object(bytes, metadata).await {
            Ok(object) => object,
            Err(err) => return Err(self.fail(attempt, user, UploadError::BlobStoreFailed(err))),
        };

        let record = UploadedDocumentRecord {
            id: uuid::Uuid::new_v4(),
            user_id: user.clone(),
            document_key: key.clone(),
            recommendation_id: recommendation.recommendation_id,
            bucket: object.bucket,
            object_key: object.object_key,
            file_name: meta.file_name,
            content_type: meta.content_type,
            size_bytes: size,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.uploads.insert_record(record.clone()).await {
            return Err(self.fail(attempt, user, UploadError::LedgerInsertFailed(err)));
        }

        self.flag_sent(user, key, "roadmap sent flag updated").await;

        let id = attempt.id();
        if !self.board.finish_success(attempt) {
            tracing::warn!(user = %user, key = %key, attempt = id, "upload finished after being superseded");
            return Err(UploadError::Superseded(key.clone()));
        }

        tracing::info!(user = %user, key = %key, attempt = id, object_key = %record.object_key, "upload stored");
        Ok(record)
    }

    /// Set the roadmap row's `sent` flag; failure is logged, the upload record
    /// remains the evidence
    async fn flag_sent(&self, user: &UserId, key: &DocumentKey, done: &'static str) {
        match self.roadmap.update_entry(user, key, RoadmapPatch::sent()).await {
            Ok(()) => tracing::debug!(user = %user, key = %key, "{done}"),
            Err(err) => {
                tracing::warn!(user = %user, key = %key, error = %err, "roadmap sent flag not updated; upload record stands");
            }
        }
    }

        fn validate(&self, size: u64) -> Result<(), UploadError> {
        if size == 0 {
            return Err(UploadError::EmptyFile);
        }
        if size > self.config.max_file_bytes {
            return Err(UploadError::FileTooLarge {
                size,
                limit: self.config.max_file_bytes,
            });
        }
        Ok(())
    }

    fn fail(&self, attempt: UploadAttempt, user: &UserId, err: UploadError) -> UploadError {
        let key = attempt.key().clone();
        let id = attempt.id();
        if self.board.finish_failure(attempt) {
            tracing::warn!(user = %user, key = %key, attempt = id, error = %err, "upload failed");
            err
        } else {
            tracing::debug!(user = %user, key = %key, attempt = id, error = %err, "superseded upload failed");
            UploadError::Superseded(key)
        }
    }

    /// Fetch a stored upload on behalf of `user`
    ///
    /// # Errors
    ///
    /// [`DownloadError::NotOwner`] if the record belongs to someone else,
    /// [`DownloadError::NotFound`] if there is no such record, otherwise the
    /// ledger or object-store failure.
    pub async fn download(&self, user: &UserId, record_id: Uuid) -> Result<DownloadedDocument, DownloadError> {
        let record = self
            .uploads
            .get_record(record_id)
            .await
            .map_err(DownloadError::LedgerReadFailed)?
            .ok_or(DownloadError::NotFound(record_id))?;

        if &record.user_id != user {
            tracing::warn!(user = %user, record = %record_id, "download refused; not the owner");
            return Err(DownloadError::NotOwner {
                record: record_id,
                user: user.clone(),
            });
        }

        let bytes = self.blobs.get_object(&record.object()).await.map_err(|err| {
            tracing::error!(user = %user, record = %record_id, error = %err, "stored object unreadable");
            DownloadError::BlobStoreFailed(err)
        })?;
        tracing::debug!(user = %user, record = %record_id, size = bytes.len(), "document downloaded");
        Ok(DownloadedDocument { record, bytes })
    }

    /// Re-derive every document's status from the ledgers
    ///
    /// Convergent: with no intervening writes two calls return the same map.
    /// Keys without evidence keep their in-session `uploading`/`error` status.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NotInitialized`] before the first
    /// `initialize`, or the ledger read failure.
    pub async fn reconcile(&self, user: &UserId) -> Result<StatusMap, ReconcileError> {
        let keys = self
            .catalogs
            .get(user)
            .map(|catalog| catalog.keys())
            .ok_or_else(|| ReconcileError::NotInitialized(user.clone()))?;

        let (entries, records) = futures::try_join!(
            async {
                self.roadmap
                    .list_entries(user, &keys)
                    .await
                    .map_err(ReconcileError::RoadmapReadFailed)
            },
            async {
                self.uploads
                    .list_records(user, &keys)
                    .await
                    .map_err(ReconcileError::UploadReadFailed)
            },
        )?;

        let evidence: HashSet<DocumentKey> = entries
            .into_iter()
            .filter(|e| e.sent)
            .map(|e| e.document_key)
            .chain(records.into_iter().map(|r| r.document_key))
            .collect();

        self.board.apply_evidence(user, &keys, &evidence);
        let map = self.board.snapshot(user, &keys);
        tracing::debug!(user = %user, documents = keys.len(), uploaded = evidence.len(), "statuses reconciled");
        Ok(map)
    }

    /// Current status of one document
    #[must_use]
    pub fn status(&self, user: &UserId, key: &DocumentKey) -> UploadStatus {
        self.board.status(user, key)
    }

    /// Current status of every catalog document, without touching the ledgers
    #[must_use]
    pub fn status_map(&self, user: &UserId) -> StatusMap {
        let keys = self.catalogs.get(user).map(|c| c.keys()).unwrap_or_default();
        self.board.snapshot(user, &keys)
    }

    /// Copy of a user's catalog
    #[must_use]
    pub fn catalog(&self, user: &UserId) -> Option<DocumentCatalog> {
        self.catalogs.get(user).map(|c| c.clone())
    }

    /// Progress over the user's catalog and current statuses
    #[must_use]
    pub fn progress(&self, user: &UserId) -> ProgressReport {
        let catalog = self.catalog(user).unwrap_or_default();
        ProgressAggregator::aggregate(catalog.as_slice(), &self.status_map(user))
    }

    /// Release an in-flight upload; its eventual result will be ignored
    pub fn abandon_upload(&self, user: &UserId, key: &DocumentKey) -> bool {
        let released = self.board.abandon(user, key);
        if released {
            tracing::info!(user = %user, key = %key, "in-flight upload abandoned");
        }
        released
    }

    /// Drop the user's catalog and statuses, e.g. at sign-out
    pub fn forget(&self, user: &UserId) {
        self.catalogs.remove(user);
        self.board.forget(user);
    }
}
