//! Testing utilities for the holding portal workspace
//!
//! Shared fixtures and fault-injecting adapters.

#![allow(missing_docs)]

use async_trait::async_trait;
use holding_documents::{
    BlobStore, DocumentCatalogReconciler, DocumentRoadmapEntry, InMemoryBlobStore, InMemoryRoadmapLedger,
    InMemoryUploadLedger, LedgerError, ObjectMetadata, ObjectRef, RoadmapLedger, RoadmapPatch, UploadLedger,
    UploadedDocumentRecord,
};
use holding_model::{DocumentKey, DocumentRecommendation, UploadConfig, UserId};
use holding_workflow::{InMemoryProfileStore, ProfileRecord, ProfileStore, ProfileStoreError, ProfileUpdate};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn user(id: &str) -> UserId {
    UserId::from(id)
}

pub fn rg_cpf() -> DocumentRecommendation {
    DocumentRecommendation::builder("rec_123", "doc_rg_cpf", "pessoal", "RG/CPF dos sócios")
        .priority(5)
        .mandatory(true)
        .reason("Identificação dos sócios")
        .build()
}

pub fn certidao_casamento() -> DocumentRecommendation {
    DocumentRecommendation::builder("rec_456", "doc_certidao", "pessoal", "Certidão de casamento")
        .priority(4)
        .mandatory(true)
        .build()
}

pub fn comprovante_residencia() -> DocumentRecommendation {
    DocumentRecommendation::builder("rec_789", "doc_comprovante", "pessoal", "Comprovante de residência")
        .priority(2)
        .build()
}

pub fn matricula_imovel() -> DocumentRecommendation {
    DocumentRecommendation::builder("rec_901", "doc_matricula", "imovel", "Matrícula do imóvel")
        .priority(3)
        .mandatory(true)
        .related_to("Apartamento")
        .build()
}

/// Three documents in category `pessoal`
pub fn pessoal_catalog() -> Vec<DocumentRecommendation> {
    vec![rg_cpf(), certidao_casamento(), comprovante_residencia()]
}

/// Documents across two categories
pub fn mixed_catalog() -> Vec<DocumentRecommendation> {
    let mut catalog = pessoal_catalog();
    catalog.push(matricula_imovel());
    catalog
}

pub fn upload_record(user: &UserId, rec: &DocumentRecommendation) -> UploadedDocumentRecord {
    let now = chrono::Utc::now();
    UploadedDocumentRecord {
        id: uuid::Uuid::new_v4(),
        user_id: user.clone(),
        document_key: rec.document_key.clone(),
        recommendation_id: rec.recommendation_id.clone(),
        bucket: UploadConfig::default().bucket,
        object_key: format!("{user}/{}_0_file.pdf", rec.document_key),
        file_name: "file.pdf".into(),
        content_type: "application/pdf".into(),
        size_bytes: 1,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Profile store
// ---------------------------------------------------------------------------

/// Profile store whose reads and writes can be made to fail
///
/// [`FlakyProfileStore::hold_next_read`] parks one read after it has taken
/// its snapshot, so the caller later sees the value as it was.
#[derive(Debug, Default)]
pub struct FlakyProfileStore {
    inner: InMemoryProfileStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    hold_next_read: AtomicBool,
    held_reads: AtomicUsize,
    held_signal: Notify,
    release_read: Notify,
}

impl FlakyProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(user: &UserId, record: ProfileRecord) -> Self {
        let store = Self::default();
        store.inner.insert(user.clone(), record);
        store
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryProfileStore {
        &self.inner
    }

    /// Park the next read until [`FlakyProfileStore::release_read`]
    pub fn hold_next_read(&self) {
        self.hold_next_read.store(true, Ordering::SeqCst);
    }

    pub fn release_read(&self) {
        self.release_read.notify_one();
    }

    /// Wait until at least `n` reads have been parked
    pub async fn wait_for_held_reads(&self, n: usize) {
        loop {
            let notified = self.held_signal.notified();
            if self.held_reads.load(Ordering::SeqCst) >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl ProfileStore for FlakyProfileStore {
    async fn read_profile(&self, user: &UserId) -> Result<Option<ProfileRecord>, ProfileStoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Unavailable("injected read failure".into()));
        }
        let snapshot = self.inner.read_profile(user).await;
        if self.hold_next_read.swap(false, Ordering::SeqCst) {
            self.held_reads.fetch_add(1, Ordering::SeqCst);
            self.held_signal.notify_waiters();
            self.release_read.notified().await;
        }
        snapshot
    }

    async fn write_profile(&self, user: &UserId, update: ProfileUpdate) -> Result<(), ProfileStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Unavailable("injected write failure".into()));
        }
        self.inner.write_profile(user, update).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Document ledgers
// ---------------------------------------------------------------------------

/// Roadmap ledger that yields to the scheduler on every call and can fail
/// inserts or updates
///
/// [`FlakyRoadmapLedger::hold_next_list`] parks one `list_entries` after it
/// has read the rows.
#[derive(Debug, Default)]
pub struct FlakyRoadmapLedger {
    inner: InMemoryRoadmapLedger,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    insert_calls: AtomicUsize,
    hold_next_list: AtomicBool,
    held_lists: AtomicUsize,
    held_signal: Notify,
    release_list: Notify,
}

impl FlakyRoadmapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Park the next `list_entries` until [`FlakyRoadmapLedger::release_list`]
    pub fn hold_next_list(&self) {
        self.hold_next_list.store(true, Ordering::SeqCst);
    }

    pub fn release_list(&self) {
        self.release_list.notify_one();
    }

    /// Wait until at least `n` listings have been parked
    pub async fn wait_for_held_lists(&self, n: usize) {
        loop {
            let notified = self.held_signal.notified();
            if self.held_lists.load(Ordering::SeqCst) >= n {
                return;
            }
            notified.await;
        }
    }

    pub fn inner(&self) -> &InMemoryRoadmapLedger {
        &self.inner
    }
}

#[async_trait]
impl RoadmapLedger for FlakyRoadmapLedger {
    async fn list_entries(&self, user: &UserId, keys: &[DocumentKey]) -> Result<Vec<DocumentRoadmapEntry>, LedgerError> {
        tokio::task::yield_now().await;
        let rows = self.inner.list_entries(user, keys).await;
        if self.hold_next_list.swap(false, Ordering::SeqCst) {
            self.held_lists.fetch_add(1, Ordering::SeqCst);
            self.held_signal.notify_waiters();
            self.release_list.notified().await;
        }
        rows
    }

    async fn insert_entries(&self, entries: Vec<DocumentRoadmapEntry>) -> Result<(), LedgerError> {
        tokio::task::yield_now().await;
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected insert failure".into()));
        }
        self.inner.insert_entries(entries).await
    }

    async fn update_entry(&self, user: &UserId, key: &DocumentKey, patch: RoadmapPatch) -> Result<(), LedgerError> {
        tokio::task::yield_now().await;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected update failure".into()));
        }
        self.inner.update_entry(user, key, patch).await
    }
}

/// Upload ledger whose reads or inserts can be made to fail
#[derive(Debug, Default)]
pub struct FlakyUploadLedger {
    inner: InMemoryUploadLedger,
    fail_reads: AtomicBool,
    fail_inserts: AtomicBool,
}

impl FlakyUploadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryUploadLedger {
        &self.inner
    }
}

#[async_trait]
impl UploadLedger for FlakyUploadLedger {
    async fn list_records(&self, user: &UserId, keys: &[DocumentKey]) -> Result<Vec<UploadedDocumentRecord>, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected read failure".into()));
        }
        self.inner.list_records(user, keys).await
    }

    async fn insert_record(&self, record: UploadedDocumentRecord) -> Result<(), LedgerError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected insert failure".into()));
        }
        self.inner.insert_record(record).await
    }

    async fn get_record(&self, id: uuid::Uuid) -> Result<Option<UploadedDocumentRecord>, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected read failure".into()));
        }
        self.inner.get_record(id).await
    }
}

/// Blob store that can hold every `put_object` until released
///
/// When gated, each put waits for one permit from [`GatedBlobStore::release`].
/// Waiters are served in arrival order. Reads are never held; the failure
/// toggle applies to puts and reads alike.
#[derive(Debug)]
pub struct GatedBlobStore {
    inner: InMemoryBlobStore,
    gated: AtomicBool,
    fail: AtomicBool,
    permits: Semaphore,
    started: AtomicUsize,
    started_signal: Notify,
}

impl Default for GatedBlobStore {
    fn default() -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
            gated: AtomicBool::new(false),
            fail: AtomicBool::new(false),
            permits: Semaphore::new(0),
            started: AtomicUsize::new(0),
            started_signal: Notify::new(),
        }
    }
}

impl GatedBlobStore {
    /// Store that lets every put through
    pub fn open() -> Self {
        Self::default()
    }

    /// Store that holds every put until released
    pub fn gated() -> Self {
        let store = Self::default();
        store.gated.store(true, Ordering::SeqCst);
        store
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Let `n` held puts proceed
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Puts that reached the store, including held ones
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` puts reached the store
    pub async fn wait_for_puts(&self, n: usize) {
        loop {
            let notified = self.started_signal.notified();
            if self.started() >= n {
                return;
            }
            notified.await;
        }
    }

    pub fn inner(&self) -> &InMemoryBlobStore {
        &self.inner
    }
}

#[async_trait]
impl BlobStore for GatedBlobStore {
    async fn put_object(&self, bytes: Vec<u8>, metadata: ObjectMetadata) -> Result<ObjectRef, LedgerError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.started_signal.notify_waiters();

        if self.gated.load(Ordering::SeqCst) {
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| LedgerError::Unavailable("gate closed".into()))?;
            permit.forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected put failure".into()));
        }
        self.inner.put_object(bytes, metadata).await
    }

    async fn get_object(&self, object: &ObjectRef) -> Result<Vec<u8>, LedgerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected get failure".into()));
        }
        self.inner.get_object(object).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Reconciler wired to fault-injecting adapters
pub struct DocumentHarness {
    pub roadmap: Arc<FlakyRoadmapLedger>,
    pub uploads: Arc<FlakyUploadLedger>,
    pub blobs: Arc<GatedBlobStore>,
    pub reconciler: Arc<DocumentCatalogReconciler>,
}

impl DocumentHarness {
    pub fn new(blobs: GatedBlobStore) -> Self {
        Self::with_config(blobs, UploadConfig::default())
    }

    pub fn with_config(blobs: GatedBlobStore, config: UploadConfig) -> Self {
        let roadmap = Arc::new(FlakyRoadmapLedger::new());
        let uploads = Arc::new(FlakyUploadLedger::new());
        let blobs = Arc::new(blobs);
        let reconciler = Arc::new(DocumentCatalogReconciler::new(
            roadmap.clone(),
            uploads.clone(),
            blobs.clone(),
            config,
        ));
        Self {
            roadmap,
            uploads,
            blobs,
            reconciler,
        }
    }

    /// Second reconciler over the same ledgers, as another process would have
    pub fn sibling(&self) -> DocumentCatalogReconciler {
        DocumentCatalogReconciler::new(
            self.roadmap.clone(),
            self.uploads.clone(),
            self.blobs.clone(),
            self.reconciler.config().clone(),
        )
    }
}
