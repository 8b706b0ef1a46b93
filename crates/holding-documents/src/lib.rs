//! Holding Documents - catalog reconciliation and upload progress
//!
//! - [`DocumentCatalogReconciler`] keeps the roadmap ledger in step with a
//!   user's recommendations, drives uploads and derives per-document status
//! - [`ProgressAggregator`] turns a catalog and a status map into per-category
//!   and overall tallies
//! - [`ports`] defines the ledger and object-store boundaries, with in-memory
//!   adapters in [`memory`]
//!
//! # Example
//!
//! ```rust,ignore
//! use holding_documents::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reconciler = DocumentCatalogReconciler::new(
//!     Arc::new(InMemoryRoadmapLedger::new()),
//!     Arc::new(InMemoryUploadLedger::new()),
//!     Arc::new(InMemoryBlobStore::new()),
//!     UploadConfig::default(),
//! );
//! let user = UserId::from("user-1");
//! let rec = DocumentRecommendation::builder("rec_123", "doc_rg_cpf", "pessoal", "RG/CPF").build();
//!
//! reconciler.initialize(&user, &[rec]).await?;
//! reconciler
//!     .trigger_upload(&user, &"doc_rg_cpf".into(), b"%PDF".to_vec(), FileMeta::new("rg.pdf", "application/pdf"))
//!     .await?;
//! assert_eq!(reconciler.progress(&user).overall.uploaded, 1);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod catalog;
pub mod error;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod reconciler;
pub mod records;
pub mod status;

pub use catalog::DocumentCatalog;
pub use error::{DownloadError, LedgerError, ReconcileError, UploadError};
pub use memory::{InMemoryBlobStore, InMemoryRecommendations, InMemoryRoadmapLedger, InMemoryUploadLedger};
pub use ports::{BlobStore, RecommendationSource, RoadmapLedger, UploadLedger};
pub use progress::{ProgressAggregator, ProgressReport, Tally};
pub use reconciler::{DocumentCatalogReconciler, InitializeReport};
pub use records::{
    object_key, DocumentRoadmapEntry, DownloadedDocument, FileMeta, ObjectMetadata, ObjectRef, RoadmapPatch, UploadedDocumentRecord,
};
pub use status::{StatusBoard, StatusMap, UploadAttempt};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the documents crate
    pub use crate::{
        DocumentCatalogReconciler, FileMeta, InMemoryBlobStore, InMemoryRoadmapLedger, InMemoryUploadLedger,
        ProgressAggregator, ReconcileError, StatusMap, UploadError,
    };
    pub use holding_model::{DocumentKey, DocumentRecommendation, UploadConfig, UploadStatus, UserId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
