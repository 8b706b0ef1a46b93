//! Holding Model - shared vocabulary for the holding portal core
//!
//! Everything the workflow and document crates agree on lives here:
//! - Opaque identifiers (users, sessions, recommendations, document keys)
//! - The account lifecycle (`WorkflowState`) and onboarding path
//! - Document recommendations and their derived upload status
//! - Navigation targets produced by the route gate
//! - Configuration and tracing setup
//!
//! # Example
//!
//! ```rust
//! use holding_model::{DocumentRecommendation, WorkflowState};
//!
//! let rec = DocumentRecommendation::builder("rec_123", "doc_rg_cpf", "pessoal", "RG/CPF dos sócios")
//!     .priority(5)
//!     .mandatory(true)
//!     .build();
//!
//! assert!(rec.is_high_priority());
//! assert_eq!(WorkflowState::default(), WorkflowState::FirstAccess);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod document;
pub mod error;
pub mod ids;
pub mod route;
pub mod telemetry;
pub mod workflow;

pub use config::{LoggingConfig, PortalConfig, UploadConfig, WorkflowConfig};
pub use document::{
    DocumentCategory, DocumentRecommendation, DocumentRecommendationBuilder, UploadStatus,
};
pub use error::ModelError;
pub use ids::{DocumentKey, RecommendationId, SessionId, UserId};
pub use route::Route;
pub use workflow::{OnboardingPath, UserRole, WorkflowState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the holding model
    pub use crate::{
        DocumentCategory, DocumentKey, DocumentRecommendation, OnboardingPath, PortalConfig,
        RecommendationId, Route, SessionId, UploadStatus, UserId, UserRole, WorkflowState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
