//! Portal configuration
//!
//! Every section has defaults so an empty TOML document is a valid
//! configuration.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Default upload size ceiling: 10 MiB
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Default object-store bucket for uploads
pub const DEFAULT_BUCKET: &str = "database_storage";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Upload limits and destination
    pub uploads: UploadConfig,
    /// Lifecycle store behaviour
    pub workflow: WorkflowConfig,
    /// Tracing setup
    pub logging: LoggingConfig,
}

impl PortalConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `ModelError::InvalidConfig` if the document does not parse
    /// - `ModelError::ConfigOutOfRange` if a value is unusable
    pub fn from_toml_str(raw: &str) -> Result<Self, ModelError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ModelError::ConfigOutOfRange` naming the first offending field
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.uploads.max_file_bytes == 0 {
            return Err(ModelError::ConfigOutOfRange {
                field: "uploads.max_file_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.uploads.bucket.trim().is_empty() {
            return Err(ModelError::ConfigOutOfRange {
                field: "uploads.bucket",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// With upload size ceiling
    #[inline]
    #[must_use]
    pub fn with_max_file_bytes(mut self, max: u64) -> Self {
        self.uploads.max_file_bytes = max;
        self
    }

    /// With upload bucket
    #[inline]
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.uploads.bucket = bucket.into();
        self
    }

    /// With transition graph enforcement on or off
    #[inline]
    #[must_use]
    pub fn with_enforced_transitions(mut self, enforce: bool) -> Self {
        self.workflow.enforce_transition_graph = enforce;
        self
    }
}

/// Upload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted file in bytes
    pub max_file_bytes: u64,
    /// Object-store bucket
    pub bucket: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

/// Lifecycle store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Reject transitions outside the lifecycle graph
    pub enforce_transition_graph: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enforce_transition_graph: true,
        }
    }
}

/// Tracing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
