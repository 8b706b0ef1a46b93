//! Error types for the holding model

/// Errors raised while parsing model values or loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Unrecognized workflow state name
    #[error("unknown workflow state: {0}")]
    UnknownWorkflowState(String),

    /// Unrecognized onboarding path name
    #[error("unknown onboarding path: {0}")]
    UnknownOnboardingPath(String),

    /// Unrecognized role name
    #[error("unknown user role: {0}")]
    UnknownRole(String),

    /// Unrecognized upload status name
    #[error("unknown upload status: {0}")]
    UnknownUploadStatus(String),

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value
    #[error("configuration value out of range: {field}: {reason}")]
    ConfigOutOfRange {
        /// Dotted field path
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}
