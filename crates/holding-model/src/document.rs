//! Document recommendations and upload status
//!
//! A `DocumentRecommendation` is issued once per document for a user session
//! and never changes afterwards. Required fields are plain values so a record
//! missing one of them fails to deserialize instead of reaching the roadmap
//! ledger half-filled.

use crate::error::ModelError;
use crate::ids::{DocumentKey, RecommendationId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest accepted priority
pub const MIN_PRIORITY: u8 = 1;
/// Highest accepted priority
pub const MAX_PRIORITY: u8 = 5;

/// Category a document is grouped under (`pessoal`, `imovel`, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentCategory(String);

impl DocumentCategory {
    /// Wrap a category key
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Category key
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label shown next to the progress counters
    #[must_use]
    pub fn display_name(&self) -> String {
        let known = match self.0.as_str() {
            "pessoal" => Some("Documentos Pessoais"),
            "familiar" => Some("Documentos Familiares"),
            "imovel" => Some("Documentos de Imóveis"),
            "empresa" => Some("Documentos de Empresas"),
            "financeiro" => Some("Documentos Financeiros"),
            "tributario" => Some("Documentos Tributários"),
            "juridico" => Some("Documentos Jurídicos"),
            _ => None,
        };
        known.map_or_else(|| title_case(&self.0), str::to_string)
    }
}

fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentCategory {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// A document recommended to a user for the holding setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecommendation {
    /// Issued recommendation id
    pub recommendation_id: RecommendationId,
    /// Stable document key
    pub document_key: DocumentKey,
    /// Grouping category
    pub category: DocumentCategory,
    /// Display name
    pub name: String,
    /// Priority in `MIN_PRIORITY..=MAX_PRIORITY`
    pub priority: u8,
    /// Whether the holding cannot open without it
    #[serde(rename = "is_mandatory")]
    pub mandatory: bool,
    /// What the document is
    #[serde(default)]
    pub description: Option<String>,
    /// Why it was recommended
    #[serde(default)]
    pub reason: Option<String>,
    /// Specific asset or person the document refers to
    #[serde(default)]
    pub item_description: Option<String>,
    /// Kind of item (`imovel`, `empresa`, ...)
    #[serde(default)]
    pub item_type: Option<String>,
    /// Index of the item within its kind
    #[serde(default)]
    pub item_index: Option<u32>,
    /// Group shared by documents about the same item
    #[serde(default)]
    pub group_id: Option<String>,
    /// Related person or asset
    #[serde(default)]
    pub related_to: Option<String>,
    /// Where to obtain it
    #[serde(default)]
    pub how_to_obtain: Option<String>,
    /// Expected processing time
    #[serde(default)]
    pub processing_time: Option<String>,
    /// Expected cost
    #[serde(default)]
    pub estimated_cost: Option<String>,
}

impl DocumentRecommendation {
    /// Start a builder with the required fields
    #[must_use]
    pub fn builder(
        recommendation_id: impl Into<RecommendationId>,
        document_key: impl Into<DocumentKey>,
        category: impl Into<DocumentCategory>,
        name: impl Into<String>,
    ) -> DocumentRecommendationBuilder {
        DocumentRecommendationBuilder {
            inner: Self {
                recommendation_id: recommendation_id.into(),
                document_key: document_key.into(),
                category: category.into(),
                name: name.into(),
                priority: MIN_PRIORITY,
                mandatory: false,
                description: None,
                reason: None,
                item_description: None,
                item_type: None,
                item_index: None,
                group_id: None,
                related_to: None,
                how_to_obtain: None,
                processing_time: None,
                estimated_cost: None,
            },
        }
    }

    /// Priority 4 and 5 are highlighted
    #[inline]
    #[must_use]
    pub fn is_high_priority(&self) -> bool {
        self.priority >= 4
    }
}

/// Builder for [`DocumentRecommendation`]
#[derive(Debug, Clone)]
pub struct DocumentRecommendationBuilder {
    inner: DocumentRecommendation,
}

impl DocumentRecommendationBuilder {
    /// Priority, clamped to the accepted range
    #[must_use]
    pub fn priority(mut self, priority: u8) -> Self {
        self.inner.priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        self
    }

    /// Mandatory flag
    #[must_use]
    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.inner.mandatory = mandatory;
        self
    }

    /// Description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = Some(description.into());
        self
    }

    /// Reason
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.inner.reason = Some(reason.into());
        self
    }

    /// Item the document refers to
    #[must_use]
    pub fn item(mut self, item_type: impl Into<String>, index: u32, description: impl Into<String>) -> Self {
        self.inner.item_type = Some(item_type.into());
        self.inner.item_index = Some(index);
        self.inner.item_description = Some(description.into());
        self
    }

    /// Group id
    #[must_use]
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.inner.group_id = Some(group_id.into());
        self
    }

    /// Related person or asset
    #[must_use]
    pub fn related_to(mut self, related_to: impl Into<String>) -> Self {
        self.inner.related_to = Some(related_to.into());
        self
    }

    /// Where to obtain it
    #[must_use]
    pub fn how_to_obtain(mut self, how: impl Into<String>) -> Self {
        self.inner.how_to_obtain = Some(how.into());
        self
    }

    /// Processing time
    #[must_use]
    pub fn processing_time(mut self, time: impl Into<String>) -> Self {
        self.inner.processing_time = Some(time.into());
        self
    }

    /// Estimated cost
    #[must_use]
    pub fn estimated_cost(mut self, cost: impl Into<String>) -> Self {
        self.inner.estimated_cost = Some(cost.into());
        self
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> DocumentRecommendation {
        self.inner
    }
}

/// Derived per-document upload status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Nothing received yet
    #[default]
    Pending,
    /// An upload is in flight
    Uploading,
    /// Upload evidence exists
    Uploaded,
    /// Last attempt failed; retry is possible
    Error,
}

impl UploadStatus {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Error => "error",
        }
    }

    /// True while an upload is in flight
    #[inline]
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Uploading)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "uploading" => Ok(Self::Uploading),
            "uploaded" => Ok(Self::Uploaded),
            "error" => Ok(Self::Error),
            other => Err(ModelError::UnknownUploadStatus(other.to_string())),
        }
    }
}
