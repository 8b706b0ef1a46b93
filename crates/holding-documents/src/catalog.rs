//! Per-user recommendation catalog

use holding_model::{DocumentCategory, DocumentKey, DocumentRecommendation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Recommendations keyed by document key, in arrival order
///
/// Duplicate keys are dropped; the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCatalog {
    entries: Vec<DocumentRecommendation>,
}

impl DocumentCatalog {
    /// Build from recommendations, deduplicating by key
    #[must_use]
    pub fn from_recommendations(recommendations: impl IntoIterator<Item = DocumentRecommendation>) -> Self {
        let mut catalog = Self::default();
        catalog.extend(recommendations);
        catalog
    }

    /// Add recommendations whose key is not yet present
    pub fn extend(&mut self, recommendations: impl IntoIterator<Item = DocumentRecommendation>) {
        let mut seen: HashSet<DocumentKey> = self.entries.iter().map(|r| r.document_key.clone()).collect();
        for rec in recommendations {
            if seen.insert(rec.document_key.clone()) {
                self.entries.push(rec);
            }
        }
    }

    /// Lookup by key
    #[must_use]
    pub fn get(&self, key: &DocumentKey) -> Option<&DocumentRecommendation> {
        self.entries.iter().find(|r| &r.document_key == key)
    }

    /// Check membership
    #[must_use]
    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.get(key).is_some()
    }

    /// Keys in catalog order
    #[must_use]
    pub fn keys(&self) -> Vec<DocumentKey> {
        self.entries.iter().map(|r| r.document_key.clone()).collect()
    }

    /// Distinct categories
    #[must_use]
    pub fn categories(&self) -> BTreeSet<DocumentCategory> {
        self.entries.iter().map(|r| r.category.clone()).collect()
    }

    /// Iterate recommendations
    pub fn iter(&self) -> impl Iterator<Item = &DocumentRecommendation> {
        self.entries.iter()
    }

    /// Recommendations as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[DocumentRecommendation] {
        &self.entries
    }

    /// Number of distinct documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<DocumentRecommendation> for DocumentCatalog {
    fn from_iter<I: IntoIterator<Item = DocumentRecommendation>>(iter: I) -> Self {
        Self::from_recommendations(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, key: &str, category: &str) -> DocumentRecommendation {
        DocumentRecommendation::builder(id, key, category, key).build()
    }

    #[test]
    fn first_occurrence_wins() {
        let catalog = DocumentCatalog::from_recommendations([
            rec("rec_1", "doc_a", "pessoal"),
            rec("rec_2", "doc_b", "imovel"),
            rec("rec_3", "doc_a", "empresa"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(&DocumentKey::from("doc_a")).unwrap().recommendation_id.as_str(), "rec_1");
        assert_eq!(catalog.keys(), vec![DocumentKey::from("doc_a"), DocumentKey::from("doc_b")]);
    }

    #[test]
    fn extend_keeps_existing_entries() {
        let mut catalog: DocumentCatalog = [rec("rec_1", "doc_a", "pessoal")].into_iter().collect();
        catalog.extend([rec("rec_9", "doc_a", "pessoal"), rec("rec_2", "doc_c", "pessoal")]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(&DocumentKey::from("doc_a")).unwrap().recommendation_id.as_str(), "rec_1");
        assert!(catalog.contains(&DocumentKey::from("doc_c")));
        assert_eq!(catalog.categories().len(), 1);
    }
}
