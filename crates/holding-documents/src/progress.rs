//! Upload progress aggregation
//!
//! Pure and I/O free: the same catalog and status map always give the same
//! report.

use crate::status::StatusMap;
use holding_model::{DocumentCategory, DocumentKey, DocumentRecommendation, UploadStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Uploaded count out of a total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    /// Documents with status `uploaded`
    pub uploaded: usize,
    /// Documents counted
    pub total: usize,
}

impl Tally {
    /// Rounded percentage, 0 when empty
    #[must_use]
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation)]
        let pct = ((self.uploaded * 100 + self.total / 2) / self.total) as u8;
        pct.min(100)
    }

    /// Every counted document is uploaded
    #[must_use]
    pub fn is_complete(self) -> bool {
        self.uploaded == self.total
    }

    fn count(&mut self, uploaded: bool) {
        self.total += 1;
        if uploaded {
            self.uploaded += 1;
        }
    }
}

/// Progress of a user's document collection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Per category, from the catalog
    pub per_category: BTreeMap<DocumentCategory, Tally>,
    /// All documents known to the catalog or the status map
    pub overall: Tally,
    /// Mandatory documents only
    pub mandatory: Tally,
}

impl ProgressReport {
    /// Tally for one category
    #[must_use]
    pub fn category(&self, category: &DocumentCategory) -> Tally {
        self.per_category.get(category).copied().unwrap_or_default()
    }
}

/// Computes [`ProgressReport`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressAggregator;

impl ProgressAggregator {
    /// Aggregate `statuses` over `catalog`
    ///
    /// `overall.uploaded` is exactly the number of `uploaded` entries in
    /// `statuses`; `overall.total` covers keys from either input. Catalog
    /// duplicates count once.
    #[must_use]
    pub fn aggregate(catalog: &[DocumentRecommendation], statuses: &StatusMap) -> ProgressReport {
        let mut report = ProgressReport::default();
        let mut seen: HashSet<&DocumentKey> = HashSet::with_capacity(catalog.len());

        for rec in catalog {
            if !seen.insert(&rec.document_key) {
                continue;
            }
            let uploaded = statuses.get(&rec.document_key) == Some(&UploadStatus::Uploaded);
            report
                .per_category
                .entry(rec.category.clone())
                .or_default()
                .count(uploaded);
            if rec.mandatory {
                report.mandatory.count(uploaded);
            }
        }

        report.overall.uploaded = statuses.values().filter(|s| **s == UploadStatus::Uploaded).count();
        report.overall.total = seen.len() + statuses.keys().filter(|k| !seen.contains(k)).count();
        report
    }
}
