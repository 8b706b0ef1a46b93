//! In-session upload status board
//!
//! Each `(user, document_key)` slot tracks three independent facts: whether
//! durable upload evidence exists, which upload attempt (if any) is in flight,
//! and whether the last attempt failed. The visible [`UploadStatus`] is derived:
//!
//! | evidence | in flight | failed | status      |
//! |----------|-----------|--------|-------------|
//! | yes      | any       | any    | `uploaded`  |
//! | no       | yes       | any    | `uploading` |
//! | no       | no        | yes    | `error`     |
//! | no       | no        | no     | `pending`   |
//!
//! All slot changes for one user happen under that user's `DashMap` shard
//! lock, so the in-flight check and the claim are a single step.

use dashmap::DashMap;
use holding_model::{DocumentKey, UploadStatus, UserId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-document status snapshot
pub type StatusMap = BTreeMap<DocumentKey, UploadStatus>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Slot {
    evidence: bool,
    in_flight: Option<u64>,
    failed: bool,
}

impl Slot {
    fn status(self) -> UploadStatus {
        if self.evidence {
            UploadStatus::Uploaded
        } else if self.in_flight.is_some() {
            UploadStatus::Uploading
        } else if self.failed {
            UploadStatus::Error
        } else {
            UploadStatus::Pending
        }
    }
}

/// Claim on a slot returned by [`StatusBoard::begin`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an unfinished attempt keeps the slot in uploading"]
pub struct UploadAttempt {
    user: UserId,
    key: DocumentKey,
    id: u64,
}

impl UploadAttempt {
    /// Attempt number, unique for the board's lifetime
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Document being uploaded
    #[inline]
    #[must_use]
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }
}

/// Status slots for every user seen in this process
#[derive(Debug, Default)]
pub struct StatusBoard {
    slots: DashMap<UserId, HashMap<DocumentKey, Slot>>,
    next_attempt: AtomicU64,
}

impl StatusBoard {
    /// Empty board
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived status of one document
    #[must_use]
    pub fn status(&self, user: &UserId, key: &DocumentKey) -> UploadStatus {
        self.slots
            .get(user)
            .and_then(|slots| slots.get(key).copied())
            .unwrap_or_default()
            .status()
    }

    /// Check whether an attempt holds the slot
    #[must_use]
    pub fn is_in_flight(&self, user: &UserId, key: &DocumentKey) -> bool {
        self.slots
            .get(user)
            .and_then(|slots| slots.get(key).map(|s| s.in_flight.is_some()))
            .unwrap_or(false)
    }

    /// Claim the slot; `None` if another attempt already holds it
    pub fn begin(&self, user: &UserId, key: &DocumentKey) -> Option<UploadAttempt> {
        let mut slots = self.slots.entry(user.clone()).or_default();
        let slot = slots.entry(key.clone()).or_default();
        if slot.in_flight.is_some() {
            return None;
        }
        let id = self.next_attempt.fetch_add(1, Ordering::Relaxed) + 1;
        slot.in_flight = Some(id);
        slot.failed = false;
        Some(UploadAttempt {
            user: user.clone(),
            key: key.clone(),
            id,
        })
    }

    /// Apply a successful attempt; `false` if it was superseded
    pub fn finish_success(&self, attempt: UploadAttempt) -> bool {
        self.finish(&attempt, |slot| {
            slot.evidence = true;
            slot.failed = false;
        })
    }

    /// Apply a failed attempt; `false` if it was superseded
    pub fn finish_failure(&self, attempt: UploadAttempt) -> bool {
        self.finish(&attempt, |slot| slot.failed = true)
    }

    fn finish(&self, attempt: &UploadAttempt, apply: impl FnOnce(&mut Slot)) -> bool {
        let Some(mut slots) = self.slots.get_mut(&attempt.user) else {
            return false;
        };
        match slots.get_mut(&attempt.key) {
            Some(slot) if slot.in_flight == Some(attempt.id) => {
                slot.in_flight = None;
                apply(slot);
                true
            }
            _ => false,
        }
    }

    /// Mark a rejected attempt that never claimed the slot
    ///
    /// No effect while another attempt is in flight.
    pub fn mark_failed(&self, user: &UserId, key: &DocumentKey) {
        let mut slots = self.slots.entry(user.clone()).or_default();
        let slot = slots.entry(key.clone()).or_default();
        if slot.in_flight.is_none() {
            slot.failed = true;
        }
    }

    /// Release an in-flight claim without applying a result
    ///
    /// The abandoned attempt's eventual completion is ignored.
    pub fn abandon(&self, user: &UserId, key: &DocumentKey) -> bool {
        self.slots
            .get_mut(user)
            .and_then(|mut slots| slots.get_mut(key).and_then(|slot| slot.in_flight.take()))
            .is_some()
    }

    /// Record durable evidence for `keys`
    pub fn record_evidence<'a>(&self, user: &UserId, keys: impl IntoIterator<Item = &'a DocumentKey>) {
        let mut slots = self.slots.entry(user.clone()).or_default();
        for key in keys {
            slots.entry(key.clone()).or_default().evidence = true;
        }
    }

    /// Replace the evidence flag of every key in `keys` with membership in `evidence`
    ///
    /// In-flight claims and failure flags are kept.
    pub fn apply_evidence(&self, user: &UserId, keys: &[DocumentKey], evidence: &HashSet<DocumentKey>) {
        let mut slots = self.slots.entry(user.clone()).or_default();
        for key in keys {
            slots.entry(key.clone()).or_default().evidence = evidence.contains(key);
        }
    }

    /// Status of each key in `keys`
    #[must_use]
    pub fn snapshot(&self, user: &UserId, keys: &[DocumentKey]) -> StatusMap {
        let slots = self.slots.get(user);
        keys.iter()
            .map(|key| {
                let status = slots
                    .as_ref()
                    .and_then(|s| s.get(key).copied())
                    .unwrap_or_default()
                    .status();
                (key.clone(), status)
            })
            .collect()
    }

    /// Drop every slot of a user
    pub fn forget(&self, user: &UserId) {
        self.slots.remove(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (UserId, DocumentKey) {
        (UserId::from("u1"), DocumentKey::from("doc_a"))
    }

    #[test]
    fn untouched_slot_is_pending() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        assert_eq!(board.status(&user, &key), UploadStatus::Pending);
        assert!(!board.is_in_flight(&user, &key));
    }

    #[test]
    fn second_claim_is_refused() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        let first = board.begin(&user, &key).unwrap();
        assert!(board.begin(&user, &key).is_none());
        assert_eq!(board.status(&user, &key), UploadStatus::Uploading);

        assert!(board.finish_success(first));
        assert_eq!(board.status(&user, &key), UploadStatus::Uploaded);
        assert!(board.begin(&user, &key).is_some());
    }

    #[test]
    fn failure_shows_error_until_next_claim() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        let attempt = board.begin(&user, &key).unwrap();
        assert!(board.finish_failure(attempt));
        assert_eq!(board.status(&user, &key), UploadStatus::Error);

        let _retry = board.begin(&user, &key).unwrap();
        assert_eq!(board.status(&user, &key), UploadStatus::Uploading);
    }

    #[test]
    fn evidence_outranks_failure() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        board.record_evidence(&user, [&key]);
        let attempt = board.begin(&user, &key).unwrap();
        assert!(board.finish_failure(attempt));
        assert_eq!(board.status(&user, &key), UploadStatus::Uploaded);
    }

    #[test]
    fn abandoned_attempt_cannot_finish() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        let stale = board.begin(&user, &key).unwrap();
        assert!(board.abandon(&user, &key));
        let fresh = board.begin(&user, &key).unwrap();

        assert!(!board.finish_success(stale));
        assert_eq!(board.status(&user, &key), UploadStatus::Uploading);
        assert!(board.finish_success(fresh));
    }

    #[test]
    fn forget_drops_claims() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        let stale = board.begin(&user, &key).unwrap();
        board.forget(&user);
        assert!(!board.finish_failure(stale));
        assert_eq!(board.status(&user, &key), UploadStatus::Pending);
    }

    #[test]
    fn mark_failed_leaves_in_flight_alone() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        let attempt = board.begin(&user, &key).unwrap();
        board.mark_failed(&user, &key);
        assert_eq!(board.status(&user, &key), UploadStatus::Uploading);
        assert!(board.finish_success(attempt));
    }

    #[test]
    fn apply_evidence_keeps_in_flight() {
        let board = StatusBoard::new();
        let (user, key) = ids();
        let other = DocumentKey::from("doc_b");
        let _attempt = board.begin(&user, &key).unwrap();

        let evidence: HashSet<_> = [other.clone()].into_iter().collect();
        board.apply_evidence(&user, &[key.clone(), other.clone()], &evidence);

        let map = board.snapshot(&user, &[key.clone(), other.clone()]);
        assert_eq!(map[&key], UploadStatus::Uploading);
        assert_eq!(map[&other], UploadStatus::Uploaded);
    }
}
