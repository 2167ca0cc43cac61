//! Epoch-indexed verification state with bounded retention.

use std::collections::HashMap;
use std::sync::Mutex;

use bls12_381::Scalar;
use tracing::debug;

use dkg_types::DkgPhase;

/// Verification state for one epoch, from the local participant's view.
///
/// Created when this node first processes a verifying-phase notification
/// for an epoch it participates in, mutated in place while dealer parts are
/// processed, and sealed exactly once on round completion. Invariants:
/// `aggregated_shares[s]` is the sum of `dealer_shares[d][s]` over dealers
/// with `dealer_validity[d]`; `group_public_key` is set iff the phase is
/// `Completed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub epoch_id: u64,
    pub phase: DkgPhase,
    pub is_participant: bool,
    /// Local participant's slot range, inclusive
    pub slot_range: (u32, u32),
    /// Per-dealer shares for our slots; empty for invalid dealers
    pub dealer_shares: Vec<Vec<Scalar>>,
    /// Dealer-indexed validity as judged locally
    pub dealer_validity: Vec<bool>,
    /// Slot-indexed sum of shares from locally valid dealers
    pub aggregated_shares: Vec<Scalar>,
    /// Consensus validity vector, set only at `Completed`
    pub valid_dealers: Vec<bool>,
    /// Published group public key (96 bytes), set only at `Completed`
    pub group_public_key: Option<Vec<u8>>,
}

/// Cache of verification results, retaining at most two epochs.
///
/// Shared across worker threads via `Arc`; interior locking makes `store`
/// safe against concurrent lookups for other epochs. State is volatile and
/// does not survive a restart.
#[derive(Debug, Default)]
pub struct VerificationCache {
    results: Mutex<HashMap<u64, VerificationResult>>,
}

impl VerificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the result for its epoch, then drop epoch `E - 2`
    /// if present.
    pub fn store(&self, result: VerificationResult) {
        let epoch_id = result.epoch_id;
        let mut results = self.results.lock().expect("verification cache poisoned");

        results.insert(epoch_id, result);

        if let Some(stale) = epoch_id.checked_sub(2) {
            if results.remove(&stale).is_some() {
                debug!(
                    removed_epoch = stale,
                    current_epoch = epoch_id,
                    "evicted old verification result"
                );
            }
        }

        debug!(epoch_id, cached_epochs = results.len(), "stored verification result");
    }

    /// Result for a specific epoch, if cached.
    pub fn get(&self, epoch_id: u64) -> Option<VerificationResult> {
        self.results
            .lock()
            .expect("verification cache poisoned")
            .get(&epoch_id)
            .cloned()
    }

    /// Result for the highest cached epoch.
    pub fn get_current(&self) -> Option<VerificationResult> {
        self.results
            .lock()
            .expect("verification cache poisoned")
            .iter()
            .max_by_key(|(epoch_id, _)| **epoch_id)
            .map(|(_, result)| result.clone())
    }

    /// All cached epoch ids, ascending.
    pub fn cached_epochs(&self) -> Vec<u64> {
        let mut epochs: Vec<u64> = self
            .results
            .lock()
            .expect("verification cache poisoned")
            .keys()
            .copied()
            .collect();
        epochs.sort_unstable();
        epochs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(epoch_id: u64) -> VerificationResult {
        VerificationResult {
            epoch_id,
            phase: DkgPhase::Verifying,
            is_participant: true,
            slot_range: (0, 1),
            dealer_shares: vec![],
            dealer_validity: vec![],
            aggregated_shares: vec![],
            valid_dealers: vec![],
            group_public_key: None,
        }
    }

    #[test]
    fn test_store_and_get() {
        let cache = VerificationCache::new();
        cache.store(result(1));

        assert_eq!(cache.get(1).unwrap().epoch_id, 1);
        assert!(cache.get(2).is_none());
    }

    #[test]
    fn test_eviction_keeps_two_epochs() {
        let cache = VerificationCache::new();
        cache.store(result(3));
        cache.store(result(4));
        assert_eq!(cache.cached_epochs(), vec![3, 4]);

        cache.store(result(5));
        assert_eq!(cache.cached_epochs(), vec![4, 5]);
        assert!(cache.get(3).is_none());
    }

    #[test]
    fn test_get_current_is_highest_epoch() {
        let cache = VerificationCache::new();
        assert!(cache.get_current().is_none());

        cache.store(result(7));
        cache.store(result(6));
        assert_eq!(cache.get_current().unwrap().epoch_id, 7);
    }

    #[test]
    fn test_store_is_upsert() {
        let cache = VerificationCache::new();
        cache.store(result(2));

        let mut updated = result(2);
        updated.phase = DkgPhase::Completed;
        updated.group_public_key = Some(vec![0u8; 96]);
        cache.store(updated);

        let cached = cache.get(2).unwrap();
        assert_eq!(cached.phase, DkgPhase::Completed);
        assert_eq!(cache.cached_epochs(), vec![2]);
    }

    #[test]
    fn test_low_epochs_do_not_underflow() {
        let cache = VerificationCache::new();
        cache.store(result(0));
        cache.store(result(1));
        assert_eq!(cache.cached_epochs(), vec![0, 1]);
    }
}
