//! Verifying phase and finalization of the DKG round.

use std::sync::Arc;

use bls12_381::Scalar;
use ff::Field;
use tracing::{debug, info, warn};

use dkg_crypto::{scalar_from_be_bytes, verify_share, CryptoError};
use dkg_types::{
    DkgPhase, RoundCompleted, RoundData, SubmitVerificationVector, VerifyingPhaseStarted,
    COMPRESSED_G2_LEN, SHARE_LEN,
};

use crate::boundary::{ShareDecryptor, TxSubmitter};
use crate::cache::{VerificationCache, VerificationResult};
use crate::error::DkgError;

/// Decrypts, verifies, and aggregates the shares addressed to this node's
/// slots, and tracks per-epoch verification state.
///
/// Every handler is idempotent: at-least-once delivery of the same
/// notification leaves the cached state unchanged.
pub struct Verifier<C: TxSubmitter, D: ShareDecryptor> {
    client: C,
    decryptor: D,
    address: String,
    cache: Arc<VerificationCache>,
}

impl<C: TxSubmitter, D: ShareDecryptor> Verifier<C, D> {
    pub fn new(
        client: C,
        decryptor: D,
        address: impl Into<String>,
        cache: Arc<VerificationCache>,
    ) -> Self {
        Self {
            client,
            decryptor,
            address: address.into(),
            cache,
        }
    }

    /// Shared handle to the verification-state cache.
    pub fn cache(&self) -> &Arc<VerificationCache> {
        &self.cache
    }

    /// Handle a verifying-phase notification.
    ///
    /// Runs the verification algorithm once per epoch, stores the result,
    /// and submits the dealer-validity vector. Re-delivery, not being a
    /// participant, and phase mismatches are quiet no-ops.
    pub fn process_verifying_phase_started(
        &self,
        event: &VerifyingPhaseStarted,
    ) -> Result<(), DkgError> {
        let epoch_id = event.epoch_id;

        if let Some(existing) = self.cache.get(epoch_id) {
            if matches!(existing.phase, DkgPhase::Verifying | DkgPhase::Completed) {
                debug!(epoch_id, phase = ?existing.phase, "verification already performed");
                return Ok(());
            }
        }

        let round = &event.round_data;

        if round.params.participant_index(&self.address).is_none() {
            info!(
                epoch_id,
                address = %self.address,
                participants = round.params.participants.len(),
                "not a participant in this round"
            );
            return Ok(());
        }

        if round.phase != DkgPhase::Verifying {
            info!(epoch_id, phase = ?round.phase, "round not in verifying phase, ignoring");
            return Ok(());
        }

        round
            .params
            .validate()
            .map_err(|e| DkgError::Configuration(e.to_string()))?;

        let result = match self.run_verification(epoch_id, round) {
            Some(result) => result,
            None => return Ok(()),
        };
        let dealer_validity = result.dealer_validity.clone();
        self.cache.store(result);

        self.client
            .submit_verification_vector(&SubmitVerificationVector {
                epoch_id,
                creator: self.address.clone(),
                dealer_validity,
            })?;

        info!(epoch_id, "submitted verification vector");
        Ok(())
    }

    /// Handle a round-completed notification.
    ///
    /// Seals the cached result with the consensus validity vector and group
    /// public key. If this node missed the verifying-phase notification, the
    /// verification algorithm runs from the event's self-contained round
    /// data; no chain query is made.
    pub fn process_round_completed(&self, event: &RoundCompleted) -> Result<(), DkgError> {
        let epoch_id = event.epoch_id;

        if let Some(existing) = self.cache.get(epoch_id) {
            if existing.phase == DkgPhase::Completed {
                debug!(epoch_id, "round already finalized");
                return Ok(());
            }
        }

        let round = &event.round_data;

        let group_public_key = round.group_public_key.as_deref().unwrap_or(&[]);
        if group_public_key.len() != COMPRESSED_G2_LEN {
            return Err(CryptoError::InvalidGroupKeyLength(group_public_key.len()).into());
        }

        let mut result = match self.cache.get(epoch_id) {
            Some(result) if result.phase == DkgPhase::Verifying => result,
            _ => {
                if round.params.participant_index(&self.address).is_none() {
                    debug!(epoch_id, address = %self.address, "not a participant in this round");
                    return Ok(());
                }
                debug!(epoch_id, "no verifying-phase result cached, verifying from event data");
                round
                    .params
                    .validate()
                    .map_err(|e| DkgError::Configuration(e.to_string()))?;
                match self.run_verification(epoch_id, round) {
                    Some(result) => result,
                    None => return Ok(()),
                }
            }
        };

        result.phase = DkgPhase::Completed;
        result.valid_dealers = round.valid_dealers.clone().unwrap_or_default();
        result.group_public_key = Some(group_public_key.to_vec());

        info!(
            epoch_id,
            group_public_key = %hex::encode(group_public_key),
            consensus_valid_dealers = result.valid_dealers.iter().filter(|v| **v).count(),
            "sealed verification result"
        );

        self.cache.store(result);
        Ok(())
    }

    /// Decrypt, verify, and aggregate the shares addressed to this node.
    ///
    /// Per-dealer all-or-nothing: any failing slot (absent part, missing or
    /// empty ciphertext, decryption error, wrong plaintext length, bad
    /// scalar, failed commitment check) invalidates that dealer's entire
    /// contribution and discards its partial shares. Returns `None` when
    /// this node is not a participant.
    fn run_verification(&self, epoch_id: u64, round: &RoundData) -> Option<VerificationResult> {
        let my_index = round.params.participant_index(&self.address)?;
        let me = &round.params.participants[my_index];
        let num_slots = me.num_slots() as usize;
        let num_dealers = round.dealer_parts.len();

        debug!(
            epoch_id,
            participant_index = my_index,
            slot_start = me.slot_start,
            slot_end = me.slot_end,
            num_dealers,
            "verifying dealer shares"
        );

        let mut dealer_shares: Vec<Vec<Scalar>> = vec![Vec::new(); num_dealers];
        let mut dealer_validity = vec![false; num_dealers];

        for (dealer_index, dealer_part) in round.dealer_parts.iter().enumerate() {
            let Some(dealer_part) = dealer_part else {
                debug!(epoch_id, dealer_index, "dealer part absent");
                continue;
            };

            let my_shares = match dealer_part.per_participant.get(my_index) {
                Some(shares) if !shares.is_empty() => shares,
                _ => {
                    warn!(epoch_id, dealer_index, "no shares addressed to this participant");
                    continue;
                }
            };

            let mut shares = vec![Scalar::ZERO; num_slots];
            let mut all_valid = true;

            for slot_offset in 0..num_slots {
                let slot_index = me.slot_start + slot_offset as u32;

                let Some(ciphertext) = my_shares.get(slot_offset) else {
                    warn!(epoch_id, dealer_index, slot_index, "missing ciphertext for slot");
                    all_valid = false;
                    break;
                };
                if ciphertext.is_empty() {
                    warn!(epoch_id, dealer_index, slot_index, "empty ciphertext for slot");
                    all_valid = false;
                    break;
                }

                let plaintext = match self.decryptor.decrypt(ciphertext) {
                    Ok(plaintext) => plaintext,
                    Err(err) => {
                        warn!(epoch_id, dealer_index, slot_index, error = %err, "share decryption failed");
                        all_valid = false;
                        break;
                    }
                };

                let plaintext: [u8; SHARE_LEN] = match plaintext.try_into() {
                    Ok(bytes) => bytes,
                    Err(bytes) => {
                        warn!(
                            epoch_id,
                            dealer_index,
                            slot_index,
                            len = bytes.len(),
                            "unexpected decrypted share length"
                        );
                        all_valid = false;
                        break;
                    }
                };

                let share = match scalar_from_be_bytes(&plaintext) {
                    Ok(share) => share,
                    Err(err) => {
                        warn!(epoch_id, dealer_index, slot_index, error = %err, "invalid share scalar");
                        all_valid = false;
                        break;
                    }
                };

                match verify_share(&share, slot_index, &dealer_part.commitments) {
                    Ok(true) => shares[slot_offset] = share,
                    Ok(false) => {
                        warn!(epoch_id, dealer_index, slot_index, "share verification failed");
                        all_valid = false;
                        break;
                    }
                    Err(err) => {
                        warn!(epoch_id, dealer_index, slot_index, error = %err, "malformed commitments");
                        all_valid = false;
                        break;
                    }
                }
            }

            dealer_validity[dealer_index] = all_valid;
            if all_valid {
                dealer_shares[dealer_index] = shares;
                debug!(epoch_id, dealer_index, "dealer contribution verified");
            }
            // Partial shares from an invalid dealer are discarded above by
            // leaving its entry empty.
        }

        let mut aggregated_shares = vec![Scalar::ZERO; num_slots];
        for (dealer_index, shares) in dealer_shares.iter().enumerate() {
            if !dealer_validity[dealer_index] {
                continue;
            }
            for (slot_offset, share) in shares.iter().enumerate() {
                aggregated_shares[slot_offset] += share;
            }
        }

        info!(
            epoch_id,
            valid_dealers = dealer_validity.iter().filter(|v| **v).count(),
            total_dealers = num_dealers,
            num_slots,
            "completed share verification and aggregation"
        );

        Some(VerificationResult {
            epoch_id,
            phase: DkgPhase::Verifying,
            is_participant: true,
            slot_range: (me.slot_start, me.slot_end),
            dealer_shares,
            dealer_validity,
            aggregated_shares,
            valid_dealers: Vec::new(),
            group_public_key: None,
        })
    }
}
