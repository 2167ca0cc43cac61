//! End-to-end tests for the BLS DKG sidecar core.
//!
//! These tests run a full round against real cryptography:
//! 1. Every participant deals: polynomial, commitments, ECIES-encrypted
//!    shares per (participant, slot)
//! 2. A verifier node decrypts and verifies the shares for its slots
//! 3. The round completes and the local result is sealed
//!
//! The chain is replaced by an in-memory submitter that records dealer
//! parts and verification vectors; the key store is replaced by a local
//! secp256k1 key.

use std::sync::{Arc, Mutex};

use bls12_381::Scalar;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use rand::rngs::OsRng;

use dkg_crypto::{
    ecies_decrypt, ecies_encrypt, evaluate_polynomial, generate_commitments, random_polynomial,
    scalar_to_be_bytes,
};
use dkg_node::{
    DecryptionError, Dealer, ShareDecryptor, SubmitError, TxSubmitter, VerificationCache, Verifier,
};
use dkg_types::{
    DealerPart, DkgPhase, ParticipantInfo, RoundCompleted, RoundData, RoundInitiated, RoundParams,
    SubmitDealerPart, SubmitVerificationVector, VerifyingPhaseStarted, COMPRESSED_G2_LEN,
};

/// In-memory stand-in for the transaction collaborator.
#[derive(Default)]
struct MockChain {
    dealer_parts: Mutex<Vec<SubmitDealerPart>>,
    vectors: Mutex<Vec<SubmitVerificationVector>>,
}

impl TxSubmitter for MockChain {
    fn submit_dealer_part(&self, part: &SubmitDealerPart) -> Result<(), SubmitError> {
        self.dealer_parts.lock().unwrap().push(part.clone());
        Ok(())
    }

    fn submit_verification_vector(
        &self,
        vector: &SubmitVerificationVector,
    ) -> Result<(), SubmitError> {
        self.vectors.lock().unwrap().push(vector.clone());
        Ok(())
    }
}

/// Key-store stand-in backed by a local secp256k1 key.
struct LocalKeyDecryptor {
    secret_key: SecretKey,
}

impl ShareDecryptor for LocalKeyDecryptor {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        ecies_decrypt(&self.secret_key, ciphertext).map_err(|e| DecryptionError(e.to_string()))
    }
}

struct TestNode {
    address: String,
    secret_key: SecretKey,
}

impl TestNode {
    fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            secret_key: SecretKey::random(&mut OsRng),
        }
    }

    fn encryption_pub_key(&self) -> Vec<u8> {
        self.secret_key
            .public_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

/// Round of three participants owning slots [0,1], [2,4], [5,6].
fn three_node_round(epoch_id: u64, degree: u32) -> (Vec<TestNode>, RoundParams) {
    let nodes = vec![TestNode::new("node-0"), TestNode::new("node-1"), TestNode::new("node-2")];
    let ranges = [(0u32, 1u32), (2, 4), (5, 6)];

    let participants = nodes
        .iter()
        .zip(ranges)
        .map(|(node, (slot_start, slot_end))| ParticipantInfo {
            address: node.address.clone(),
            encryption_pub_key: node.encryption_pub_key(),
            slot_start,
            slot_end,
        })
        .collect();

    let params = RoundParams {
        epoch_id,
        total_slots: 7,
        degree,
        participants,
    };
    (nodes, params)
}

/// Run the dealing phase for every node and collect the submitted parts.
fn deal_all(nodes: &[TestNode], params: &RoundParams) -> Vec<DealerPart> {
    let chain = MockChain::default();
    let event = RoundInitiated {
        epoch_id: params.epoch_id,
        total_slots: params.total_slots,
        degree: params.degree,
        participants: params.participants.clone(),
    };

    for node in nodes {
        Dealer::new(&chain, node.address.clone())
            .process_round_initiated(&event)
            .unwrap();
    }

    let parts = chain.dealer_parts.lock().unwrap();
    assert_eq!(parts.len(), nodes.len());
    parts.iter().cloned().map(DealerPart::from).collect()
}

fn verifying_event(
    params: &RoundParams,
    dealer_parts: Vec<Option<DealerPart>>,
) -> VerifyingPhaseStarted {
    VerifyingPhaseStarted {
        epoch_id: params.epoch_id,
        deadline_block: 1000,
        round_data: RoundData {
            params: params.clone(),
            phase: DkgPhase::Verifying,
            dealer_parts,
            valid_dealers: None,
            group_public_key: None,
        },
    }
}

fn verifier_for<'a>(
    node: &TestNode,
    chain: &'a MockChain,
) -> Verifier<&'a MockChain, LocalKeyDecryptor> {
    Verifier::new(
        chain,
        LocalKeyDecryptor {
            secret_key: node.secret_key.clone(),
        },
        node.address.clone(),
        Arc::new(VerificationCache::new()),
    )
}

#[test]
fn test_full_round_all_dealers_valid() {
    let (nodes, params) = three_node_round(1, 2);
    let parts = deal_all(&nodes, &params);

    // Every dealer produced degree+1 commitments and the right share counts
    for part in &parts {
        assert_eq!(part.commitments.len(), 3);
        assert!(part.commitments.iter().all(|c| c.len() == COMPRESSED_G2_LEN));
        assert_eq!(part.per_participant[0].len(), 2);
        assert_eq!(part.per_participant[1].len(), 3);
        assert_eq!(part.per_participant[2].len(), 2);
    }

    let event = verifying_event(&params, parts.into_iter().map(Some).collect());

    // node-1 owns slots [2, 4]
    let chain = MockChain::default();
    let verifier = verifier_for(&nodes[1], &chain);
    verifier.process_verifying_phase_started(&event).unwrap();

    let result = verifier.cache().get(1).unwrap();
    assert_eq!(result.phase, DkgPhase::Verifying);
    assert_eq!(result.slot_range, (2, 4));
    assert_eq!(result.dealer_validity, vec![true, true, true]);

    // Aggregated shares are the sum of every dealer's share per slot
    for slot_offset in 0..3 {
        let expected: Scalar = result
            .dealer_shares
            .iter()
            .map(|shares| shares[slot_offset])
            .sum();
        assert_eq!(result.aggregated_shares[slot_offset], expected);
    }

    let vectors = chain.vectors.lock().unwrap();
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0].epoch_id, 1);
    assert_eq!(vectors[0].dealer_validity, vec![true, true, true]);
}

#[test]
fn test_corrupted_commitment_invalidates_single_dealer() {
    // Scenario: degree 2, 3 dealers; dealer #1's first commitment byte is
    // corrupted. Dealer #1 must be invalid for all slots and the aggregate
    // must equal the sum over dealers #0 and #2 only.
    let (nodes, params) = three_node_round(1, 2);
    let mut parts = deal_all(&nodes, &params);
    parts[1].commitments[0][0] ^= 0x01;

    let event = verifying_event(&params, parts.into_iter().map(Some).collect());

    let chain = MockChain::default();
    let verifier = verifier_for(&nodes[1], &chain);
    verifier.process_verifying_phase_started(&event).unwrap();

    let result = verifier.cache().get(1).unwrap();
    assert_eq!(result.dealer_validity, vec![true, false, true]);
    assert!(result.dealer_shares[1].is_empty());

    for slot_offset in 0..3 {
        let expected = result.dealer_shares[0][slot_offset] + result.dealer_shares[2][slot_offset];
        assert_eq!(result.aggregated_shares[slot_offset], expected);
    }

    let vectors = chain.vectors.lock().unwrap();
    assert_eq!(vectors[0].dealer_validity, vec![true, false, true]);
}

#[test]
fn test_missing_participant_entry_invalidates_dealer() {
    // Scenario: the verifier owns slots [2, 4]; dealer #0's entry for this
    // participant is empty. Dealer #0 is invalid, the others verify fine.
    let (nodes, params) = three_node_round(1, 2);
    let mut parts = deal_all(&nodes, &params);
    parts[0].per_participant[1] = Vec::new();

    let event = verifying_event(&params, parts.into_iter().map(Some).collect());

    let chain = MockChain::default();
    let verifier = verifier_for(&nodes[1], &chain);
    verifier.process_verifying_phase_started(&event).unwrap();

    let result = verifier.cache().get(1).unwrap();
    assert_eq!(result.dealer_validity, vec![false, true, true]);

    for slot_offset in 0..3 {
        let expected = result.dealer_shares[1][slot_offset] + result.dealer_shares[2][slot_offset];
        assert_eq!(result.aggregated_shares[slot_offset], expected);
    }
}

#[test]
fn test_share_swapped_across_dealers_is_rejected() {
    // A share consistent with dealer #2's polynomial must not verify
    // against dealer #0's commitments.
    let (nodes, params) = three_node_round(1, 2);
    let mut parts = deal_all(&nodes, &params);

    let stolen = parts[2].per_participant[1][0].clone();
    parts[0].per_participant[1][0] = stolen;

    let event = verifying_event(&params, parts.into_iter().map(Some).collect());

    let chain = MockChain::default();
    let verifier = verifier_for(&nodes[1], &chain);
    verifier.process_verifying_phase_started(&event).unwrap();

    let result = verifier.cache().get(1).unwrap();
    assert_eq!(result.dealer_validity, vec![false, true, true]);
}

#[test]
fn test_non_participant_node_ignores_round() {
    let (nodes, params) = three_node_round(1, 2);
    let parts = deal_all(&nodes, &params);
    let event = verifying_event(&params, parts.into_iter().map(Some).collect());

    let outsider = TestNode::new("outsider");
    let chain = MockChain::default();
    let verifier = verifier_for(&outsider, &chain);
    verifier.process_verifying_phase_started(&event).unwrap();

    assert!(verifier.cache().get(1).is_none());
    assert!(chain.vectors.lock().unwrap().is_empty());
}

#[test]
fn test_round_completion_and_idempotence() {
    let (nodes, params) = three_node_round(1, 2);
    let parts = deal_all(&nodes, &params);
    let event = verifying_event(&params, parts.clone().into_iter().map(Some).collect());

    let chain = MockChain::default();
    let verifier = verifier_for(&nodes[1], &chain);
    verifier.process_verifying_phase_started(&event).unwrap();

    let group_public_key = vec![7u8; COMPRESSED_G2_LEN];
    let completed = RoundCompleted {
        epoch_id: 1,
        round_data: RoundData {
            params: params.clone(),
            phase: DkgPhase::Completed,
            dealer_parts: parts.into_iter().map(Some).collect(),
            valid_dealers: Some(vec![true, true, false]),
            group_public_key: Some(group_public_key.clone()),
        },
    };

    verifier.process_round_completed(&completed).unwrap();
    let sealed = verifier.cache().get(1).unwrap();
    assert_eq!(sealed.phase, DkgPhase::Completed);
    assert_eq!(sealed.valid_dealers, vec![true, true, false]);
    assert_eq!(sealed.group_public_key, Some(group_public_key));
    // Local validity is untouched by the consensus vector
    assert_eq!(sealed.dealer_validity, vec![true, true, true]);

    // At-least-once delivery: a repeat leaves the result byte-for-byte
    // identical and submits nothing new.
    verifier.process_round_completed(&completed).unwrap();
    assert_eq!(verifier.cache().get(1).unwrap(), sealed);
    assert_eq!(chain.vectors.lock().unwrap().len(), 1);
}

#[test]
fn test_completion_after_missed_verifying_phase() {
    // The node never saw the verifying-phase notification; the completion
    // event is self-contained and verification runs from its round data.
    let (nodes, params) = three_node_round(2, 1);
    let parts = deal_all(&nodes, &params);

    let completed = RoundCompleted {
        epoch_id: 2,
        round_data: RoundData {
            params: params.clone(),
            phase: DkgPhase::Completed,
            dealer_parts: parts.into_iter().map(Some).collect(),
            valid_dealers: Some(vec![true, true, true]),
            group_public_key: Some(vec![3u8; COMPRESSED_G2_LEN]),
        },
    };

    let chain = MockChain::default();
    let verifier = verifier_for(&nodes[0], &chain);
    verifier.process_round_completed(&completed).unwrap();

    let result = verifier.cache().get(2).unwrap();
    assert_eq!(result.phase, DkgPhase::Completed);
    assert_eq!(result.dealer_validity, vec![true, true, true]);
    assert_eq!(result.slot_range, (0, 1));
}

#[test]
fn test_cache_rotates_across_epochs() {
    let chain = MockChain::default();
    let cache = Arc::new(VerificationCache::new());

    for epoch_id in [3u64, 4, 5] {
        let (nodes, params) = three_node_round(epoch_id, 1);
        let parts = deal_all(&nodes, &params);
        let event = verifying_event(&params, parts.into_iter().map(Some).collect());

        let verifier = Verifier::new(
            &chain,
            LocalKeyDecryptor {
                secret_key: nodes[0].secret_key.clone(),
            },
            nodes[0].address.clone(),
            Arc::clone(&cache),
        );
        verifier.process_verifying_phase_started(&event).unwrap();
    }

    assert_eq!(cache.cached_epochs(), vec![4, 5]);
    assert!(cache.get(3).is_none());
    assert_eq!(cache.get_current().unwrap().epoch_id, 5);
}

#[test]
fn test_aggregate_matches_polynomial_sum() {
    // Aggregation invariant against known polynomials: dealer parts are
    // built by hand so the verifier's aggregate can be compared with
    // Σ p_i(slot) over the dealers directly.
    let (nodes, params) = three_node_round(1, 2);
    let polynomials: Vec<Vec<Scalar>> = (0..3).map(|_| random_polynomial(2).unwrap()).collect();

    let parts: Vec<Option<DealerPart>> = polynomials
        .iter()
        .enumerate()
        .map(|(dealer_index, polynomial)| {
            let commitments = generate_commitments(polynomial)
                .into_iter()
                .map(|point| point.0.to_vec())
                .collect();
            let per_participant = params
                .participants
                .iter()
                .map(|p| {
                    (p.slot_start..=p.slot_end)
                        .map(|slot| {
                            let share = evaluate_polynomial(polynomial, slot);
                            ecies_encrypt(
                                &p.encryption_pub_key,
                                &scalar_to_be_bytes(&share),
                                &mut OsRng,
                            )
                            .unwrap()
                        })
                        .collect()
                })
                .collect();
            Some(DealerPart {
                epoch_id: params.epoch_id,
                dealer_address: format!("dealer-{dealer_index}"),
                commitments,
                per_participant,
            })
        })
        .collect();

    let event = verifying_event(&params, parts);

    let chain = MockChain::default();
    let verifier = verifier_for(&nodes[1], &chain);
    verifier.process_verifying_phase_started(&event).unwrap();

    let result = verifier.cache().get(1).unwrap();
    assert_eq!(result.dealer_validity, vec![true, true, true]);

    for (slot_offset, slot) in (2u32..=4).enumerate() {
        let expected: Scalar = polynomials
            .iter()
            .map(|poly| evaluate_polynomial(poly, slot))
            .sum();
        assert_eq!(result.aggregated_shares[slot_offset], expected);
    }
}
