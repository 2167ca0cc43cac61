//! Dealing phase of the DKG round.

use rand::rngs::OsRng;
use tracing::{debug, info, warn};

use dkg_crypto::{
    ecies_encrypt, evaluate_polynomial, generate_commitments, random_polynomial,
    scalar_to_be_bytes,
};
use dkg_types::{RoundInitiated, RoundParams, SubmitDealerPart};

use crate::boundary::TxSubmitter;
use crate::error::DkgError;

/// Produces and submits this node's dealer part when a round is initiated.
pub struct Dealer<C: TxSubmitter> {
    client: C,
    address: String,
}

impl<C: TxSubmitter> Dealer<C> {
    pub fn new(client: C, address: impl Into<String>) -> Self {
        Self {
            client,
            address: address.into(),
        }
    }

    /// Handle a round-initiated notification.
    ///
    /// A node that is not listed as a participant does no work and returns
    /// `Ok(())`. Otherwise this validates the round descriptor, generates
    /// the secret polynomial and its commitments, encrypts one share per
    /// (participant, slot), and makes exactly one submission call.
    pub fn process_round_initiated(&self, event: &RoundInitiated) -> Result<(), DkgError> {
        let params = event.round_params();

        if params.participant_index(&self.address).is_none() {
            debug!(
                epoch_id = params.epoch_id,
                address = %self.address,
                "not a participant in this round"
            );
            return Ok(());
        }

        params
            .validate()
            .map_err(|e| DkgError::Configuration(e.to_string()))?;

        info!(
            epoch_id = params.epoch_id,
            total_slots = params.total_slots,
            degree = params.degree,
            participants = params.participants.len(),
            "dealing for DKG round"
        );

        let part = self.generate_dealer_part(&params)?;
        self.client.submit_dealer_part(&part)?;

        info!(epoch_id = params.epoch_id, dealer = %self.address, "submitted dealer part");
        Ok(())
    }

    /// Build the dealer part for a validated round descriptor.
    ///
    /// The secret polynomial lives only inside this call; it is dropped as
    /// soon as the part is assembled.
    fn generate_dealer_part(&self, params: &RoundParams) -> Result<SubmitDealerPart, DkgError> {
        let polynomial = random_polynomial(params.degree)?;
        let commitments: Vec<Vec<u8>> = generate_commitments(&polynomial)
            .into_iter()
            .map(|point| point.0.to_vec())
            .collect();

        let mut rng = OsRng;
        let mut per_participant = Vec::with_capacity(params.participants.len());

        for (participant_index, participant) in params.participants.iter().enumerate() {
            let num_slots = participant.num_slots();
            let mut encrypted_shares = Vec::with_capacity(num_slots as usize);
            let mut failed = false;

            for slot_offset in 0..num_slots {
                let slot_index = participant.slot_start + slot_offset;
                let share = evaluate_polynomial(&polynomial, slot_index);

                match ecies_encrypt(
                    &participant.encryption_pub_key,
                    &scalar_to_be_bytes(&share),
                    &mut rng,
                ) {
                    Ok(ciphertext) => encrypted_shares.push(ciphertext),
                    Err(err) => {
                        // Scoped to this participant: everyone else still
                        // gets shares and the part is still submitted.
                        warn!(
                            epoch_id = params.epoch_id,
                            participant_index,
                            participant = %participant.address,
                            slot_index,
                            error = %err,
                            "share encryption failed, skipping participant"
                        );
                        failed = true;
                        break;
                    }
                }
            }

            if failed {
                per_participant.push(Vec::new());
            } else {
                debug!(
                    epoch_id = params.epoch_id,
                    participant_index,
                    participant = %participant.address,
                    num_shares = encrypted_shares.len(),
                    "encrypted shares for participant"
                );
                per_participant.push(encrypted_shares);
            }
        }

        Ok(SubmitDealerPart {
            epoch_id: params.epoch_id,
            creator: self.address.clone(),
            commitments,
            per_participant_shares: per_participant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use k256::elliptic_curve::sec1::ToEncodedPoint;
    use k256::SecretKey;

    use crate::boundary::SubmitError;
    use dkg_types::{ParticipantInfo, SubmitVerificationVector, COMPRESSED_G2_LEN};

    #[derive(Default)]
    struct RecordingClient {
        dealer_parts: Mutex<Vec<SubmitDealerPart>>,
    }

    impl TxSubmitter for RecordingClient {
        fn submit_dealer_part(&self, part: &SubmitDealerPart) -> Result<(), SubmitError> {
            self.dealer_parts.lock().unwrap().push(part.clone());
            Ok(())
        }

        fn submit_verification_vector(
            &self,
            _vector: &SubmitVerificationVector,
        ) -> Result<(), SubmitError> {
            Ok(())
        }
    }

    fn encryption_key() -> Vec<u8> {
        SecretKey::random(&mut rand::rngs::OsRng)
            .public_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    fn round(participants: Vec<ParticipantInfo>, total_slots: u32) -> RoundInitiated {
        RoundInitiated {
            epoch_id: 1,
            total_slots,
            degree: 2,
            participants,
        }
    }

    fn participant(address: &str, slot_start: u32, slot_end: u32) -> ParticipantInfo {
        ParticipantInfo {
            address: address.to_string(),
            encryption_pub_key: encryption_key(),
            slot_start,
            slot_end,
        }
    }

    #[test]
    fn test_dealer_part_shape() {
        let client = RecordingClient::default();
        let event = round(
            vec![participant("alice", 0, 1), participant("bob", 2, 4)],
            5,
        );

        Dealer::new(&client, "alice")
            .process_round_initiated(&event)
            .unwrap();

        let parts = client.dealer_parts.lock().unwrap();
        assert_eq!(parts.len(), 1);

        let part = &parts[0];
        assert_eq!(part.epoch_id, 1);
        assert_eq!(part.creator, "alice");
        assert_eq!(part.commitments.len(), 3); // degree + 1
        assert!(part.commitments.iter().all(|c| c.len() == COMPRESSED_G2_LEN));
        assert_eq!(part.per_participant_shares.len(), 2);
        assert_eq!(part.per_participant_shares[0].len(), 2);
        assert_eq!(part.per_participant_shares[1].len(), 3);
    }

    #[test]
    fn test_non_participant_does_nothing() {
        let client = RecordingClient::default();
        let event = round(vec![participant("alice", 0, 4)], 5);

        Dealer::new(&client, "mallory")
            .process_round_initiated(&event)
            .unwrap();

        assert!(client.dealer_parts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_round_is_configuration_error() {
        let client = RecordingClient::default();
        // alice's range leaves slot 4 unassigned
        let event = round(vec![participant("alice", 0, 3)], 5);

        let err = Dealer::new(&client, "alice")
            .process_round_initiated(&event)
            .unwrap_err();

        assert!(matches!(err, DkgError::Configuration(_)));
        assert!(client.dealer_parts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bad_participant_key_skips_only_that_participant() {
        let client = RecordingClient::default();
        let mut bob = participant("bob", 2, 4);
        bob.encryption_pub_key = vec![0xff; 10];
        let event = round(vec![participant("alice", 0, 1), bob], 5);

        Dealer::new(&client, "alice")
            .process_round_initiated(&event)
            .unwrap();

        let parts = client.dealer_parts.lock().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].per_participant_shares[0].len(), 2);
        assert!(parts[0].per_participant_shares[1].is_empty());
    }
}
