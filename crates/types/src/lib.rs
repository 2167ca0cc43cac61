//! Core type definitions for the BLS DKG sidecar.
//!
//! This crate provides the data model shared across the sidecar: curve-point
//! wrappers, round descriptors, dealer parts, and the typed chain events the
//! host decodes at the system boundary.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error;

pub mod events;

pub use events::{RoundCompleted, RoundData, RoundInitiated, VerifyingPhaseStarted};

// =========================
// WIRE CONSTANTS
// =========================

/// Compressed G2 point length on BLS12-381 (commitments, group public key).
pub const COMPRESSED_G2_LEN: usize = 96;

/// Compressed secp256k1 public key length (participant encryption keys).
pub const ENCRYPTION_PUBKEY_LEN: usize = 33;

/// Serialized scalar share length (32-byte big-endian field element).
pub const SHARE_LEN: usize = 32;

// =========================
// CRYPTOGRAPHIC PRIMITIVES
// =========================

/// Compressed G2 point on BLS12-381 (96 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G2Point(#[serde_as(as = "[_; 96]")] pub [u8; 96]);

impl Default for G2Point {
    fn default() -> Self {
        Self([0u8; 96])
    }
}

// =========================
// ROUND DESCRIPTORS
// =========================

/// One participant in a DKG round, with the contiguous slot range it owns.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// On-chain account address
    pub address: String,
    /// Compressed secp256k1 public key shares are encrypted to (33 bytes)
    pub encryption_pub_key: Vec<u8>,
    /// First slot index owned by this participant
    pub slot_start: u32,
    /// Last slot index owned by this participant (inclusive)
    pub slot_end: u32,
}

impl ParticipantInfo {
    /// Number of slots this participant owns.
    pub fn num_slots(&self) -> u32 {
        self.slot_end - self.slot_start + 1
    }
}

/// Errors raised by [`RoundParams::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("participant list is empty")]
    NoParticipants,

    #[error("total slot count is zero")]
    NoSlots,

    #[error("degree {0} produces no polynomial coefficients")]
    InvalidDegree(u32),

    #[error("participant {index} has invalid slot range [{start}, {end}]")]
    InvalidSlotRange { index: usize, start: u32, end: u32 },

    #[error("slot {0} is claimed by more than one participant")]
    OverlappingSlot(u32),

    #[error("slot {0} is not assigned to any participant")]
    UnassignedSlot(u32),
}

/// Parameters of one DKG round as recorded on chain.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RoundParams {
    pub epoch_id: u64,
    /// Total number of secret-sharing slots in the round
    pub total_slots: u32,
    /// Degree of each dealer's secret polynomial (threshold parameter)
    pub degree: u32,
    pub participants: Vec<ParticipantInfo>,
}

impl RoundParams {
    /// Index of the participant with the given address, if present.
    pub fn participant_index(&self, address: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.address == address)
    }

    /// Check the round descriptor invariant: slot ranges are non-empty,
    /// in bounds, pairwise disjoint, and together cover `[0, total_slots)`.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.participants.is_empty() {
            return Err(ParamsError::NoParticipants);
        }
        if self.total_slots == 0 {
            return Err(ParamsError::NoSlots);
        }
        if self.degree.checked_add(1).is_none() {
            return Err(ParamsError::InvalidDegree(self.degree));
        }

        let mut claimed = vec![false; self.total_slots as usize];
        for (index, participant) in self.participants.iter().enumerate() {
            if participant.slot_end < participant.slot_start
                || participant.slot_end >= self.total_slots
            {
                return Err(ParamsError::InvalidSlotRange {
                    index,
                    start: participant.slot_start,
                    end: participant.slot_end,
                });
            }
            for slot in participant.slot_start..=participant.slot_end {
                if std::mem::replace(&mut claimed[slot as usize], true) {
                    return Err(ParamsError::OverlappingSlot(slot));
                }
            }
        }

        match claimed.iter().position(|c| !c) {
            Some(slot) => Err(ParamsError::UnassignedSlot(slot as u32)),
            None => Ok(()),
        }
    }
}

// =========================
// DKG PHASE AND DEALER DATA
// =========================

/// Lifecycle phase of a DKG round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum DkgPhase {
    Dealing,
    Verifying,
    Completed,
    Failed,
}

/// One dealer's contribution as stored on chain.
///
/// `commitments` are opaque wire bytes; length and encoding are validated
/// where they are consumed. `per_participant[i]` holds the ciphertexts
/// addressed to participant `i`, ordered by ascending slot index.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DealerPart {
    pub epoch_id: u64,
    pub dealer_address: String,
    pub commitments: Vec<Vec<u8>>,
    pub per_participant: Vec<Vec<Vec<u8>>>,
}

// =========================
// OUTBOUND SUBMISSIONS
// =========================

/// Dealer-part submission handed to the transaction collaborator.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SubmitDealerPart {
    pub epoch_id: u64,
    pub creator: String,
    pub commitments: Vec<Vec<u8>>,
    pub per_participant_shares: Vec<Vec<Vec<u8>>>,
}

impl From<SubmitDealerPart> for DealerPart {
    fn from(msg: SubmitDealerPart) -> Self {
        Self {
            epoch_id: msg.epoch_id,
            dealer_address: msg.creator,
            commitments: msg.commitments,
            per_participant: msg.per_participant_shares,
        }
    }
}

/// Verification-vector submission handed to the transaction collaborator.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SubmitVerificationVector {
    pub epoch_id: u64,
    pub creator: String,
    /// Dealer-indexed validity as judged by this verifier
    pub dealer_validity: Vec<bool>,
}
