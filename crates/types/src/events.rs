//! Typed chain events delivered to the DKG core.
//!
//! Raw event parsing happens in the host; the core only ever sees these
//! already-decoded values. Delivery is at-least-once, so every handler
//! treats repeats as no-ops.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{DealerPart, DkgPhase, ParticipantInfo, RoundParams};

/// A new DKG round has been initiated; dealers should produce their parts.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RoundInitiated {
    pub epoch_id: u64,
    pub total_slots: u32,
    pub degree: u32,
    pub participants: Vec<ParticipantInfo>,
}

impl RoundInitiated {
    /// The round descriptor carried by this event.
    pub fn round_params(&self) -> RoundParams {
        RoundParams {
            epoch_id: self.epoch_id,
            total_slots: self.total_slots,
            degree: self.degree,
            participants: self.participants.clone(),
        }
    }
}

/// Self-contained round state embedded in verification and completion events.
///
/// Carries everything needed to verify without further chain queries.
/// `dealer_parts[d]` is `None` when dealer `d` never submitted.
/// `valid_dealers` and `group_public_key` are populated only on completion.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RoundData {
    pub params: RoundParams,
    pub phase: DkgPhase,
    pub dealer_parts: Vec<Option<DealerPart>>,
    pub valid_dealers: Option<Vec<bool>>,
    pub group_public_key: Option<Vec<u8>>,
}

/// The round moved to the verifying phase; verifiers should check the
/// dealer parts addressed to them.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct VerifyingPhaseStarted {
    pub epoch_id: u64,
    pub deadline_block: u64,
    pub round_data: RoundData,
}

/// The round reached consensus; carries the final dealer-validity vector
/// and the published group public key.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RoundCompleted {
    pub epoch_id: u64,
    pub round_data: RoundData,
}
