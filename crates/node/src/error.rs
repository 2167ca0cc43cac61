//! Error taxonomy for the DKG core.
//!
//! Only configuration and cryptographic failures propagate to the caller;
//! anything scoped to a single dealer or slot is absorbed into the
//! dealer-validity vector. Not being a participant and phase mismatches are
//! logged no-ops, never error values.

use thiserror::Error;

use crate::boundary::SubmitError;
use dkg_crypto::CryptoError;

/// Errors surfaced by the dealer and verifier entry points.
#[derive(Debug, Error)]
pub enum DkgError {
    /// Malformed round descriptor; aborts the whole round locally.
    #[error("invalid round configuration: {0}")]
    Configuration(String),

    /// Cryptographic failure fatal to the current attempt (RNG exhaustion
    /// while dealing, malformed group public key at finalization).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The transaction collaborator rejected a submission.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}
