//! Dealer and verifier roles of the BLS DKG sidecar.
//!
//! The chain coordinates a per-epoch DKG round in phases:
//!
//! 1. **Dealing**: every participant acts as a dealer, committing to a
//!    random polynomial and encrypting one share per (participant, slot).
//! 2. **Verifying**: every participant decrypts the shares addressed to its
//!    slots, checks them against the dealers' commitments, aggregates the
//!    valid ones, and reports a dealer-validity vector.
//! 3. **Completed**: the chain publishes the consensus validity vector and
//!    the group public key; verifiers seal their local result.
//!
//! Chain notifications arrive at-least-once through the host's worker pool;
//! all handlers here are idempotent per epoch. Verification state is kept in
//! a bounded [`VerificationCache`] shared behind interior locking.

pub mod boundary;
pub mod cache;
pub mod dealer;
pub mod error;
pub mod verifier;

pub use boundary::{DecryptionError, ShareDecryptor, SubmitError, TxSubmitter};
pub use cache::{VerificationCache, VerificationResult};
pub use dealer::Dealer;
pub use error::DkgError;
pub use verifier::Verifier;
