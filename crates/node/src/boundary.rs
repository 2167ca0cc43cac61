//! Boundary traits for the sidecar's external collaborators.
//!
//! Transaction signing/broadcast and key-store decryption live outside this
//! core; the dealer and verifier only ever talk to these traits.

use std::sync::Arc;

use thiserror::Error;

use dkg_types::{SubmitDealerPart, SubmitVerificationVector};

/// The transaction collaborator rejected or failed a submission.
#[derive(Debug, Error)]
#[error("transaction submission failed: {0}")]
pub struct SubmitError(pub String);

/// The key-store collaborator could not decrypt a ciphertext.
///
/// Never fatal: the verifier absorbs it by marking the owning dealer
/// invalid for this participant.
#[derive(Debug, Error)]
#[error("share decryption failed: {0}")]
pub struct DecryptionError(pub String);

/// Submits DKG messages to the chain.
pub trait TxSubmitter {
    fn submit_dealer_part(&self, part: &SubmitDealerPart) -> Result<(), SubmitError>;

    fn submit_verification_vector(
        &self,
        vector: &SubmitVerificationVector,
    ) -> Result<(), SubmitError>;
}

/// Decrypts an encrypted share with the node's key-store key.
///
/// The implementation (key-store-backed ECIES) is opaque to this core.
pub trait ShareDecryptor {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError>;
}

impl<T: TxSubmitter + ?Sized> TxSubmitter for &T {
    fn submit_dealer_part(&self, part: &SubmitDealerPart) -> Result<(), SubmitError> {
        (**self).submit_dealer_part(part)
    }

    fn submit_verification_vector(
        &self,
        vector: &SubmitVerificationVector,
    ) -> Result<(), SubmitError> {
        (**self).submit_verification_vector(vector)
    }
}

impl<T: ShareDecryptor + ?Sized> ShareDecryptor for &T {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        (**self).decrypt(ciphertext)
    }
}

impl<T: TxSubmitter + ?Sized> TxSubmitter for Arc<T> {
    fn submit_dealer_part(&self, part: &SubmitDealerPart) -> Result<(), SubmitError> {
        (**self).submit_dealer_part(part)
    }

    fn submit_verification_vector(
        &self,
        vector: &SubmitVerificationVector,
    ) -> Result<(), SubmitError> {
        (**self).submit_verification_vector(vector)
    }
}

impl<T: ShareDecryptor + ?Sized> ShareDecryptor for Arc<T> {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        (**self).decrypt(ciphertext)
    }
}
