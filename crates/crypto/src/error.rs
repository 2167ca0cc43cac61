//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("random source unavailable: {0}")]
    RngUnavailable(String),

    #[error("no commitments provided")]
    MissingCommitments,

    #[error("invalid commitment length at index {index}: {len}, expected 96")]
    InvalidCommitmentLength { index: usize, len: usize },

    #[error("invalid scalar encoding")]
    InvalidScalar,

    #[error("invalid group public key length: {0}, expected 96")]
    InvalidGroupKeyLength(usize),

    #[error("invalid encryption public key: {0}")]
    InvalidEncryptionKey(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid ciphertext format")]
    InvalidCiphertextFormat,

    #[error("key derivation failed")]
    KeyDerivationFailed,
}
