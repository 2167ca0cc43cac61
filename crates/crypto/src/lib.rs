//! Cryptographic primitives for the BLS DKG sidecar.
//!
//! Two building blocks live here:
//!
//! 1. **Feldman VSS** over BLS12-381: dealers commit to a secret polynomial
//!    with G2 points, and verifiers check decrypted shares against those
//!    commitments without learning the polynomial.
//!
//! 2. **ECIES** over secp256k1: shares are encrypted to each participant's
//!    registered encryption key (ephemeral ECDH, HKDF-SHA256, AES-256-GCM).
//!
//! Scalars cross the wire as 32-byte big-endian field elements; commitments
//! as 96-byte compressed G2 points.

pub mod ecies;
pub mod error;
pub mod feldman;

pub use ecies::{ecies_decrypt, ecies_encrypt};
pub use error::CryptoError;
pub use feldman::{
    evaluate_polynomial, generate_commitments, random_polynomial, scalar_from_be_bytes,
    scalar_to_be_bytes, verify_share,
};
