//! Feldman Verifiable Secret Sharing over BLS12-381.
//!
//! A dealer samples a random polynomial `f` of degree `t`, publishes
//! `C_j = a_j * G2` for each coefficient, and hands participant slots the
//! evaluations `f(slot)`. A verifier checks a share `s` for slot `x` by
//! comparing `s * G2` against `Σ_j C_j * x^j`.

use bls12_381::{G2Affine, G2Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::rngs::OsRng;
use rand::RngCore;

use dkg_types::{G2Point, COMPRESSED_G2_LEN};

use crate::error::CryptoError;

/// Generate a secret polynomial with `degree + 1` uniformly random
/// coefficients, index = power of x.
///
/// Randomness comes from the operating system; an exhausted or unavailable
/// source is a hard error, never a silent substitution.
pub fn random_polynomial(degree: u32) -> Result<Vec<Scalar>, CryptoError> {
    let mut rng = OsRng;
    let mut coefficients = Vec::with_capacity(degree as usize + 1);

    for _ in 0..=degree {
        let mut bytes = [0u8; 64];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::RngUnavailable(e.to_string()))?;
        coefficients.push(Scalar::from_bytes_wide(&bytes));
    }

    Ok(coefficients)
}

/// Evaluate the polynomial at a slot index using Horner's method.
pub fn evaluate_polynomial(coefficients: &[Scalar], x: u32) -> Scalar {
    let x = Scalar::from(x as u64);
    let mut result = Scalar::ZERO;
    for coeff in coefficients.iter().rev() {
        result = result * x + coeff;
    }
    result
}

/// Compute Feldman commitments `C_j = a_j * G2` for each coefficient.
pub fn generate_commitments(coefficients: &[Scalar]) -> Vec<G2Point> {
    coefficients
        .iter()
        .map(|coeff| {
            let point = (G2Projective::generator() * coeff).to_affine();
            G2Point(point.to_compressed())
        })
        .collect()
}

/// Verify a share for slot `x` against a dealer's commitments.
///
/// Computes `Σ_j C_j * x^j` (ascending powers, `x^0 = 1`) and compares it to
/// `share * G2`. A commitment with the wrong byte length is a decode error;
/// an undecodable point or a mismatched share is an ordinary `false`.
pub fn verify_share(
    share: &Scalar,
    slot_index: u32,
    commitments: &[Vec<u8>],
) -> Result<bool, CryptoError> {
    if commitments.is_empty() {
        return Err(CryptoError::MissingCommitments);
    }

    let x = Scalar::from(slot_index as u64);
    let mut x_power = Scalar::ONE;
    let mut expected = G2Projective::identity();

    for (index, bytes) in commitments.iter().enumerate() {
        let compressed: &[u8; COMPRESSED_G2_LEN] =
            bytes.as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidCommitmentLength {
                    index,
                    len: bytes.len(),
                })?;

        let point = G2Affine::from_compressed(compressed);
        if point.is_none().into() {
            return Ok(false);
        }

        expected += G2Projective::from(point.unwrap()) * x_power;
        x_power *= x;
    }

    let actual = G2Projective::generator() * share;
    Ok(actual.to_affine() == expected.to_affine())
}

/// Serialize a scalar to its 32-byte big-endian wire form.
pub fn scalar_to_be_bytes(scalar: &Scalar) -> [u8; 32] {
    let mut bytes = scalar.to_bytes();
    bytes.reverse();
    bytes
}

/// Decode a scalar from its 32-byte big-endian wire form.
///
/// Rejects non-canonical encodings (values at or above the field order).
pub fn scalar_from_be_bytes(bytes: &[u8; 32]) -> Result<Scalar, CryptoError> {
    let mut le = *bytes;
    le.reverse();
    Option::<Scalar>::from(Scalar::from_bytes(&le)).ok_or(CryptoError::InvalidScalar)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commitment_bytes(points: &[G2Point]) -> Vec<Vec<u8>> {
        points.iter().map(|p| p.0.to_vec()).collect()
    }

    #[test]
    fn test_polynomial_evaluation() {
        // f(x) = 5 + 3x + 2x^2
        let coeffs = vec![
            Scalar::from(5u64),
            Scalar::from(3u64),
            Scalar::from(2u64),
        ];

        assert_eq!(evaluate_polynomial(&coeffs, 0), Scalar::from(5u64));
        assert_eq!(evaluate_polynomial(&coeffs, 1), Scalar::from(10u64));
        assert_eq!(evaluate_polynomial(&coeffs, 2), Scalar::from(19u64));
    }

    #[test]
    fn test_share_round_trip() {
        let poly = random_polynomial(3).unwrap();
        let commitments = commitment_bytes(&generate_commitments(&poly));

        for slot in 0..8 {
            let share = evaluate_polynomial(&poly, slot);
            assert!(verify_share(&share, slot, &commitments).unwrap());
        }
    }

    #[test]
    fn test_tampered_commitment_rejected() {
        let poly = random_polynomial(2).unwrap();
        let mut commitments = commitment_bytes(&generate_commitments(&poly));
        let share = evaluate_polynomial(&poly, 3);

        commitments[1][10] ^= 0x01;
        assert!(!verify_share(&share, 3, &commitments).unwrap());
    }

    #[test]
    fn test_share_from_other_polynomial_rejected() {
        let poly = random_polynomial(2).unwrap();
        let other = random_polynomial(2).unwrap();
        let commitments = commitment_bytes(&generate_commitments(&poly));

        let foreign_share = evaluate_polynomial(&other, 4);
        assert!(!verify_share(&foreign_share, 4, &commitments).unwrap());
    }

    #[test]
    fn test_wrong_slot_rejected() {
        let poly = random_polynomial(2).unwrap();
        let commitments = commitment_bytes(&generate_commitments(&poly));

        let share = evaluate_polynomial(&poly, 2);
        assert!(!verify_share(&share, 3, &commitments).unwrap());
    }

    #[test]
    fn test_bad_commitment_length_is_decode_error() {
        let poly = random_polynomial(1).unwrap();
        let mut commitments = commitment_bytes(&generate_commitments(&poly));
        commitments[0].truncate(95);

        let share = evaluate_polynomial(&poly, 0);
        assert!(matches!(
            verify_share(&share, 0, &commitments),
            Err(CryptoError::InvalidCommitmentLength { index: 0, len: 95 })
        ));
    }

    #[test]
    fn test_empty_commitments_is_error() {
        let share = Scalar::from(1u64);
        assert!(matches!(
            verify_share(&share, 0, &[]),
            Err(CryptoError::MissingCommitments)
        ));
    }

    #[test]
    fn test_scalar_big_endian_round_trip() {
        let poly = random_polynomial(0).unwrap();
        let scalar = poly[0];

        let bytes = scalar_to_be_bytes(&scalar);
        let decoded = scalar_from_be_bytes(&bytes).unwrap();
        assert_eq!(scalar, decoded);
    }

    #[test]
    fn test_small_scalar_is_big_endian() {
        let bytes = scalar_to_be_bytes(&Scalar::from(1u64));
        assert_eq!(bytes[31], 1);
        assert!(bytes[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_non_canonical_scalar_rejected() {
        // 2^256 - 1 is far above the BLS12-381 scalar field order
        let bytes = [0xffu8; 32];
        assert!(matches!(
            scalar_from_be_bytes(&bytes),
            Err(CryptoError::InvalidScalar)
        ));
    }
}
