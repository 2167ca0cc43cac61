//! ECIES share encryption over secp256k1.
//!
//! Shares are encrypted to each participant's registered compressed
//! secp256k1 key: ephemeral ECDH, HKDF-SHA256 key derivation, AES-256-GCM.
//! Ciphertext layout:
//!
//! ```text
//! ephemeral compressed point (33) || nonce (12) || AES-GCM ciphertext+tag
//! ```
//!
//! The decrypt half backs the key-store decryptor used by verifiers (and the
//! tests); the sidecar core itself only ever sees ciphertexts as opaque
//! bytes.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use dkg_types::ENCRYPTION_PUBKEY_LEN;

use crate::error::CryptoError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_CIPHERTEXT_LEN: usize = ENCRYPTION_PUBKEY_LEN + NONCE_LEN + TAG_LEN;

const KDF_INFO: &[u8] = b"DKG-SHARE-ECIES-V1";

/// Encrypt a plaintext to a participant's compressed secp256k1 public key.
pub fn ecies_encrypt<R: RngCore + CryptoRng>(
    recipient_pub_key: &[u8],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    if recipient_pub_key.len() != ENCRYPTION_PUBKEY_LEN {
        return Err(CryptoError::InvalidEncryptionKey(format!(
            "expected {} bytes, got {}",
            ENCRYPTION_PUBKEY_LEN,
            recipient_pub_key.len()
        )));
    }
    if recipient_pub_key[0] != 0x02 && recipient_pub_key[0] != 0x03 {
        return Err(CryptoError::InvalidEncryptionKey(format!(
            "expected 0x02 or 0x03 prefix, got 0x{:02x}",
            recipient_pub_key[0]
        )));
    }

    let recipient = PublicKey::from_sec1_bytes(recipient_pub_key)
        .map_err(|e| CryptoError::InvalidEncryptionKey(e.to_string()))?;

    let ephemeral = EphemeralSecret::random(rng);
    let ephemeral_pub = ephemeral.public_key().to_encoded_point(true);
    let shared = ephemeral.diffie_hellman(&recipient);
    let key = derive_key(shared.raw_secret_bytes().as_slice())?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(ENCRYPTION_PUBKEY_LEN + NONCE_LEN + sealed.len());
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt an ECIES ciphertext with the recipient's secret key.
pub fn ecies_decrypt(secret_key: &SecretKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::InvalidCiphertextFormat);
    }

    let (ephemeral_bytes, rest) = ciphertext.split_at(ENCRYPTION_PUBKEY_LEN);
    let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);

    let ephemeral_pub = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    let shared = diffie_hellman(secret_key.to_nonzero_scalar(), ephemeral_pub.as_affine());
    let key = derive_key(shared.raw_secret_bytes().as_slice())?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

fn derive_key(shared_secret: &[u8]) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    hk.expand(KDF_INFO, &mut key)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> (SecretKey, Vec<u8>) {
        let sk = SecretKey::random(&mut OsRng);
        let pk = sk.public_key().to_encoded_point(true).as_bytes().to_vec();
        (sk, pk)
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let (sk, pk) = keypair();
        let plaintext = [7u8; 32];

        let ciphertext = ecies_encrypt(&pk, &plaintext, &mut OsRng).unwrap();
        let decrypted = ecies_decrypt(&sk, &ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
        assert!(ciphertext.len() >= MIN_CIPHERTEXT_LEN);
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let (sk, pk) = keypair();
        let mut ciphertext = ecies_encrypt(&pk, b"share material", &mut OsRng).unwrap();

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        assert!(matches!(
            ecies_decrypt(&sk, &ciphertext),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let (_, pk) = keypair();
        let (other_sk, _) = keypair();

        let ciphertext = ecies_encrypt(&pk, b"share material", &mut OsRng).unwrap();
        assert!(ecies_decrypt(&other_sk, &ciphertext).is_err());
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let (sk, pk) = keypair();
        let ciphertext = ecies_encrypt(&pk, b"x", &mut OsRng).unwrap();

        assert!(matches!(
            ecies_decrypt(&sk, &ciphertext[..MIN_CIPHERTEXT_LEN - 1]),
            Err(CryptoError::InvalidCiphertextFormat)
        ));
    }

    #[test]
    fn test_invalid_recipient_key_rejected() {
        // wrong length
        assert!(matches!(
            ecies_encrypt(&[0x02; 32], b"x", &mut OsRng),
            Err(CryptoError::InvalidEncryptionKey(_))
        ));

        // wrong prefix
        let mut bad = vec![0x05u8; ENCRYPTION_PUBKEY_LEN];
        bad[1..].fill(0x11);
        assert!(matches!(
            ecies_encrypt(&bad, b"x", &mut OsRng),
            Err(CryptoError::InvalidEncryptionKey(_))
        ));
    }
}
