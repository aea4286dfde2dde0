//! Symmetric authenticated encryption using `XChaCha20-Poly1305`
//!
//! One framing for everything the protocol encrypts under a symmetric key:
//! application payloads under topic keys and commands under symmetric
//! identity keys.
//!
//! ```text
//! ┌──────────────┬──────────────────────┬───────────────┐
//! │ nonce (24 B) │ ciphertext (= len P) │ tag (16 B)    │
//! └──────────────┴──────────────────────┴───────────────┘
//! ```
//!
//! The `*_with_nonce` / `*_with_aad` functions are pure so callers can inject
//! deterministic randomness. [`encrypt`] draws its nonce from the OS RNG.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::{error::CryptoError, keys::SymmetricKey};

/// `XChaCha20` nonce size (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Smallest valid ciphertext: nonce and tag around an empty plaintext.
pub const MIN_CIPHERTEXT_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// Draw a fresh nonce from the OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. Encrypting with a predictable nonce is worse
/// than not encrypting at all.
#[allow(clippy::expect_used)]
pub fn random_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::fill(&mut nonce)
        .expect("invariant: OS RNG failure is unrecoverable - cannot generate nonces");
    nonce
}

/// Encrypt `plaintext` under `key` with a nonce from the OS RNG.
///
/// Returns `nonce ‖ ciphertext ‖ tag`.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Vec<u8> {
    encrypt_with_nonce(plaintext, key, random_nonce())
}

/// Encrypt `plaintext` under `key` with a caller-provided nonce.
///
/// # Security
///
/// The caller MUST never reuse a nonce under the same key. Production callers
/// pass 24 bytes of cryptographically secure randomness.
pub fn encrypt_with_nonce(
    plaintext: &[u8],
    key: &SymmetricKey,
    nonce: [u8; NONCE_SIZE],
) -> Vec<u8> {
    encrypt_with_aad(plaintext, &[], key, nonce)
}

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
///
/// `aad` is not included in the output; the decrypting side must supply the
/// same bytes.
pub fn encrypt_with_aad(
    plaintext: &[u8],
    aad: &[u8],
    key: &SymmetricKey,
    nonce: [u8; NONCE_SIZE],
) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let Ok(sealed) = cipher.encrypt(XNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
    else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    out
}

/// Decrypt a `nonce ‖ ciphertext ‖ tag` frame produced by [`encrypt`].
///
/// # Errors
///
/// - `AuthenticationFailed`: frame shorter than [`MIN_CIPHERTEXT_SIZE`], wrong
///   key, or any modified byte
pub fn decrypt(ciphertext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    decrypt_with_aad(ciphertext, &[], key)
}

/// Decrypt a frame produced by [`encrypt_with_aad`] with the same `aad`.
pub fn decrypt_with_aad(
    ciphertext: &[u8],
    aad: &[u8],
    key: &SymmetricKey,
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < MIN_CIPHERTEXT_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: sealed, aad })
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_SIZE;

    fn test_key(fill: u8) -> SymmetricKey {
        let mut key = [0u8; KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = fill.wrapping_add(i as u8);
        }
        SymmetricKey::from_bytes(key)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key(0);
        let plaintext = b"Hello, World!";

        let encrypted = encrypt_with_nonce(plaintext, &key, [0xAB; NONCE_SIZE]);
        let decrypted = decrypt(&encrypted, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_decrypt_empty_message() {
        let key = test_key(0);

        let encrypted = encrypt(b"", &key);
        assert_eq!(encrypted.len(), MIN_CIPHERTEXT_SIZE);
        assert_eq!(decrypt(&encrypted, &key).unwrap(), b"");
    }

    #[test]
    fn encrypt_decrypt_large_message() {
        let key = test_key(7);
        let plaintext = vec![0x42u8; 64 * 1024]; // 64KB

        let encrypted = encrypt(&plaintext, &key);
        assert_eq!(decrypt(&encrypted, &key).unwrap(), plaintext);
    }

    #[test]
    fn output_layout_is_nonce_ciphertext_tag() {
        let key = test_key(0);
        let plaintext = b"test message";
        let nonce = [0x11; NONCE_SIZE];

        let encrypted = encrypt_with_nonce(plaintext, &key, nonce);

        assert_eq!(&encrypted[..NONCE_SIZE], &nonce);
        assert_eq!(encrypted.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let encrypted = encrypt(b"secret message", &test_key(0));

        let result = decrypt(&encrypted, &test_key(1));
        assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let key = test_key(0);
        let mut encrypted = encrypt(b"original message", &key);

        encrypted[NONCE_SIZE] ^= 0x01;

        assert_eq!(decrypt(&encrypted, &key), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn truncated_frame_fails_uniformly() {
        let key = test_key(0);

        for len in 0..MIN_CIPHERTEXT_SIZE {
            let result = decrypt(&vec![0u8; len], &key);
            assert_eq!(result, Err(CryptoError::AuthenticationFailed), "length {len}");
        }
    }

    #[test]
    fn aad_mismatch_fails_decryption() {
        let key = test_key(3);
        let encrypted = encrypt_with_aad(b"command", b"header-a", &key, [0; NONCE_SIZE]);

        assert_eq!(decrypt_with_aad(&encrypted, b"header-a", &key).unwrap(), b"command");
        assert_eq!(
            decrypt_with_aad(&encrypted, b"header-b", &key),
            Err(CryptoError::AuthenticationFailed)
        );
        assert_eq!(decrypt(&encrypted, &key), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn different_nonces_produce_different_ciphertexts() {
        let key = test_key(0);

        let a = encrypt_with_nonce(b"test", &key, [0x00; NONCE_SIZE]);
        let b = encrypt_with_nonce(b"test", &key, [0xFF; NONCE_SIZE]);

        assert_ne!(a[NONCE_SIZE..], b[NONCE_SIZE..]);
    }
}
