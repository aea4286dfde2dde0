//! Ed25519 to Curve25519 key conversion.
//!
//! A public-key client has a single long-term Ed25519 identity. For command
//! protection it is reinterpreted as an X25519 keypair:
//!
//! - Public key: decompress the Edwards point and apply the birational map
//!   `u = (1 + y) / (1 - y)` to get the Montgomery u-coordinate.
//! - Secret key: the first half of `SHA-512(seed)`, which is exactly the scalar
//!   Ed25519 signs with. X25519 applies the same clamping.
//!
//! Both halves agree: converting the secret and deriving its X25519 public key
//! yields the converted Ed25519 public key.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha512};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::{error::CryptoError, keys::PUBLIC_KEY_SIZE};

/// Convert an encoded Ed25519 public key to its X25519 counterpart.
///
/// # Errors
///
/// - `InvalidKeyEncoding`: wrong length, not a curve point, non-canonical
///   encoding, or a small-order point
pub fn ed25519_public_to_x25519(public_key: &[u8]) -> Result<X25519PublicKey, CryptoError> {
    let point = decode_edwards(public_key)?;
    Ok(X25519PublicKey::from(point.to_montgomery().to_bytes()))
}

/// Convert an Ed25519 signing key to the X25519 secret for the same identity.
pub fn ed25519_secret_to_x25519(signing_key: &SigningKey) -> StaticSecret {
    let mut digest = Sha512::digest(signing_key.to_bytes());

    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[..32]);
    let secret = StaticSecret::from(scalar);

    scalar.zeroize();
    digest.as_mut_slice().zeroize();
    secret
}

/// Parse an Ed25519 public key with the same strictness as the conversion.
///
/// Used to validate peer keys before they enter a key store.
pub fn verifying_key_from_bytes(public_key: &[u8]) -> Result<VerifyingKey, CryptoError> {
    let point = decode_edwards(public_key)?;
    VerifyingKey::from_bytes(point.compress().as_bytes())
        .map_err(|_| CryptoError::InvalidKeyEncoding { reason: "not a valid Ed25519 key" })
}

/// Accept an X25519 public key only if it is not a low-order point.
///
/// A low-order key forces every Diffie-Hellman result to a known value, so an
/// administrator key like that would let anyone forge commands.
pub fn x25519_public_key_from_bytes(
    bytes: [u8; PUBLIC_KEY_SIZE],
) -> Result<X25519PublicKey, CryptoError> {
    let public_key = X25519PublicKey::from(bytes);

    // Clamped scalars are multiples of the cofactor: the product is the
    // identity exactly when the point lies in the small subgroup
    let scalar = StaticSecret::from([0x01; 32]);
    if !scalar.diffie_hellman(&public_key).was_contributory() {
        return Err(CryptoError::InvalidKeyEncoding { reason: "low-order point" });
    }

    Ok(public_key)
}

fn decode_edwards(bytes: &[u8]) -> Result<EdwardsPoint, CryptoError> {
    let array: [u8; PUBLIC_KEY_SIZE] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyEncoding { reason: "wrong length" })?;

    let compressed = CompressedEdwardsY(array);
    let point = compressed
        .decompress()
        .ok_or(CryptoError::InvalidKeyEncoding { reason: "not a curve point" })?;

    // Decompression reduces y mod p; re-encoding exposes aliases
    if point.compress() != compressed {
        return Err(CryptoError::InvalidKeyEncoding { reason: "non-canonical encoding" });
    }

    if point.is_small_order() {
        return Err(CryptoError::InvalidKeyEncoding { reason: "low-order point" });
    }

    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signing_key(fill: u8) -> SigningKey {
        SigningKey::from_bytes(&[fill; 32])
    }

    #[test]
    fn converted_halves_agree() {
        for fill in [0u8, 1, 0x42, 0xFF] {
            let signing_key = test_signing_key(fill);

            let from_secret = X25519PublicKey::from(&ed25519_secret_to_x25519(&signing_key));
            let from_public =
                ed25519_public_to_x25519(signing_key.verifying_key().as_bytes()).unwrap();

            assert_eq!(from_secret, from_public, "seed fill {fill:#04x}");
        }
    }

    #[test]
    fn converted_keys_agree_on_shared_secret() {
        let admin = test_signing_key(1);
        let client = test_signing_key(2);

        let admin_secret = ed25519_secret_to_x25519(&admin);
        let client_secret = ed25519_secret_to_x25519(&client);
        let admin_public = ed25519_public_to_x25519(admin.verifying_key().as_bytes()).unwrap();
        let client_public = ed25519_public_to_x25519(client.verifying_key().as_bytes()).unwrap();

        let a = admin_secret.diffie_hellman(&client_public);
        let b = client_secret.diffie_hellman(&admin_public);

        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(
            ed25519_public_to_x25519(&[0u8; 31]),
            Err(CryptoError::InvalidKeyEncoding { reason: "wrong length" })
        );
        assert_eq!(
            ed25519_public_to_x25519(&[0u8; 33]),
            Err(CryptoError::InvalidKeyEncoding { reason: "wrong length" })
        );
    }

    #[test]
    fn identity_point_is_rejected_as_low_order() {
        // y = 1 encodes the neutral element
        let mut identity = [0u8; 32];
        identity[0] = 1;

        assert_eq!(
            ed25519_public_to_x25519(&identity),
            Err(CryptoError::InvalidKeyEncoding { reason: "low-order point" })
        );
    }

    #[test]
    fn non_canonical_encoding_is_rejected() {
        // y = p + 1 aliases the identity point (p = 2^255 - 19)
        let mut aliased = [0xFFu8; 32];
        aliased[0] = 0xEE;
        aliased[31] = 0x7F;

        let result = ed25519_public_to_x25519(&aliased);
        assert!(matches!(result, Err(CryptoError::InvalidKeyEncoding { .. })));
        assert!(verifying_key_from_bytes(&aliased).is_err());
    }

    #[test]
    fn low_order_x25519_keys_are_rejected() {
        // u = 0 and u = 1 are both in the small subgroup
        let mut one = [0u8; 32];
        one[0] = 1;

        for bytes in [[0u8; 32], one] {
            assert_eq!(
                x25519_public_key_from_bytes(bytes),
                Err(CryptoError::InvalidKeyEncoding { reason: "low-order point" })
            );
        }

        let honest = X25519PublicKey::from(&StaticSecret::from([7u8; 32]));
        assert_eq!(x25519_public_key_from_bytes(honest.to_bytes()), Ok(honest));
    }

    #[test]
    fn verifying_key_parse_roundtrips() {
        let signing_key = test_signing_key(9);
        let parsed = verifying_key_from_bytes(signing_key.verifying_key().as_bytes()).unwrap();
        assert_eq!(parsed, signing_key.verifying_key());
    }
}
