//! Commands sealed between the administrator and a public-key client.
//!
//! Both sides hold X25519 keys (the client's converted from its Ed25519
//! identity). The static Diffie-Hellman secret is expanded with HKDF-SHA256
//! into a one-purpose command key, bound to both public keys:
//!
//! ```text
//! shared  = X25519(sender_secret, recipient_public)
//! key     = HKDF-SHA256(ikm = shared, info = label ‖ sender_pub ‖ recipient_pub)
//! sealed  = XChaCha20-Poly1305(key, nonce, plaintext, aad)
//! ```
//!
//! The framing of `sealed` is identical to [`encrypt`](crate::encrypt).

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    keys::{KEY_SIZE, PUBLIC_KEY_SIZE, SymmetricKey},
    symmetric::{NONCE_SIZE, decrypt_with_aad, encrypt_with_aad},
};

/// HKDF info label for command keys.
pub const COMMAND_KEY_LABEL: &[u8] = b"e4 command key v1";

/// Seal `plaintext` from `sender_secret` to `recipient_public`.
///
/// # Errors
///
/// - `InvalidKeyEncoding`: the recipient key is a low-order point and the
///   shared secret would be predictable
pub fn seal_command(
    plaintext: &[u8],
    aad: &[u8],
    recipient_public: &X25519PublicKey,
    sender_secret: &StaticSecret,
    nonce: [u8; NONCE_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    let sender_public = X25519PublicKey::from(sender_secret);
    let key = command_key(sender_secret, recipient_public, &sender_public, recipient_public)
        .ok_or(CryptoError::InvalidKeyEncoding { reason: "low-order point" })?;

    Ok(encrypt_with_aad(plaintext, aad, &key, nonce))
}

/// Open a command sealed by `sender_public` for `recipient_secret`.
///
/// # Errors
///
/// - `AuthenticationFailed`: wrong keys, modified bytes, truncated framing or a
///   degenerate shared secret
pub fn open_command(
    sealed: &[u8],
    aad: &[u8],
    sender_public: &X25519PublicKey,
    recipient_secret: &StaticSecret,
) -> Result<Vec<u8>, CryptoError> {
    let recipient_public = X25519PublicKey::from(recipient_secret);
    let key = command_key(recipient_secret, sender_public, sender_public, &recipient_public)
        .ok_or(CryptoError::AuthenticationFailed)?;

    decrypt_with_aad(sealed, aad, &key)
}

/// Derive the command key. `None` if the exchange was not contributory.
fn command_key(
    own_secret: &StaticSecret,
    peer_public: &X25519PublicKey,
    sender_public: &X25519PublicKey,
    recipient_public: &X25519PublicKey,
) -> Option<SymmetricKey> {
    let shared = own_secret.diffie_hellman(peer_public);
    if !shared.was_contributory() {
        return None;
    }

    let mut info = Vec::with_capacity(COMMAND_KEY_LABEL.len() + 2 * PUBLIC_KEY_SIZE);
    info.extend_from_slice(COMMAND_KEY_LABEL);
    info.extend_from_slice(sender_public.as_bytes());
    info.extend_from_slice(recipient_public.as_bytes());

    let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut okm = [0u8; KEY_SIZE];
    let Ok(()) = hkdf.expand(&info, &mut okm) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    let key = SymmetricKey::from_bytes(okm);
    okm.zeroize();
    Some(key)
}
