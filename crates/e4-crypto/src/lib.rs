//! E4 Cryptographic Primitives
//!
//! Cryptographic building blocks for the E4 key-management protocol. Every
//! function here is pure: nonces and timestamps come from the caller, so the
//! protocol layers above can run deterministically under simulation. The
//! convenience wrappers that draw from the OS RNG are marked as such.
//!
//! # Key Hierarchy
//!
//! ```text
//! name ──SHA-256──▶ Identifier ──SHA-256──▶ control channel
//!
//! password ──Argon2id──▶ SymmetricKey         (symmetric identity)
//!          └─Argon2id──▶ Ed25519 seed         (public-key identity)
//!                           │
//!                           ▼ birational map / SHA-512 expansion
//!                       X25519 keypair ──X25519 + HKDF──▶ command key
//!
//! topic key (random, set by the administrator) ──XChaCha20-Poly1305──▶ payload
//! ```
//!
//! # Wire Framing
//!
//! Every ciphertext produced by this crate is `nonce(24) ‖ ciphertext ‖
//! tag(16)`. Sealed commands reuse the same framing with a key derived from
//! the X25519 shared secret of the administrator and the client.
//!
//! # Security
//!
//! - 24-byte random nonces: collisions are negligible even for long-lived keys
//! - Tag verification is constant-time and every failure maps to the same
//!   [`CryptoError::AuthenticationFailed`] with no detail attached
//! - Key material is zeroized on drop
//! - Low-order and non-canonical Ed25519 points are rejected before conversion

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod curve;
mod error;
mod identity;
mod keys;
mod sealed;
mod symmetric;

pub use curve::{
    ed25519_public_to_x25519, ed25519_secret_to_x25519, verifying_key_from_bytes,
    x25519_public_key_from_bytes,
};
pub use ed25519_dalek::{SigningKey, VerifyingKey};
pub use error::CryptoError;
pub use identity::{
    ASYMMETRIC_SEED_SALT, MIN_PASSWORD_CHARS, SYMMETRIC_KEY_SALT, control_channel,
    derive_ed25519_keypair, derive_identifier, derive_symmetric_key,
};
pub use keys::{ID_SIZE, Identifier, KEY_SIZE, PUBLIC_KEY_SIZE, SymmetricKey};
pub use sealed::{COMMAND_KEY_LABEL, open_command, seal_command};
pub use symmetric::{
    MIN_CIPHERTEXT_SIZE, NONCE_SIZE, TAG_SIZE, decrypt, decrypt_with_aad, encrypt,
    encrypt_with_aad, encrypt_with_nonce, random_nonce,
};
pub use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519Secret};
