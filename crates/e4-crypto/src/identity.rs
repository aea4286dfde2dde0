//! Deterministic identifiers and password-derived identity keys.
//!
//! Identifiers must be stable across processes and versions: they are plain
//! SHA-256 over the UTF-8 bytes of the name, with no salt and no
//! normalization.
//!
//! Password derivation uses Argon2id with fixed, published parameters. Argon2
//! needs a salt, so each derivation uses a fixed domain-separation salt. This
//! keeps the symmetric identity key and the Ed25519 seed derived from the same
//! password unrelated.

use argon2::{Algorithm, Argon2, Params, Version};
use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    keys::{Identifier, KEY_SIZE, SymmetricKey},
};

/// Minimum password length, in characters (Unicode scalar values).
pub const MIN_PASSWORD_CHARS: usize = 16;

/// Salt for [`derive_symmetric_key`].
pub const SYMMETRIC_KEY_SALT: &[u8] = b"e4 symmetric key v1";

/// Salt for [`derive_ed25519_keypair`].
pub const ASYMMETRIC_SEED_SALT: &[u8] = b"e4 ed25519 seed v1";

// Argon2id work factor: 64 MiB, 3 passes, 4 lanes
const ARGON2_M_COST: u32 = 64 * 1024;
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

/// Hash a human-readable name into an [`Identifier`].
///
/// Used for client names, topic paths and peer names alike.
pub fn derive_identifier(name: &str) -> Identifier {
    Identifier::from_bytes(Sha256::digest(name.as_bytes()).into())
}

/// Control channel identifier for a client: `SHA-256(client_id)`.
///
/// Not stored anywhere; a pure function of the client identifier.
pub fn control_channel(client_id: &Identifier) -> Identifier {
    Identifier::from_bytes(Sha256::digest(client_id.as_bytes()).into())
}

/// Derive a symmetric identity key from a password.
///
/// # Errors
///
/// - `WeakPassword`: fewer than [`MIN_PASSWORD_CHARS`] characters
pub fn derive_symmetric_key(password: &str) -> Result<SymmetricKey, CryptoError> {
    let mut output = stretch(password, SYMMETRIC_KEY_SALT)?;
    let key = SymmetricKey::from_bytes(output);
    output.zeroize();
    Ok(key)
}

/// Derive an Ed25519 signing keypair from a password.
///
/// The Argon2id output is used directly as the Ed25519 seed, so the same
/// password always yields the same keypair.
///
/// # Errors
///
/// - `WeakPassword`: fewer than [`MIN_PASSWORD_CHARS`] characters
pub fn derive_ed25519_keypair(password: &str) -> Result<SigningKey, CryptoError> {
    let mut seed = stretch(password, ASYMMETRIC_SEED_SALT)?;
    let signing_key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    Ok(signing_key)
}

fn stretch(password: &str, salt: &[u8]) -> Result<[u8; KEY_SIZE], CryptoError> {
    let actual = password.chars().count();
    if actual < MIN_PASSWORD_CHARS {
        return Err(CryptoError::WeakPassword { min: MIN_PASSWORD_CHARS, actual });
    }

    let Ok(params) = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(KEY_SIZE))
    else {
        unreachable!("constant Argon2 parameters are within bounds");
    };
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; KEY_SIZE];
    let Ok(()) = argon2.hash_password_into(password.as_bytes(), salt, &mut output) else {
        unreachable!("salt and output lengths are within Argon2 bounds");
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE_PASSWORD: &str = "alice-super-secret-password";

    #[test]
    fn identifier_is_sha256_of_name() {
        assert_eq!(
            derive_identifier("alice").to_hex(),
            "2bd806c97f0e00af1a1fc3328fa763a9269723c8db8fac4f93af71db186d6e90"
        );
        assert_eq!(
            derive_identifier("").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn control_channel_is_hash_of_identifier() {
        let alice = derive_identifier("alice");
        assert_eq!(
            control_channel(&alice).to_hex(),
            "bd306425d873dc3e9fd1520e693954d6d605e8ad2fae4e48f53a395526f39abe"
        );
        assert_ne!(control_channel(&alice), alice);
    }

    #[test]
    fn different_names_produce_different_identifiers() {
        assert_ne!(derive_identifier("alice"), derive_identifier("bob"));
        assert_ne!(derive_identifier("alice"), derive_identifier("Alice"));
    }

    #[test]
    fn symmetric_derivation_is_deterministic() {
        let a = derive_symmetric_key(ALICE_PASSWORD).unwrap();
        let b = derive_symmetric_key(ALICE_PASSWORD).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_passwords_produce_different_keys() {
        let a = derive_symmetric_key(ALICE_PASSWORD).unwrap();
        let b = derive_symmetric_key("bob-super-secret-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn short_password_is_rejected() {
        let result = derive_symmetric_key("too-short");
        assert_eq!(result, Err(CryptoError::WeakPassword { min: 16, actual: 9 }));

        let result = derive_ed25519_keypair("fifteen-chars!!");
        assert!(matches!(result, Err(CryptoError::WeakPassword { actual: 15, .. })));
    }

    #[test]
    fn password_length_counts_characters_not_bytes() {
        // 8 characters, 16 bytes
        let password = "éééééééé";
        assert_eq!(password.len(), 16);

        let result = derive_symmetric_key(password);
        assert_eq!(result, Err(CryptoError::WeakPassword { min: 16, actual: 8 }));
    }

    #[test]
    fn keypair_derivation_is_deterministic() {
        let a = derive_ed25519_keypair(ALICE_PASSWORD).unwrap();
        let b = derive_ed25519_keypair(ALICE_PASSWORD).unwrap();
        assert_eq!(a.verifying_key(), b.verifying_key());
    }

    #[test]
    fn keypair_seed_is_separated_from_symmetric_key() {
        let symmetric = derive_symmetric_key(ALICE_PASSWORD).unwrap();
        let signing = derive_ed25519_keypair(ALICE_PASSWORD).unwrap();
        assert_ne!(symmetric.as_bytes(), &signing.to_bytes());
    }
}
