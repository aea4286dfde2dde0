//! Client identity keys.

use std::fmt;

use e4_crypto::{
    CryptoError, SigningKey, SymmetricKey, VerifyingKey, X25519Secret, derive_ed25519_keypair,
    derive_symmetric_key, ed25519_secret_to_x25519,
};

/// How a client's control channel is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityMode {
    /// Pre-shared symmetric key
    Symmetric,
    /// Ed25519 identity, commands sealed with X25519
    PublicKey,
}

impl fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric => f.write_str("symmetric"),
            Self::PublicKey => f.write_str("public-key"),
        }
    }
}

/// A client's long-term identity key.
///
/// Exactly one per client. Commands are dispatched on the variant once, when
/// they arrive on the control channel.
#[derive(Clone, PartialEq, Eq)]
pub enum IdentityKey {
    /// Pre-shared key; commands are encrypted directly under it.
    Symmetric(SymmetricKey),
    /// Ed25519 signing key; its X25519 form opens sealed commands.
    Ed25519(SigningKey),
}

impl IdentityKey {
    /// Symmetric identity derived from a password.
    pub fn symmetric_from_password(password: &str) -> Result<Self, CryptoError> {
        derive_symmetric_key(password).map(Self::Symmetric)
    }

    /// Ed25519 identity derived from a password.
    pub fn ed25519_from_password(password: &str) -> Result<Self, CryptoError> {
        derive_ed25519_keypair(password).map(Self::Ed25519)
    }

    /// Protection mode of this identity.
    pub fn mode(&self) -> IdentityMode {
        match self {
            Self::Symmetric(_) => IdentityMode::Symmetric,
            Self::Ed25519(_) => IdentityMode::PublicKey,
        }
    }

    /// Identity of the same mode built from `SetIdKey` key material.
    ///
    /// Symmetric identities take the bytes as the new key; Ed25519 identities
    /// take them as the new seed.
    pub fn rotated(&self, material: &SymmetricKey) -> Self {
        match self {
            Self::Symmetric(_) => Self::Symmetric(material.clone()),
            Self::Ed25519(_) => Self::Ed25519(SigningKey::from_bytes(material.as_bytes())),
        }
    }

    /// Ed25519 public key, for public-key identities.
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        match self {
            Self::Symmetric(_) => None,
            Self::Ed25519(signing_key) => Some(signing_key.verifying_key()),
        }
    }

    /// X25519 secret used to open sealed commands, for public-key identities.
    pub fn x25519_secret(&self) -> Option<X25519Secret> {
        match self {
            Self::Symmetric(_) => None,
            Self::Ed25519(signing_key) => Some(ed25519_secret_to_x25519(signing_key)),
        }
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric(_) => f.write_str("IdentityKey::Symmetric(..)"),
            Self::Ed25519(signing_key) => {
                let public = signing_key.verifying_key().to_bytes();
                write!(
                    f,
                    "IdentityKey::Ed25519(pub {:02x}{:02x}{:02x}{:02x}..)",
                    public[0], public[1], public[2], public[3]
                )
            },
        }
    }
}
