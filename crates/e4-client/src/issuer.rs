//! Administrator side: building and protecting commands.
//!
//! The issuer (the "C2") holds an X25519 keypair. For each target client it
//! picks the protection that matches the client's identity mode and returns
//! the control topic path together with the bytes to publish there.

use e4_crypto::{
    CryptoError, Identifier, SigningKey, SymmetricKey, VerifyingKey, X25519PublicKey,
    X25519Secret, derive_identifier, derive_symmetric_key, ed25519_public_to_x25519,
    ed25519_secret_to_x25519, encrypt_with_aad, seal_command,
};
use e4_proto::{Command, ControlFrame, control_topic_path};
use zeroize::Zeroizing;

use crate::{env::Environment, error::ClientError, identity::IdentityMode};

/// A client as seen by the administrator.
#[derive(Clone)]
pub enum ClientTarget {
    /// Client with a pre-shared symmetric identity key.
    Symmetric {
        /// Client identifier
        client_id: Identifier,
        /// The client's identity key
        key: SymmetricKey,
    },
    /// Client with an Ed25519 identity.
    PublicKey {
        /// Client identifier
        client_id: Identifier,
        /// The client's identity, converted to X25519
        public_key: X25519PublicKey,
    },
}

impl ClientTarget {
    /// Symmetric client whose key is derived from its password.
    pub fn symmetric_from_password(name: &str, password: &str) -> Result<Self, CryptoError> {
        let key = derive_symmetric_key(password)?;
        Ok(Self::Symmetric { client_id: derive_identifier(name), key })
    }

    /// Public-key client, from its Ed25519 public key.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyEncoding` if the key cannot be converted
    pub fn public_key(name: &str, public_key: &VerifyingKey) -> Result<Self, CryptoError> {
        Ok(Self::PublicKey {
            client_id: derive_identifier(name),
            public_key: ed25519_public_to_x25519(public_key.as_bytes())?,
        })
    }

    /// Client identifier.
    pub fn client_id(&self) -> &Identifier {
        match self {
            Self::Symmetric { client_id, .. } | Self::PublicKey { client_id, .. } => client_id,
        }
    }
}

/// Command ready to publish on a client's control topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedCommand {
    /// Control topic path of the target client
    pub topic: String,
    /// Protected command frame
    pub payload: Vec<u8>,
}

/// Builds protected commands for clients.
pub struct CommandIssuer<E: Environment> {
    env: E,
    secret: X25519Secret,
    public_key: X25519PublicKey,
}

impl<E: Environment> CommandIssuer<E> {
    /// Issuer with an existing X25519 secret.
    pub fn new(env: E, secret: X25519Secret) -> Self {
        let public_key = X25519PublicKey::from(&secret);
        Self { env, secret, public_key }
    }

    /// Issuer whose X25519 keypair is the Curve25519 form of an Ed25519
    /// identity.
    ///
    /// Clients provisioned with the Ed25519 public key convert it with
    /// `ed25519_public_to_x25519` and arrive at the same C2 key.
    pub fn from_ed25519(env: E, signing_key: &SigningKey) -> Self {
        Self::new(env, ed25519_secret_to_x25519(signing_key))
    }

    /// Issuer with a fresh keypair drawn from `env`.
    pub fn generate(env: E) -> Self {
        let mut bytes = [0u8; 32];
        env.random_bytes(&mut bytes);
        Self::new(env, X25519Secret::from(bytes))
    }

    /// The issuer's public key, provisioned on public-key clients as their C2
    /// key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public_key
    }

    /// Stamp and protect `command` for `target`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCommand` if `command` is public-key only and `target` is
    ///   symmetric
    /// - `Crypto(InvalidKeyEncoding)` if the target's public key is low-order
    pub fn protect(
        &self,
        command: &Command,
        target: &ClientTarget,
    ) -> Result<ProtectedCommand, ClientError> {
        let tag = command.tag();
        let timestamp = self.env.wall_clock_secs();
        let header = ControlFrame::header_for(timestamp);
        let nonce = self.env.random_nonce();
        let encoded = Zeroizing::new(command.to_vec());

        let body = match target {
            ClientTarget::Symmetric { key, .. } => {
                if tag.requires_public_key_identity() {
                    return Err(ClientError::UnsupportedCommand {
                        command: tag.name(),
                        mode: IdentityMode::Symmetric,
                    });
                }
                encrypt_with_aad(&encoded, &header, key, nonce)
            },
            ClientTarget::PublicKey { public_key, .. } => {
                seal_command(&encoded, &header, public_key, &self.secret, nonce)?
            },
        };

        let topic = control_topic_path(target.client_id());
        tracing::debug!(topic = %topic, command = tag.name(), timestamp, "issued command");

        Ok(ProtectedCommand { topic, payload: ControlFrame::join(timestamp, &body) })
    }
}

#[cfg(test)]
mod tests {
    use e4_crypto::{decrypt_with_aad, open_command};

    use super::*;

    #[derive(Clone)]
    struct FixedEnv;

    impl Environment for FixedEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0x33);
        }

        fn wall_clock_secs(&self) -> u64 {
            1_000
        }
    }

    #[test]
    fn symmetric_command_is_readable_with_client_key() {
        let issuer = CommandIssuer::generate(FixedEnv);
        let target = ClientTarget::Symmetric {
            client_id: derive_identifier("alice"),
            key: SymmetricKey::from_bytes([4; 32]),
        };

        let protected = issuer.protect(&Command::ResetTopicKeys, &target).unwrap();
        assert_eq!(protected.topic, control_topic_path(&derive_identifier("alice")));

        let frame = ControlFrame::parse(&protected.payload).unwrap();
        assert_eq!(frame.timestamp, 1_000);

        let plaintext =
            decrypt_with_aad(frame.body, &frame.header, &SymmetricKey::from_bytes([4; 32])).unwrap();
        assert_eq!(plaintext, Command::ResetTopicKeys.to_vec());
    }

    #[test]
    fn sealed_command_opens_with_client_identity() {
        let issuer = CommandIssuer::generate(FixedEnv);
        let bob = SigningKey::from_bytes(&[6; 32]);
        let target = ClientTarget::public_key("bob", &bob.verifying_key()).unwrap();

        let protected = issuer.protect(&Command::ResetPubKeys, &target).unwrap();
        let frame = ControlFrame::parse(&protected.payload).unwrap();

        let plaintext = open_command(
            frame.body,
            &frame.header,
            &issuer.public_key(),
            &ed25519_secret_to_x25519(&bob),
        )
        .unwrap();
        assert_eq!(plaintext, Command::ResetPubKeys.to_vec());
    }

    #[test]
    fn ed25519_issuer_matches_converted_public_key() {
        let admin = SigningKey::from_bytes(&[8; 32]);
        let issuer = CommandIssuer::from_ed25519(FixedEnv, &admin);

        let converted = ed25519_public_to_x25519(admin.verifying_key().as_bytes()).unwrap();
        assert_eq!(issuer.public_key(), converted);
    }

    #[test]
    fn pubkey_commands_are_refused_for_symmetric_targets() {
        let issuer = CommandIssuer::generate(FixedEnv);
        let target = ClientTarget::Symmetric {
            client_id: derive_identifier("alice"),
            key: SymmetricKey::from_bytes([4; 32]),
        };

        let result = issuer.protect(&Command::remove_pub_key("carol"), &target);
        assert!(matches!(result, Err(ClientError::UnsupportedCommand { .. })));
    }
}
