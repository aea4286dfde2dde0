//! End-to-end demo over an in-process broker.
//!
//! Alice is a symmetric client, Bob a public-key client. The administrator
//! gives both the same topic key (plus Alice's public key to Bob), then the
//! two exchange a message each way. Key stores are Redb files, so a run with
//! `--dir` leaves inspectable state behind.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use e4_client::{
    ClientConfig, ClientRuntime, ClientTarget, CommandIssuer, Environment, IdentityKey, KeyStore,
    RedbKeyStore,
};
use e4_crypto::{derive_ed25519_keypair, derive_identifier, ed25519_public_to_x25519};
use e4_harness::{LocalBroker, PumpReport, SimAdmin, SimClient, SimEnv};
use e4_proto::{Command, CommandTag};

use crate::{error::CliError, keygen};

/// `e4 simulate` options.
#[derive(clap::Args, Debug)]
pub struct SimulateOptions {
    /// Directory for the client key stores (a temporary directory if unset)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Seed for the simulated RNG
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Topic the two clients talk on
    #[arg(long, default_value = "/demo/alice/messages")]
    pub topic: String,

    /// Message Alice sends to Bob
    #[arg(long, default_value = "Hello, E4!")]
    pub message: String,

    /// Alice's password (symmetric identity)
    #[arg(long, default_value = "alice-super-secret-password")]
    pub alice_password: String,

    /// Bob's password (Ed25519 identity)
    #[arg(long, default_value = "bob-super-secret-password")]
    pub bob_password: String,

    /// Administrator password, used unless `--admin-key` is given
    #[arg(long, default_value = "admin-super-secret-password")]
    pub admin_password: String,

    /// Administrator private key file written by `e4 keygen`
    #[arg(long)]
    pub admin_key: Option<PathBuf>,
}

/// Run the demo. Fails if any step ends in an unexpected state.
pub fn run(options: &SimulateOptions) -> Result<(), CliError> {
    let scratch;
    let dir = match &options.dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|source| CliError::Io { path: dir.clone(), source })?;
            dir.clone()
        },
        None => {
            scratch = tempfile::tempdir()
                .map_err(|source| CliError::Io { path: std::env::temp_dir(), source })?;
            scratch.path().to_path_buf()
        },
    };

    let env = SimEnv::with_seed(options.seed);
    let broker = LocalBroker::new();

    let admin_key = match &options.admin_key {
        Some(path) => {
            let signing_key = keygen::load_signing_key(path)?;
            let public_path = keygen::public_key_path(path);
            if keygen::load_verifying_key(&public_path)? != signing_key.verifying_key() {
                return Err(CliError::Diverged(format!(
                    "{} does not match {}",
                    public_path.display(),
                    path.display()
                )));
            }
            signing_key
        },
        None => derive_ed25519_keypair(&options.admin_password)?,
    };
    let issuer = CommandIssuer::from_ed25519(env.clone(), &admin_key);
    let admin = SimAdmin::with_issuer(issuer, &broker);
    let c2_key = ed25519_public_to_x25519(admin_key.verifying_key().as_bytes())?;

    // Alice: symmetric identity from her password
    let alice = SimClient::connect(
        Arc::new(ClientRuntime::provision(
            derive_identifier("alice"),
            IdentityKey::symmetric_from_password(&options.alice_password)?,
            open_store(&dir, "alice")?,
            env.clone(),
            ClientConfig::default(),
        )?),
        &broker,
    )?;
    let alice_target = ClientTarget::symmetric_from_password("alice", &options.alice_password)?;

    // Bob: Ed25519 identity, administrator key provisioned out of band
    let bob_identity = IdentityKey::ed25519_from_password(&options.bob_password)?;
    let bob_public = bob_identity
        .verifying_key()
        .ok_or_else(|| CliError::Diverged("Bob's identity has no public key".into()))?;
    let bob_store = open_store(&dir, "bob")?;
    bob_store.set_c2_key(c2_key)?;
    let bob = SimClient::connect(
        Arc::new(ClientRuntime::provision(
            derive_identifier("bob"),
            bob_identity,
            bob_store,
            env.clone(),
            ClientConfig::default(),
        )?),
        &broker,
    )?;
    let bob_target = ClientTarget::public_key("bob", &bob_public)?;

    alice.subscribe(&options.topic)?;
    bob.subscribe(&options.topic)?;

    let alice_public = derive_ed25519_keypair(&options.alice_password)?.verifying_key();
    let set_topic_key = Command::set_topic_key(env.random_key(), &options.topic);

    admin.send(&set_topic_key, &alice_target)?;
    admin.send(&Command::set_pub_key(&alice_public, "alice"), &bob_target)?;
    admin.send(&set_topic_key, &bob_target)?;

    expect_applied("alice", &alice.pump()?, &[CommandTag::SetTopicKey])?;
    expect_applied("bob", &bob.pump()?, &[CommandTag::SetPubKey, CommandTag::SetTopicKey])?;

    if bob.runtime().peer_public_key("alice")? != alice_public {
        return Err(CliError::Diverged("Bob does not hold Alice's public key".into()));
    }

    alice.publish(&options.topic, options.message.as_bytes())?;
    expect_delivered("bob", &bob.pump()?, options.message.as_bytes())?;
    alice.pump()?;

    let reply = format!("re: {}", options.message);
    bob.publish(&options.topic, reply.as_bytes())?;
    expect_delivered("alice", &alice.pump()?, reply.as_bytes())?;

    tracing::info!(
        dir = %dir.display(),
        alice_control = alice.runtime().control_topic_path(),
        bob_control = bob.runtime().control_topic_path(),
        published = broker.published_count(),
        "simulation complete"
    );
    Ok(())
}

fn open_store(dir: &Path, name: &str) -> Result<RedbKeyStore, CliError> {
    Ok(RedbKeyStore::open(dir.join(format!("{name}.redb")))?)
}

fn expect_applied(
    client: &str,
    report: &PumpReport,
    expected: &[CommandTag],
) -> Result<(), CliError> {
    if report.applied != expected {
        return Err(CliError::Diverged(format!(
            "{client} applied {:?}, expected {expected:?} ({} rejected)",
            report.applied, report.rejected
        )));
    }

    for command in &report.applied {
        tracing::info!(client, command = command.name(), "command applied");
    }
    Ok(())
}

fn expect_delivered(client: &str, report: &PumpReport, expected: &[u8]) -> Result<(), CliError> {
    let Some((topic, plaintext)) = report.delivered.first() else {
        return Err(CliError::Diverged(format!(
            "{client} received nothing ({} rejected)",
            report.rejected
        )));
    };
    if plaintext != expected {
        return Err(CliError::Diverged(format!("{client} received a different message")));
    }

    let message = String::from_utf8_lossy(plaintext);
    tracing::info!(client, topic = %topic, message = %message, "message delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn options(dir: &Path) -> SimulateOptions {
        SimulateOptions {
            dir: Some(dir.to_path_buf()),
            seed: 7,
            topic: "/demo/alice/messages".into(),
            message: "Hello, E4!".into(),
            alice_password: "alice-super-secret-password".into(),
            bob_password: "bob-super-secret-password".into(),
            admin_password: "admin-super-secret-password".into(),
            admin_key: None,
        }
    }

    #[test]
    fn simulation_runs_and_persists_keys() {
        let dir = TempDir::new().unwrap();
        run(&options(dir.path())).unwrap();

        let bob = RedbKeyStore::open(dir.path().join("bob.redb")).unwrap();
        let snapshot = bob.snapshot().unwrap();
        assert_eq!(snapshot.topic_keys.len(), 1);
        assert_eq!(snapshot.public_keys.len(), 1);
        assert!(snapshot.c2_key.is_some());
    }

    #[test]
    fn admin_key_file_is_honoured() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("admin");
        keygen::run(&key_path, "a-different-admin-password").unwrap();

        let mut options = options(dir.path());
        options.admin_key = Some(key_path);
        run(&options).unwrap();
    }
}
