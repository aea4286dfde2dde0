//! Password-derived Ed25519 key files.
//!
//! `<name>` holds the 32-byte seed, `<name>.pub` the 32-byte public key. Both
//! are raw bytes with no header.

use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use e4_crypto::{KEY_SIZE, PUBLIC_KEY_SIZE, SigningKey, VerifyingKey, derive_ed25519_keypair};

use crate::error::CliError;

/// Derive a keypair from `password` and write `<name>` and `<name>.pub`.
pub fn run(name: &Path, password: &str) -> Result<SigningKey, CliError> {
    let signing_key = derive_ed25519_keypair(password)?;

    write_key(name, &signing_key.to_bytes(), 0o600)?;
    tracing::info!(path = %name.display(), "generated private key");

    let public_path = public_key_path(name);
    write_key(&public_path, signing_key.verifying_key().as_bytes(), 0o644)?;
    tracing::info!(path = %public_path.display(), "generated public key");

    Ok(signing_key)
}

/// `<name>.pub`
pub fn public_key_path(name: &Path) -> PathBuf {
    let mut path = OsString::from(name.as_os_str());
    path.push(".pub");
    PathBuf::from(path)
}

/// Read a private key file written by [`run`].
pub fn load_signing_key(path: &Path) -> Result<SigningKey, CliError> {
    let seed: [u8; KEY_SIZE] = read_key(path)?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Read a public key file written by [`run`].
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, CliError> {
    let bytes: [u8; PUBLIC_KEY_SIZE] = read_key(path)?;
    Ok(e4_crypto::verifying_key_from_bytes(&bytes)?)
}

fn read_key<const N: usize>(path: &Path) -> Result<[u8; N], CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;

    bytes.as_slice().try_into().map_err(|_| CliError::KeyFileSize {
        path: path.to_path_buf(),
        expected: N,
        actual: bytes.len(),
    })
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn write_key(path: &Path, bytes: &[u8], mode: u32) -> Result<(), CliError> {
    let io = |source| CliError::Io { path: path.to_path_buf(), source };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path).map_err(io)?;
    file.write_all(bytes).map_err(io)
}
