//! Master key material and its on-disk format.
//!
//! The key file holds a single line: `hex(key).hex(nonce)`. The nonce is
//! generated together with the key and reused for every encryption under
//! that key, so one key file must only ever protect one document.

use rand::RngCore;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use super::error::{CredentialsError, CredentialsResult, KeyFormatError};

/// Key length in bytes (128 bits for AES-128)
pub const KEY_LENGTH: usize = 16;

/// Nonce length in bytes (96 bits for AES-GCM)
pub const NONCE_LENGTH: usize = 12;

/// Symmetric key plus the nonce bound to it for the key file's lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
    nonce: [u8; NONCE_LENGTH],
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}

impl MasterKey {
    pub fn new(key: [u8; KEY_LENGTH], nonce: [u8; NONCE_LENGTH]) -> Self {
        Self { key, nonce }
    }

    /// Generate a fresh random key and nonce.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; KEY_LENGTH];
        let mut nonce = [0u8; NONCE_LENGTH];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut nonce);
        Self { key, nonce }
    }

    pub fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    pub fn nonce(&self) -> &[u8; NONCE_LENGTH] {
        &self.nonce
    }

    /// Serialize to the key file line format.
    pub fn encode(&self) -> String {
        format!("{}.{}", hex::encode(self.key), hex::encode(self.nonce))
    }

    /// Parse the key file line format. Surrounding whitespace is ignored.
    pub fn decode(content: &str) -> Result<Self, KeyFormatError> {
        let (key_hex, nonce_hex) = content
            .trim()
            .split_once('.')
            .ok_or(KeyFormatError::MissingSeparator)?;

        Ok(Self {
            key: decode_part("key", key_hex)?,
            nonce: decode_part("nonce", nonce_hex)?,
        })
    }
}

fn decode_part<const N: usize>(part: &'static str, value: &str) -> Result<[u8; N], KeyFormatError> {
    let bytes = hex::decode(value)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| KeyFormatError::Length {
        part,
        expected: N,
        actual: bytes.len(),
    })
}

/// Load the key stored at `path`.
pub fn load(path: &Path) -> CredentialsResult<MasterKey> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CredentialsError::KeyNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    MasterKey::decode(&content).map_err(|source| CredentialsError::InvalidKey {
        path: path.to_path_buf(),
        source,
    })
}

/// Return the key at `path`, creating one first if the file is absent.
///
/// An existing key file is never overwritten. The file is created with
/// create-new semantics, so a concurrent initializer that loses the race
/// reads back the winner's key instead of clobbering it.
pub fn generate(path: &Path) -> CredentialsResult<MasterKey> {
    if path.exists() {
        tracing::debug!("Key file {} already exists, reusing it", path.display());
        return load(path);
    }

    let master_key = MasterKey::random();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return load(path),
        Err(e) => return Err(e.into()),
    };

    restrict_permissions(path);
    file.write_all(master_key.encode().as_bytes())?;
    file.sync_all()?;

    tracing::info!("Generated new master key at {}", path.display());

    Ok(master_key)
}

/// Owner-only permissions for the key file.
fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            tracing::warn!("Could not restrict permissions on {}: {}", path.display(), e);
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
