//! AES-128-GCM over the whole credentials document.
//!
//! The output is `hex(ciphertext || tag)` with no associated data. Because
//! the nonce comes from the key file, encryption is deterministic: the same
//! key, nonce and plaintext always give the same ciphertext. Encrypting two
//! different plaintexts under one key file leaks their XOR, so this must
//! only be used to protect the single document that owns the key. Anything
//! that encrypts independent values needs a fresh nonce per encryption.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Key, Nonce,
};

use super::error::{CredentialsError, CredentialsResult};
use super::key::MasterKey;

fn cipher(master_key: &MasterKey) -> Aes128Gcm {
    Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(master_key.key()))
}

/// Encrypt `plaintext` and return the hex-encoded ciphertext and tag.
pub fn encrypt(master_key: &MasterKey, plaintext: &str) -> CredentialsResult<String> {
    let nonce = Nonce::from_slice(master_key.nonce());

    let ciphertext = cipher(master_key)
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| CredentialsError::Encryption(e.to_string()))?;

    Ok(hex::encode(ciphertext))
}

/// Decrypt hex-encoded ciphertext produced by [`encrypt`].
///
/// Bad hex and a failed tag check are both reported as
/// [`CredentialsError::AuthenticationFailure`].
pub fn decrypt(master_key: &MasterKey, ciphertext_hex: &str) -> CredentialsResult<String> {
    let ciphertext =
        hex::decode(ciphertext_hex.trim()).map_err(|_| CredentialsError::AuthenticationFailure)?;
    let nonce = Nonce::from_slice(master_key.nonce());

    let plaintext = cipher(master_key)
        .decrypt(nonce, ciphertext.as_slice())
        .map_err(|_| CredentialsError::AuthenticationFailure)?;

    Ok(String::from_utf8(plaintext)?)
}
