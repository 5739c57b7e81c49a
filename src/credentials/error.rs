//! Error types for the credentials engine.
//!
//! None of these are retried: missing files and failed authentication are
//! not transient conditions.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while operating on a credentials directory.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Could not find credentials directory {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Could not find key file: {}", .0.display())]
    KeyNotFound(PathBuf),

    #[error("Could not find credentials file {}", .0.display())]
    CredentialsNotFound(PathBuf),

    #[error("The key in {} is invalid: {source}", path.display())]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: KeyFormatError,
    },

    /// Tag verification failed, or the stored ciphertext was not valid hex.
    #[error("Decryption failed: invalid key or corrupted data")]
    AuthenticationFailure,

    #[error("Editor `{command}` could not be launched: {reason}")]
    EditorUnavailable { command: String, reason: String },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decrypted credentials are not valid UTF-8")]
    InvalidContent(#[from] std::string::FromUtf8Error),

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a key file's content failed to parse as `<hex key>.<hex nonce>`.
#[derive(Debug, Error)]
pub enum KeyFormatError {
    #[error("missing '.' separator between key and nonce")]
    MissingSeparator,

    #[error("not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("{part} must be {expected} bytes, got {actual}")]
    Length {
        part: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type CredentialsResult<T> = Result<T, CredentialsError>;
