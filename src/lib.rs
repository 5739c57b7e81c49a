//! # env_credentials
//!
//! Encrypted, file-backed credentials for environment-style configuration.
//!
//! A single master key protects a `KEY=VALUE` document stored next to it.
//! Applications decrypt the document at startup and export the values into
//! their environment, or edit it in place with an external editor.
//!
//! ## Flow
//!
//! ```text
//!   DirectoryDiscovery ──► CredentialsStore ──► EnvSink
//!                            │       │
//!                     key::load   cipher::decrypt
//!                            │       │
//!                      master.key  credentials.env.enc
//! ```
//!
//! ## Modules
//! - `credentials`: key store, cipher, caches, edit sessions
//! - `config`: environment configuration and directory discovery

pub mod config;
pub mod credentials;

pub use config::{Config, DirectoryDiscovery, EnvDirectory, FixedDirectory};
pub use credentials::{
    CredentialsError, CredentialsResult, CredentialsStore, EditSession, Editor, EnvSink,
    ProcessEnv, ShellEditor,
};

/// Locate the credentials directory and export its values into `sink`.
///
/// Keys `sink` already defines are left untouched. Returns the store so the
/// caller can keep using its caches.
pub fn load(
    discovery: &dyn DirectoryDiscovery,
    sink: &mut dyn EnvSink,
) -> CredentialsResult<CredentialsStore> {
    let dir = discovery.base_dir()?;
    let mut store = CredentialsStore::new(dir)?;
    store.load(sink)?;
    Ok(store)
}
