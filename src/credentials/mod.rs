//! Credentials engine.
//!
//! One master key protects one encrypted `KEY=VALUE` document, both kept in
//! the same directory.
//!
//! ## Architecture
//!
//! ```text
//! <credentials dir>/
//! ├── .gitignore            # lists master.key
//! ├── master.key            # hex(key).hex(nonce), never committed
//! └── credentials.env.enc   # hex(AES-128-GCM ciphertext || tag)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = CredentialsStore::new("config")?;
//!
//! // First time only; safe to repeat
//! store.initialize()?;
//!
//! // Parsed values
//! let token = store.values()?.get("API_TOKEN").cloned();
//!
//! // Export into the process environment without overriding what is set
//! store.load(&mut ProcessEnv)?;
//!
//! // Interactive edit through $EDITOR
//! store.edit("vim", &ShellEditor)?;
//! ```

pub mod cipher;
mod edit;
mod env;
mod error;
pub mod ignore;
pub mod key;
mod store;

pub use edit::{EditSession, Editor, ShellEditor};
pub use env::{materialize, parse_values, EnvSink, ProcessEnv, Values};
pub use error::{CredentialsError, CredentialsResult, KeyFormatError};
pub use ignore::{IgnoreRegistrar, Registration};
pub use key::MasterKey;
pub use store::{CredentialsStore, DOCUMENT_FILENAME, IGNORE_FILENAME, KEY_FILENAME, TEMPLATE};
