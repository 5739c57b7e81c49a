//! Credentials store over a single directory.
//!
//! Holds the lazily loaded master key and the decrypted document caches.
//! Methods take `&mut self`; sharing a store across threads means wrapping
//! it in a `Mutex`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::cipher;
use super::env::{self, EnvSink, Values};
use super::error::{CredentialsError, CredentialsResult};
use super::ignore::IgnoreRegistrar;
use super::key::{self, MasterKey};

/// Key file name inside the credentials directory
pub const KEY_FILENAME: &str = "master.key";

/// Encrypted document file name inside the credentials directory
pub const DOCUMENT_FILENAME: &str = "credentials.env.enc";

/// Default ignore file name, next to the key
pub const IGNORE_FILENAME: &str = ".gitignore";

/// Document written by [`CredentialsStore::initialize`] when none exists.
pub const TEMPLATE: &str = include_str!("template.env");

/// A lazily computed value.
#[derive(Debug, Clone)]
pub(crate) enum Cache<T> {
    Empty,
    Loaded(T),
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Cache::Empty
    }
}

impl<T> Cache<T> {
    /// Take the current state, leaving the cache empty.
    pub(crate) fn take(&mut self) -> Cache<T> {
        std::mem::take(self)
    }

    /// Store `value` and return a reference to it.
    pub(crate) fn insert(&mut self, value: T) -> &T {
        *self = Cache::Loaded(value);
        match self {
            Cache::Loaded(value) => value,
            Cache::Empty => unreachable!("cache was just filled"),
        }
    }
}

/// Encrypted credentials living in one directory.
#[derive(Debug)]
pub struct CredentialsStore {
    dir: PathBuf,
    ignore: IgnoreRegistrar,
    key: Cache<MasterKey>,
    content: Cache<String>,
    values: Cache<Values>,
    materialized: bool,
}

impl CredentialsStore {
    /// Open the store for `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> CredentialsResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(CredentialsError::DirectoryNotFound(dir));
        }

        let ignore = IgnoreRegistrar::new(dir.join(IGNORE_FILENAME));
        Ok(Self {
            dir,
            ignore,
            key: Cache::Empty,
            content: Cache::Empty,
            values: Cache::Empty,
            materialized: false,
        })
    }

    /// Register the key in `ignore_file` instead of `<dir>/.gitignore`.
    pub fn with_ignore_file(mut self, ignore_file: impl Into<PathBuf>) -> Self {
        self.ignore = IgnoreRegistrar::new(ignore_file);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILENAME)
    }

    pub fn document_path(&self) -> PathBuf {
        self.dir.join(DOCUMENT_FILENAME)
    }

    pub fn ignore_file(&self) -> &Path {
        self.ignore.ignore_file()
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// Create the key and seed document if they are missing.
    ///
    /// Existing files are never overwritten; rerunning this only re-checks
    /// the ignore file. Not safe to run concurrently against an empty
    /// directory from several processes.
    pub fn initialize(&mut self) -> CredentialsResult<()> {
        let key_path = self.key_path();
        self.key.insert(key::generate(&key_path)?);

        self.ignore.register(&key_path)?;

        let document_path = self.document_path();
        if document_path.exists() {
            tracing::debug!("{} already exists, leaving it", document_path.display());
            return Ok(());
        }

        self.write(TEMPLATE)?;
        tracing::info!("Seeded {} from template", document_path.display());
        Ok(())
    }

    fn master_key(&mut self) -> CredentialsResult<&MasterKey> {
        let master_key = match self.key.take() {
            Cache::Loaded(master_key) => master_key,
            Cache::Empty => key::load(&self.key_path())?,
        };
        Ok(self.key.insert(master_key))
    }

    /// Decrypted document text, cached after the first successful read.
    pub fn read(&mut self) -> CredentialsResult<&str> {
        let content = match self.content.take() {
            Cache::Loaded(content) => {
                tracing::debug!("Using cached credentials for {}", self.dir.display());
                content
            }
            Cache::Empty => self.decrypt_document()?,
        };
        Ok(self.content.insert(content))
    }

    fn decrypt_document(&mut self) -> CredentialsResult<String> {
        let document_path = self.document_path();
        let master_key = self.master_key()?;

        let encrypted = match fs::read_to_string(&document_path) {
            Ok(encrypted) => encrypted,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CredentialsError::CredentialsNotFound(document_path))
            }
            Err(e) => return Err(e.into()),
        };

        let content = cipher::decrypt(master_key, &encrypted)?;
        tracing::debug!("Decrypted {}", document_path.display());
        Ok(content)
    }

    /// Parsed key/value pairs of the document, cached.
    pub fn values(&mut self) -> CredentialsResult<&Values> {
        let values = match self.values.take() {
            Cache::Loaded(values) => values,
            Cache::Empty => env::parse_values(self.read()?),
        };
        Ok(self.values.insert(values))
    }

    /// Copy the credentials into `sink`, once per store until [`clear`].
    ///
    /// Keys the sink already defines keep their value. Returns how many keys
    /// were set; a repeated call returns 0 without reading anything.
    ///
    /// [`clear`]: CredentialsStore::clear
    pub fn load(&mut self, sink: &mut dyn EnvSink) -> CredentialsResult<usize> {
        if self.materialized {
            return Ok(0);
        }

        let applied = env::materialize(self.values()?, sink);
        self.materialized = true;

        tracing::info!(
            "Loaded {} credential(s) from {} into the environment",
            applied,
            self.dir.display()
        );
        Ok(applied)
    }

    /// Encrypt `content` and overwrite the document.
    ///
    /// Caches are left as they are; call [`clear`] afterwards so later reads
    /// see the new content.
    ///
    /// [`clear`]: CredentialsStore::clear
    pub fn write(&mut self, content: &str) -> CredentialsResult<()> {
        let document_path = self.document_path();
        let encrypted = cipher::encrypt(self.master_key()?, content)?;

        fs::write(&document_path, encrypted)?;
        tracing::info!("Wrote {}", document_path.display());
        Ok(())
    }

    /// Drop the decrypted caches and the materialized flag.
    pub fn clear(&mut self) {
        self.content = Cache::Empty;
        self.values = Cache::Empty;
        self.materialized = false;
    }
}
