//! Registration of the key file in a `.gitignore`-style file.
//!
//! Only ever appends. An entry already present as a full line is left alone,
//! so registering the same path any number of times yields one line.

use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use super::error::CredentialsResult;

/// Outcome of [`IgnoreRegistrar::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The ignore file did not exist and was created with the entry.
    Created,
    /// The entry was appended to an existing ignore file.
    Appended,
    /// The entry was already listed.
    AlreadyPresent,
}

/// Keeps a path listed, exactly once, in an ignore file.
#[derive(Debug, Clone)]
pub struct IgnoreRegistrar {
    ignore_file: PathBuf,
}

impl IgnoreRegistrar {
    pub fn new(ignore_file: impl Into<PathBuf>) -> Self {
        Self {
            ignore_file: ignore_file.into(),
        }
    }

    pub fn ignore_file(&self) -> &Path {
        &self.ignore_file
    }

    /// The form `target` is written in: relative to the ignore file's directory.
    ///
    /// Relative paths on either side are resolved against the current
    /// directory first, so a relative key path and an absolute ignore file
    /// still produce a matching entry.
    pub fn entry_for(&self, target: &Path) -> io::Result<String> {
        let target = absolute(target)?;
        let ignore_file = absolute(&self.ignore_file)?;
        let base = ignore_file.parent().unwrap_or_else(|| Path::new(""));
        Ok(relative_path(&target, base).to_string_lossy().replace('\\', "/"))
    }

    /// Ensure `target` is listed in the ignore file.
    pub fn register(&self, target: &Path) -> CredentialsResult<Registration> {
        let entry = self.entry_for(target)?;

        if !self.ignore_file.exists() {
            fs::write(&self.ignore_file, &entry)?;
            tracing::info!("Created {} ignoring {}", self.ignore_file.display(), entry);
            return Ok(Registration::Created);
        }

        let content = fs::read_to_string(&self.ignore_file)?;
        let pattern = Regex::new(&format!("(?m)^{}$", regex::escape(&entry)))?;
        if pattern.is_match(&content) {
            tracing::debug!("{} already ignored in {}", entry, self.ignore_file.display());
            return Ok(Registration::AlreadyPresent);
        }

        let mut file = OpenOptions::new().append(true).open(&self.ignore_file)?;
        write!(file, "\n{}", entry)?;
        tracing::info!("Added {} to {}", entry, self.ignore_file.display());

        Ok(Registration::Appended)
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Relative path from `base` to `target`, both absolute. Symlinks are not
/// resolved.
fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component> = target.components().filter(|c| *c != Component::CurDir).collect();
    let base: Vec<Component> = base.components().filter(|c| *c != Component::CurDir).collect();

    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }
    relative
}
