//! Decrypt, edit externally, re-encrypt.
//!
//! The plaintext only ever touches disk in a private temporary file next to
//! the document. That file is removed on every exit path: explicitly on
//! success, by `NamedTempFile`'s drop otherwise.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

use super::error::{CredentialsError, CredentialsResult};
use super::store::CredentialsStore;

/// Shell exit status for "found but not executable".
const SHELL_NOT_EXECUTABLE: i32 = 126;

/// Shell exit status for "command not found".
const SHELL_NOT_FOUND: i32 = 127;

/// Something that can open a file for interactive editing.
pub trait Editor {
    /// Run `command` against `path` and block until it exits.
    ///
    /// Returns the exit code, or `None` if the process was killed by a
    /// signal. An `Err` means the editor could not be launched at all.
    fn run(&self, command: &str, path: &Path) -> io::Result<Option<i32>>;
}

/// Runs the command through the system shell as `<command> '<path>'`, so
/// editor settings with arguments (`code --wait`) work unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellEditor;

impl Editor for ShellEditor {
    fn run(&self, command: &str, path: &Path) -> io::Result<Option<i32>> {
        let line = format!("{} {}", command, shell_quote(&path.to_string_lossy()));

        let status = if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", line.as_str()]).status()?
        } else {
            Command::new("sh").args(["-c", line.as_str()]).status()?
        };

        Ok(status.code())
    }
}

/// Quote `value` as a single shell word.
fn shell_quote(value: &str) -> String {
    if cfg!(target_os = "windows") {
        return format!("\"{}\"", value);
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// One decrypt → edit → re-encrypt round trip.
pub struct EditSession<'a> {
    command: String,
    editor: &'a dyn Editor,
}

impl<'a> EditSession<'a> {
    pub fn new(command: impl Into<String>, editor: &'a dyn Editor) -> Self {
        Self {
            command: command.into(),
            editor,
        }
    }

    /// Edit the document of `store`.
    ///
    /// The document is only rewritten after the editor has run; if it cannot
    /// be launched the document is left untouched. The store's caches are
    /// cleared after a successful write.
    pub fn run(&self, store: &mut CredentialsStore) -> CredentialsResult<()> {
        let mut scratch = tempfile::Builder::new()
            .prefix(".credentials-")
            .suffix(".env")
            .tempfile_in(store.dir())?;

        scratch.write_all(store.read()?.as_bytes())?;
        scratch.flush()?;

        tracing::debug!("Opening {} with `{}`", scratch.path().display(), self.command);
        match self.editor.run(&self.command, scratch.path()) {
            Ok(Some(code)) if code == SHELL_NOT_FOUND || code == SHELL_NOT_EXECUTABLE => {
                return Err(CredentialsError::EditorUnavailable {
                    command: self.command.clone(),
                    reason: format!("shell exited with status {}", code),
                });
            }
            Ok(Some(0)) => {}
            Ok(code) => {
                tracing::warn!("Editor `{}` exited with status {:?}", self.command, code);
            }
            Err(e) => {
                return Err(CredentialsError::EditorUnavailable {
                    command: self.command.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let edited = fs::read_to_string(scratch.path())?;
        store.write(&edited)?;
        store.clear();

        scratch.close()?;
        tracing::info!("Updated credentials in {}", store.dir().display());
        Ok(())
    }
}

impl CredentialsStore {
    /// Run an [`EditSession`] with `command` through `editor`.
    pub fn edit(&mut self, command: &str, editor: &dyn Editor) -> CredentialsResult<()> {
        EditSession::new(command, editor).run(self)
    }
}
