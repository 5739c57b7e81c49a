//! Configuration for the credentials tooling.
//!
//! Configuration can be set via environment variables:
//! - `CREDENTIALS_DIR` - Optional. Directory holding `master.key` and the encrypted document.
//! - `EDITOR` - Optional. Command used by `credentials edit`. Defaults to `vi`.
//! - `CREDENTIALS_IGNORE_FILE` - Optional. Ignore file the key is registered in.
//!   Defaults to `.gitignore` inside the credentials directory.

use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming the credentials directory
pub const CREDENTIALS_DIR_ENV: &str = "CREDENTIALS_DIR";

/// Environment variable naming the editor command
pub const EDITOR_ENV: &str = "EDITOR";

/// Environment variable naming the ignore file
pub const IGNORE_FILE_ENV: &str = "CREDENTIALS_IGNORE_FILE";

/// Editor used when `EDITOR` is unset
pub const DEFAULT_EDITOR: &str = "vi";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Locates the credentials directory.
pub trait DirectoryDiscovery {
    fn base_dir(&self) -> Result<PathBuf, ConfigError>;
}

/// A directory known up front.
#[derive(Debug, Clone)]
pub struct FixedDirectory(pub PathBuf);

impl DirectoryDiscovery for FixedDirectory {
    fn base_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.0.clone())
    }
}

/// A directory named by an environment variable.
#[derive(Debug, Clone)]
pub struct EnvDirectory {
    pub var: String,
}

impl Default for EnvDirectory {
    fn default() -> Self {
        Self {
            var: CREDENTIALS_DIR_ENV.to_string(),
        }
    }
}

impl DirectoryDiscovery for EnvDirectory {
    fn base_dir(&self) -> Result<PathBuf, ConfigError> {
        non_empty_var(&self.var)
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.var.clone()))
    }
}

/// Credentials tooling configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credentials directory, if configured
    pub credentials_dir: Option<PathBuf>,

    /// Editor command for edit sessions
    pub editor: String,

    /// Ignore file override
    pub ignore_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_dir: None,
            editor: DEFAULT_EDITOR.to_string(),
            ignore_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials_dir = non_empty_var(CREDENTIALS_DIR_ENV).map(PathBuf::from);

        let editor = non_empty_var(EDITOR_ENV).unwrap_or_else(|| DEFAULT_EDITOR.to_string());

        let ignore_file = non_empty_var(IGNORE_FILE_ENV).map(PathBuf::from);
        if let Some(path) = ignore_file.as_ref().filter(|path| path.is_dir()) {
            return Err(ConfigError::InvalidValue(
                IGNORE_FILE_ENV.to_string(),
                format!("{} is a directory, not a file", path.display()),
            ));
        }

        Ok(Self {
            credentials_dir,
            editor,
            ignore_file,
        })
    }

    /// Discovery strategy for the configured directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no directory is configured.
    pub fn discovery(&self) -> Result<FixedDirectory, ConfigError> {
        self.credentials_dir
            .clone()
            .map(FixedDirectory)
            .ok_or_else(|| ConfigError::MissingEnvVar(CREDENTIALS_DIR_ENV.to_string()))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that set `CREDENTIALS_IGNORE_FILE`.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn fixed_directory_returns_path() {
        let discovery = FixedDirectory(PathBuf::from("/srv/app/config"));
        assert_eq!(discovery.base_dir().unwrap(), PathBuf::from("/srv/app/config"));
    }

    #[test]
    fn env_directory_reads_variable() {
        let var = format!("ENV_CREDENTIALS_DIR_TEST_{}", std::process::id());
        std::env::set_var(&var, "/srv/app/config");

        let discovery = EnvDirectory { var: var.clone() };
        assert_eq!(discovery.base_dir().unwrap(), PathBuf::from("/srv/app/config"));

        std::env::remove_var(&var);
    }

    #[test]
    fn env_directory_missing_variable() {
        let discovery = EnvDirectory {
            var: "ENV_CREDENTIALS_DIR_NEVER_SET".to_string(),
        };
        assert!(matches!(
            discovery.base_dir(),
            Err(ConfigError::MissingEnvVar(name)) if name == "ENV_CREDENTIALS_DIR_NEVER_SET"
        ));
    }

    #[test]
    fn env_directory_blank_variable_is_missing() {
        let var = format!("ENV_CREDENTIALS_DIR_BLANK_{}", std::process::id());
        std::env::set_var(&var, "   ");

        let discovery = EnvDirectory { var: var.clone() };
        assert!(discovery.base_dir().is_err());

        std::env::remove_var(&var);
    }

    #[test]
    fn ignore_file_must_not_be_a_directory() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::TempDir::new().unwrap();

        std::env::set_var(IGNORE_FILE_ENV, dir.path());
        let result = Config::from_env();
        std::env::remove_var(IGNORE_FILE_ENV);

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue(name, _)) if name == IGNORE_FILE_ENV
        ));
    }

    #[test]
    fn ignore_file_from_env() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::TempDir::new().unwrap();
        let ignore_file = dir.path().join(".gitignore");

        std::env::set_var(IGNORE_FILE_ENV, &ignore_file);
        let config = Config::from_env();
        std::env::remove_var(IGNORE_FILE_ENV);

        assert_eq!(config.unwrap().ignore_file, Some(ignore_file));
    }

    #[test]
    fn default_config_uses_vi() {
        let config = Config::default();
        assert_eq!(config.editor, DEFAULT_EDITOR);
        assert!(config.credentials_dir.is_none());
        assert!(config.discovery().is_err());
    }

    #[test]
    fn discovery_from_configured_directory() {
        let config = Config {
            credentials_dir: Some(PathBuf::from("config")),
            ..Config::default()
        };
        assert_eq!(config.discovery().unwrap().base_dir().unwrap(), PathBuf::from("config"));
    }
}
