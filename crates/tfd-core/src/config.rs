use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while locating the TFD installation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'{}' environment variable not defined", ToolchainConfig::HOME_ENV)]
    MissingToolchainHome,

    #[error("TFD installation not found at {0}")]
    ToolchainNotFound(PathBuf),
}

/// Location of the TFD toolchain.
///
/// Reads from the `TFD_HOME` environment variable. Unlike most settings
/// there is no fallback: a planner without a toolchain cannot do anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// Root of the TFD checkout (contains `translate/`, `preprocess/`,
    /// `search/`).
    pub home: PathBuf,
}

impl ToolchainConfig {
    /// Name of the environment variable pointing at the installation.
    pub const HOME_ENV: &str = "TFD_HOME";

    /// Build a config from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var_os(Self::HOME_ENV) {
            Some(home) if !home.is_empty() => Ok(Self::new(home)),
            _ => Err(ConfigError::MissingToolchainHome),
        }
    }

    /// Build a config from an explicit path (useful for tests and CLI flags).
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Check that the installation root exists and is a directory.
    pub fn verify(&self) -> Result<(), ConfigError> {
        if self.home.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::ToolchainNotFound(self.home.clone()))
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `<home>/translate/translate.py`
    pub fn translate_path(&self) -> PathBuf {
        self.home.join("translate").join("translate.py")
    }

    /// `<home>/preprocess/preprocess`
    pub fn preprocess_path(&self) -> PathBuf {
        self.home.join("preprocess").join("preprocess")
    }

    /// `<home>/search/search`
    pub fn search_path(&self) -> PathBuf {
        self.home.join("search").join("search")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    pub(crate) fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn stage_paths_follow_tfd_layout() {
        let cfg = ToolchainConfig::new("/opt/tfd");
        assert_eq!(cfg.translate_path(), PathBuf::from("/opt/tfd/translate/translate.py"));
        assert_eq!(cfg.preprocess_path(), PathBuf::from("/opt/tfd/preprocess/preprocess"));
        assert_eq!(cfg.search_path(), PathBuf::from("/opt/tfd/search/search"));
    }

    #[test]
    fn from_env_reads_tfd_home() {
        let _lock = lock_env();
        let original = env::var_os(ToolchainConfig::HOME_ENV);

        unsafe { env::set_var(ToolchainConfig::HOME_ENV, "/srv/tfd") };
        let result = ToolchainConfig::from_env();

        match original {
            Some(v) => unsafe { env::set_var(ToolchainConfig::HOME_ENV, v) },
            None => unsafe { env::remove_var(ToolchainConfig::HOME_ENV) },
        }

        assert_eq!(result.unwrap().home, PathBuf::from("/srv/tfd"));
    }

    #[test]
    fn from_env_without_tfd_home_is_an_error() {
        let _lock = lock_env();
        let original = env::var_os(ToolchainConfig::HOME_ENV);

        unsafe { env::remove_var(ToolchainConfig::HOME_ENV) };
        let result = ToolchainConfig::from_env();

        if let Some(v) = original {
            unsafe { env::set_var(ToolchainConfig::HOME_ENV, v) };
        }

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::MissingToolchainHome));
        assert!(err.to_string().contains("TFD_HOME"), "unexpected message: {err}");
    }

    #[test]
    fn verify_rejects_missing_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        assert!(ToolchainConfig::new(tmp.path()).verify().is_ok());
        assert!(matches!(
            ToolchainConfig::new(&missing).verify(),
            Err(ConfigError::ToolchainNotFound(p)) if p == missing
        ));
    }
}
