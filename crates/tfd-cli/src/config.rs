//! Configuration file management for tfd.
//!
//! Provides a TOML-based config file at `~/.config/tfd-solver/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use tfd_core::{ConfigError, ToolchainConfig};

/// Env var overriding the output directory.
pub const OUTPUT_DIR_ENV: &str = "TFD_OUTPUT_DIR";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub toolchain: ToolchainSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ToolchainSection {
    /// TFD installation root, used when `TFD_HOME` is unset.
    pub home: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OutputSection {
    /// Base directory for per-namespace working directories.
    pub dir: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the tfd config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/tfd-solver` or
/// `~/.config/tfd-solver`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("tfd-solver");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tfd-solver")
}

/// Return the path to the tfd config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TfdConfig {
    pub toolchain: ToolchainConfig,
    pub output_dir: PathBuf,
}

impl TfdConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Toolchain: `TFD_HOME` env > `config_file.toolchain.home` > error
    /// - Output dir: `cli_output_dir` > `TFD_OUTPUT_DIR` env > `config_file.output.dir` > temp dir
    pub fn resolve(cli_output_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let file_config = load_config().ok();

        let toolchain = match ToolchainConfig::from_env() {
            Ok(tc) => tc,
            Err(e) => match file_config.as_ref().and_then(|c| c.toolchain.home.clone()) {
                Some(home) => ToolchainConfig::new(home),
                None => return Err(e),
            },
        };

        let output_dir = if let Some(dir) = cli_output_dir {
            dir
        } else if let Some(dir) = std::env::var_os(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
            PathBuf::from(dir)
        } else if let Some(dir) = file_config.and_then(|c| c.output.dir) {
            dir
        } else {
            std::env::temp_dir()
        };

        Ok(Self {
            toolchain,
            output_dir,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
