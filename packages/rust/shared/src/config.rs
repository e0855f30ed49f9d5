//! Application configuration for rosterbook.
//!
//! User config lives at `~/.rosterbook/rosterbook.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterbookError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rosterbook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rosterbook";

// ---------------------------------------------------------------------------
// Config structs (matching rosterbook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Data directory holding the duty database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Database file name within the data directory.
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: default_db_file(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.rosterbook".into()
}
fn default_db_file() -> String {
    "rosterbook.db".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rosterbook/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RosterbookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rosterbook/rosterbook.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RosterbookError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RosterbookError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RosterbookError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RosterbookError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RosterbookError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the database path from config, expanding a leading `~`.
pub fn db_path(config: &AppConfig) -> Result<PathBuf> {
    let data_dir = expand_tilde(&config.defaults.data_dir)?;
    Ok(data_dir.join(&config.defaults.db_file))
}

/// Expand a leading `~/` against the user's home directory.
fn expand_tilde(path: &str) -> Result<PathBuf> {
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/") {
        rest
    } else {
        return Ok(PathBuf::from(path));
    };

    let home = dirs::home_dir()
        .ok_or_else(|| RosterbookError::config("could not determine home directory"))?;
    Ok(home.join(rest))
}
