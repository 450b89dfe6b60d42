//! Persistent CLI configuration and its environment overrides.

use std::env;
use std::path::{Path, PathBuf};

use everynote_core::auth::DEFAULT_CALLBACK_URL;
use everynote_core::db::DEFAULT_DATABASE_FILE;
use everynote_core::models::{normalize_category, DEFAULT_CATEGORY};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const APP_DIR_NAME: &str = "everynote";
const CONFIG_FILE_NAME: &str = "config.json";
const UNSAVED_NOTE_FILE: &str = "unsaved-note.txt";

pub const DATA_DIR_ENV: &str = "EVERYNOTE_DATA_DIR";
pub const AUTH_URL_ENV: &str = "EVERYNOTE_AUTH_URL";
pub const SESSION_TOKEN_ENV: &str = "EVERYNOTE_SESSION_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    /// Directory holding the note database and the session slot
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Base URL of the auth server, e.g. `https://api.example.com`
    #[serde(default)]
    pub auth_base_url: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub default_category: Option<String>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Blank settings count as unset
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl CliConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))
    }
}

/// Effective settings after merging flags, environment and config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliSettings {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub auth_url: Option<String>,
    pub session_token: Option<String>,
    pub callback_url: String,
    pub default_category: String,
}

impl CliSettings {
    pub fn load(config_path: Option<&Path>, db_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = match config_path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => CliConfig::load_from_path(&path).map_err(CliError::Config)?,
            None => CliConfig::default(),
        };
        Self::resolve(config, db_path, |key| env::var(key).ok())
    }

    /// Environment wins over the config file; `--db-path` wins over both.
    pub fn resolve(
        config: CliConfig,
        db_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CliError> {
        let data_dir = non_blank(env(DATA_DIR_ENV))
            .map(PathBuf::from)
            .or(config.data_dir)
            .or_else(default_data_dir)
            .ok_or_else(|| {
                CliError::Config(format!(
                    "Failed to resolve data directory. Set {DATA_DIR_ENV}."
                ))
            })?;
        let db_path = db_path.unwrap_or_else(|| data_dir.join(DEFAULT_DATABASE_FILE));

        let auth_url = non_blank(env(AUTH_URL_ENV))
            .or_else(|| non_blank(config.auth_base_url));
        let session_token = non_blank(env(SESSION_TOKEN_ENV));
        let callback_url = non_blank(config.callback_url)
            .unwrap_or_else(|| DEFAULT_CALLBACK_URL.to_string());
        let default_category = match non_blank(config.default_category) {
            Some(category) => normalize_category(&category)?,
            None => DEFAULT_CATEGORY.to_string(),
        };

        Ok(Self {
            data_dir,
            db_path,
            auth_url,
            session_token,
            callback_url,
            default_category,
        })
    }

    /// Where note input goes when it could not be saved
    pub fn unsaved_note_path(&self) -> PathBuf {
        self.data_dir.join(UNSAVED_NOTE_FILE)
    }
}
