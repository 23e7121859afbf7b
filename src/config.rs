use crate::auth::{
    CoachCredentials, CoachSession, KeyValueStore, MemoryStore, SqliteStore, DEFAULT_CODE_TTL_MS,
};
use crate::auth::credentials::DEFAULT_CODE_LENGTH;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the user's home that holds config and state.
const APP_DIR_NAME: &str = ".coachauth";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_DB_FILE_NAME: &str = "coach.db";

/// Top-level configuration, read from `~/.coachauth/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where this config was loaded from (not serialized).
    #[serde(skip)]
    pub config_path: PathBuf,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub coach: CoachCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" (default) or "memory".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// SQLite file. Defaults to `coach.db` next to the config file.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_backend() -> String {
    "sqlite".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Lifetime of an issued login code, in milliseconds.
    #[serde(default = "default_code_ttl_ms")]
    pub code_ttl_ms: i64,
    /// Digits in a generated login code.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
}

fn default_code_ttl_ms() -> i64 {
    DEFAULT_CODE_TTL_MS
}

fn default_code_length() -> usize {
    DEFAULT_CODE_LENGTH
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            code_ttl_ms: default_code_ttl_ms(),
            code_length: default_code_length(),
        }
    }
}

impl Config {
    /// `~/.coachauth/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config: {}", config_path.display()))?
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            Config::default()
        };
        config.config_path = config_path;
        Ok(config)
    }

    /// Write the config back to `config_path`, creating its directory.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write config: {}", self.config_path.display()))?;
        Ok(())
    }

    /// Resolved SQLite path: explicit setting, else next to the config file.
    pub fn db_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(p) => p.clone(),
            None => self
                .config_path
                .parent()
                .map(|dir| dir.join(DEFAULT_DB_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME)),
        }
    }

    /// Factory: open the configured storage backend.
    pub fn open_store(&self) -> Result<Box<dyn KeyValueStore>> {
        match self.storage.backend.trim() {
            "sqlite" => {
                let path = self.db_path();
                let store = SqliteStore::open(&path)
                    .with_context(|| format!("Failed to open store: {}", path.display()))?;
                Ok(Box::new(store))
            }
            "memory" => Ok(Box::new(MemoryStore::new())),
            "" => anyhow::bail!("storage.backend cannot be empty. Supported values: sqlite, memory"),
            other => anyhow::bail!(
                "Unknown storage backend '{other}'. Supported values: sqlite, memory"
            ),
        }
    }

    /// Session manager over the configured store, wall clock and TTL.
    pub fn open_session(&self) -> Result<CoachSession<Box<dyn KeyValueStore>>> {
        let store = self.open_store()?;
        Ok(CoachSession::new(store).with_default_ttl(self.login.code_ttl_ms))
    }
}
