//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::{ExpiryPolicy, Platform, StoredToken, TokenStore};

const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Application configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Authorization server base URL (hosts `/oauth/authorize`)
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Where the client runs; decides how login is shown
    #[serde(default)]
    pub platform: Platform,
    /// Whether expired tokens are still sent
    #[serde(default)]
    pub expiry_policy: ExpiryPolicy,
    /// Stored access token
    pub access_token: Option<StoredToken>,
    /// File this config was loaded from; the default location when unset
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_url: default_api_url(),
            platform: Platform::default(),
            expiry_policy: ExpiryPolicy::default(),
            access_token: None,
            path: None,
        }
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "voyage", "voyage-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Self>(&content).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::config_path()?,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }
}

/// Tokens are written through to disk so they survive restarts.
impl TokenStore for Config {
    fn get_token(&self) -> Option<StoredToken> {
        self.access_token.clone()
    }

    fn set_token(&mut self, token: StoredToken) -> Result<()> {
        self.access_token = Some(token);
        self.save()
    }

    fn delete_token(&mut self) -> Result<()> {
        self.access_token = None;
        self.save()
    }
}
