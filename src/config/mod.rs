//! Configuration and credential storage
//!
//! A flat JSON object on disk holding app credentials, OAuth tokens and
//! operator preferences. Loading never fails: a missing or unreadable file
//! yields an empty configuration.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::auth::{now_secs, Credentials, TokenSet, TokenStore};

pub const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_POLLING_INTERVAL: u64 = 30;
pub const MIN_POLLING_INTERVAL: u64 = 10;
pub const MAX_POLLING_INTERVAL: u64 = 300;

const HIDDEN: &str = "***HIDDEN***";

/// Persisted configuration, one key per field.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix seconds, safety margin already applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u64>,
}

/// File-backed store. Mutations are serialized by a write lock and only
/// become visible in memory once they are on disk.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<Config>,
}

impl ConfigStore {
    /// Platform config directory (`~/.config/spotify-remote-driver` on Linux).
    pub fn default_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "spotify-remote-driver", "spotify-remote-driver")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Open `config.json` inside `dir`.
    pub fn open(dir: &Path) -> Self {
        Self::load(dir.join(CONFIG_FILE))
    }

    /// Load configuration from `path`, tolerating a missing or corrupt file.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = read_config(&path);
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Config {
        self.lock().clone()
    }

    /// Apply `mutate` to a copy, persist it, then commit it in memory.
    fn update(&self, mutate: impl FnOnce(&mut Config)) -> Result<()> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        mutate(&mut next);
        write_config(&self.path, &next)?;
        *guard = next;
        Ok(())
    }

    /// Credentials and both tokens present.
    pub fn is_configured(&self) -> bool {
        let config = self.lock();
        [
            &config.client_id,
            &config.client_secret,
            &config.access_token,
            &config.refresh_token,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }

    pub fn is_premium(&self) -> bool {
        self.lock().is_premium.unwrap_or(false)
    }

    pub fn set_premium(&self, is_premium: bool) -> Result<()> {
        self.update(|c| c.is_premium = Some(is_premium))
    }

    pub fn polling_interval(&self) -> u64 {
        self.lock()
            .polling_interval
            .unwrap_or(DEFAULT_POLLING_INTERVAL)
            .clamp(MIN_POLLING_INTERVAL, MAX_POLLING_INTERVAL)
    }

    pub fn set_polling_interval(&self, seconds: u64) -> Result<()> {
        let seconds = seconds.clamp(MIN_POLLING_INTERVAL, MAX_POLLING_INTERVAL);
        self.update(|c| c.polling_interval = Some(seconds))
    }

    /// Configuration as JSON with secrets masked, for diagnostics.
    pub fn redacted(&self) -> serde_json::Value {
        let mut config = self.snapshot();
        for secret in [
            &mut config.access_token,
            &mut config.refresh_token,
            &mut config.client_secret,
        ] {
            if secret.is_some() {
                *secret = Some(HIDDEN.to_string());
            }
        }
        serde_json::to_value(config).unwrap_or_default()
    }

    /// Wipe everything, credentials included.
    pub fn reset(&self) -> Result<()> {
        self.update(|c| *c = Config::default())
    }
}

impl TokenStore for ConfigStore {
    fn credentials(&self) -> Option<Credentials> {
        let config = self.lock();
        match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(Credentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => None,
        }
    }

    fn set_credentials(&self, client_id: &str, client_secret: &str) -> Result<()> {
        self.update(|c| {
            c.client_id = Some(client_id.to_string());
            c.client_secret = Some(client_secret.to_string());
        })
    }

    fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    fn tokens(&self) -> Option<TokenSet> {
        let config = self.lock();
        Some(TokenSet {
            access_token: config.access_token.clone()?,
            refresh_token: config.refresh_token.clone()?,
            expires_at: config.token_expires_at.unwrap_or(0),
        })
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str, expires_in: u64) -> Result<()> {
        let tokens = TokenSet::issued_at(
            access_token.to_string(),
            refresh_token.to_string(),
            expires_in,
            now_secs(),
        );
        self.update(|c| {
            c.access_token = Some(tokens.access_token);
            c.refresh_token = Some(tokens.refresh_token);
            c.token_expires_at = Some(tokens.expires_at);
        })
    }

    fn is_token_expired(&self) -> bool {
        now_secs() >= self.lock().token_expires_at.unwrap_or(0)
    }

    fn clear_tokens(&self) -> Result<()> {
        self.update(|c| {
            c.access_token = None;
            c.refresh_token = None;
            c.token_expires_at = None;
        })
    }
}

fn read_config(path: &Path) -> Config {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, starting empty", path.display());
            return Config::default();
        }
        Err(e) => {
            tracing::error!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => {
            tracing::debug!("Configuration loaded from {}", path.display());
            config
        }
        Err(e) => {
            tracing::error!("Failed to parse config file {}: {}", path.display(), e);
            Config::default()
        }
    }
}

fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("Failed to create config directory")?;
    }

    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).context("Failed to write config file")?;

    // Set restrictive permissions on config file (contains tokens)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp, perms).context("Failed to set config permissions")?;
    }

    fs::rename(&tmp, path).context("Failed to replace config file")?;
    tracing::debug!("Configuration saved to {}", path.display());
    Ok(())
}
