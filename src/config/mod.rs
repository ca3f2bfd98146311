//! User configuration for the `musai` tool.
//!
//! Configuration lives in a single TOML file, `~/.musai/config.toml` by
//! default. Every field is optional; a missing file means all defaults.
//!
//! # Resolution order
//!
//! For the file location, first match wins:
//! 1. `--config <path>` on the command line
//! 2. `MUSAI_CONFIG` environment variable
//! 3. `~/.musai/config.toml`
//!
//! After loading, these environment variables override individual fields:
//! `MUSAI_STORE_DIR`, `MUSAI_SERVICE_URL`, `MUSAI_API_KEY`.
//!
//! # Example file
//!
//! ```toml
//! store_dir = "/data/musai/store"
//! pending_timeout_secs = 300
//!
//! [service]
//! base_url = "http://localhost:5678/webhook"
//! api_key = "secret"
//! timeout_secs = 180
//!
//! [content]
//! min_meaningful_chars = 20
//!
//! [export]
//! attach_lecture_images = true
//! output_dir = "exports"
//! ```

use crate::completeness::ContentPolicy;
use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_GENERATION_TIMEOUT, DEFAULT_MIN_MEANINGFUL_CHARS, MUSAI_HOME_DIR,
    PENDING_STATE_TIMEOUT, STORE_DIR_NAME,
};
use crate::core::MusaiError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Backend used when nothing is configured.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5678/webhook";

const fn default_timeout_secs() -> u64 {
    DEFAULT_GENERATION_TIMEOUT.as_secs()
}

const fn default_pending_timeout_secs() -> u64 {
    PENDING_STATE_TIMEOUT.as_secs()
}

const fn default_min_meaningful_chars() -> usize {
    DEFAULT_MIN_MEANINGFUL_CHARS
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

/// Generation backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the workflow backend's webhooks
    #[serde(default = "default_service_url")]
    pub base_url: String,
    /// Bearer token, if the backend wants one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Content thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Minimum prose characters for a lecture to count as present
    #[serde(default = "default_min_meaningful_chars")]
    pub min_meaningful_chars: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_meaningful_chars: default_min_meaningful_chars(),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Embed lecture illustrations in exported documents
    #[serde(default)]
    pub attach_lecture_images: bool,
    /// Directory exports are written to; current directory if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// Complete user configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusaiConfig {
    /// Artifact store directory; `~/.musai/store` if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    /// Seconds to wait on another caller's in-flight generation
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,

    /// Generation backend
    #[serde(default)]
    pub service: ServiceConfig,

    /// Content thresholds
    #[serde(default)]
    pub content: ContentConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Default for MusaiConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            pending_timeout_secs: default_pending_timeout_secs(),
            service: ServiceConfig::default(),
            content: ContentConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl MusaiConfig {
    /// Load from `path`, or from the default location, then apply
    /// environment overrides. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file without environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid configuration TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e: toml::de::Error| {
            anyhow::Error::from(MusaiError::ConfigError {
                message: format!("{}: {}", path.display(), e.message()),
            })
        })
    }

    /// Write as TOML to `path`, creating parent directories.
    ///
    /// The file may hold an API key, so on Unix it is made owner-only.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Config file location: `MUSAI_CONFIG`, else `~/.musai/config.toml`.
    ///
    /// # Errors
    ///
    /// Fails if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = non_empty_env("MUSAI_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        Ok(musai_home()?.join(CONFIG_FILE_NAME))
    }

    /// Store directory after applying the default.
    ///
    /// # Errors
    ///
    /// Fails if no store directory is configured and the home directory
    /// cannot be determined.
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(musai_home()?.join(STORE_DIR_NAME)),
        }
    }

    /// Content policy derived from `[content]`.
    #[must_use]
    pub const fn content_policy(&self) -> ContentPolicy {
        ContentPolicy {
            min_meaningful_chars: self.content.min_meaningful_chars,
        }
    }

    /// How long to wait on another caller's in-flight generation.
    #[must_use]
    pub const fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }

    /// Apply `MUSAI_STORE_DIR`, `MUSAI_SERVICE_URL` and `MUSAI_API_KEY`.
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = non_empty_env("MUSAI_STORE_DIR") {
            self.store_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = non_empty_env("MUSAI_SERVICE_URL") {
            self.service.base_url = url;
        }
        if let Some(key) = non_empty_env("MUSAI_API_KEY") {
            self.service.api_key = Some(key);
        }
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`MusaiError::ConfigError`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let url = self.service.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MusaiError::ConfigError {
                message: format!("service.base_url must be an http(s) URL, got '{url}'"),
            }
            .into());
        }
        if self.service.timeout_secs == 0 {
            return Err(MusaiError::ConfigError {
                message: "service.timeout_secs must be greater than zero".to_string(),
            }
            .into());
        }
        if self.pending_timeout_secs < self.service.timeout_secs {
            return Err(MusaiError::ConfigError {
                message: format!(
                    "pending_timeout_secs ({}) must be at least service.timeout_secs ({})",
                    self.pending_timeout_secs, self.service.timeout_secs
                ),
            }
            .into());
        }
        Ok(())
    }
}

fn musai_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| MusaiError::ConfigError {
            message: "Unable to determine home directory".to_string(),
        })?
        .join(MUSAI_HOME_DIR))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
