//! Client configuration.
//!
//! Values are resolved with priority: config.toml > environment (.env) >
//! defaults. The backend base URL has no default; starting without one is a
//! configuration error rather than a silently relative request path.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PortalError, Result};
use crate::paths;

// ==================== Defaults ====================

/// Request timeout applied to every gateway call
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable names, checked in order
const BASE_URL_VARS: [&str; 2] = ["API_BASE_URL", "VITE_API_BASE_URL"];
const TIMEOUT_VAR: &str = "API_TIMEOUT_SECS";
const MEDIA_BASE_URL_VAR: &str = "MEDIA_BASE_URL";

// ==================== File format ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api: Option<ApiSection>,
    storage: Option<StorageSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    media_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    path: Option<String>,
}

// ==================== Resolved config ====================

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    /// Backend root, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Host used to resolve relative video URLs (defaults to base_url)
    pub media_base_url: String,
    /// Durable store location
    pub store_path: PathBuf,
}

impl PortalConfig {
    /// Build a config for a known base URL with every other value defaulted.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        Ok(Self {
            media_base_url: base_url.clone(),
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            store_path: PathBuf::from(paths::store_path()),
        })
    }

    /// Load configuration from config.toml and the environment.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = match std::fs::read_to_string(paths::CONFIG_FILE) {
            Ok(contents) => toml::from_str::<FileConfig>(&contents).map_err(|e| {
                PortalError::Config(format!("invalid {}: {}", paths::CONFIG_FILE, e))
            })?,
            Err(_) => FileConfig::default(),
        };

        let env_lookup = |name: &str| std::env::var(name).ok();
        Self::resolve(file, env_lookup)
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api = file.api.unwrap_or_default();
        let storage = file.storage.unwrap_or_default();

        // Priority 1: config.toml, Priority 2: environment
        let raw_base = match api.base_url {
            Some(url) => {
                tracing::info!("Using API base URL from config.toml: {}", url);
                url
            }
            None => BASE_URL_VARS
                .iter()
                .find_map(|name| env(name))
                .ok_or_else(|| {
                    PortalError::Config(
                        "API base URL is not set (config.toml [api] base_url or API_BASE_URL)"
                            .to_string(),
                    )
                })?,
        };
        let base_url = validate_base_url(&raw_base)?;

        let timeout_secs = match api.timeout_secs {
            Some(secs) => secs,
            None => match env(TIMEOUT_VAR) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                    PortalError::Config(format!("{} must be a whole number of seconds", TIMEOUT_VAR))
                })?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };
        if timeout_secs == 0 {
            return Err(PortalError::Config("request timeout must be positive".to_string()));
        }

        let media_base_url = match api.media_base_url.or_else(|| env(MEDIA_BASE_URL_VAR)) {
            Some(url) => validate_base_url(&url)?,
            None => base_url.clone(),
        };

        let store_path = storage
            .path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(paths::store_path()));

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            media_base_url,
            store_path,
        })
    }
}

/// Require an absolute http(s) URL and strip trailing slashes.
fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let lower = trimmed.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(PortalError::Config(format!(
            "API base URL must be an absolute http(s) URL, got '{}'",
            raw
        ))),
    }
}
