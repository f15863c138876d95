use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "EVENTFEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_user_agent() -> String {
    format!("event-feed/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

/// Where relative media references are anchored. An empty origin is allowed
/// and resolves relative references to root-relative paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MediaConfig {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub placeholder_url: String,
    #[serde(default)]
    pub avatar_fallback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_viewer_key")]
    pub viewer_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            viewer_key: default_viewer_key(),
        }
    }
}

fn default_viewer_key() -> String {
    "userId".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("config: failed to read file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("config: failed to parse file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    let defaults = Config::default();

    if !other.api.base_url.is_empty() && other.api.base_url != defaults.api.base_url {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() && other.api.user_agent != defaults.api.user_agent {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.timeout.is_zero() && other.api.timeout != defaults.api.timeout {
        base.api.timeout = other.api.timeout;
    }

    if !other.media.origin.is_empty() {
        base.media.origin = other.media.origin;
    }
    if !other.media.placeholder_url.is_empty() {
        base.media.placeholder_url = other.media.placeholder_url;
    }
    if !other.media.avatar_fallback.is_empty() {
        base.media.avatar_fallback = other.media.avatar_fallback;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }
    if !other.storage.viewer_key.is_empty()
        && other.storage.viewer_key != defaults.storage.viewer_key
    {
        base.storage.viewer_key = other.storage.viewer_key;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "media.origin" => cfg.media.origin = value,
        "media.placeholder_url" => cfg.media.placeholder_url = value,
        "media.avatar_fallback" => cfg.media.avatar_fallback = value,
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        "storage.viewer_key" => cfg.storage.viewer_key = value,
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("event-feed").join("config.yaml"))
}
