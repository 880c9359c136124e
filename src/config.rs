//! Configuration: where settings come from and what they default to.
//!
//! The orchestrator reads flat, camel-cased keys through a
//! [`ConfigProvider`] (the editor's workspace configuration in production).
//! Two providers ship with the crate:
//!
//! - [`MapConfig`]: in-memory, for tests and embedding.
//! - [`FileConfig`]: a TOML file, resolved in this order:
//!   1. explicit path (CLI flag)
//!   2. `~/.assay/config.toml` (user)
//!   3. `/etc/assay/config.toml` (system)
//!
//! [`Settings::from_provider`] turns provider values into typed settings,
//! falling back to fixed defaults for anything absent or mistyped.
//!
//! ```toml
//! model = "gpt-4-turbo"
//! temperature = 0.2
//! maxTokens = 800
//! cacheTTL = 600          # seconds
//! rateLimitWindow = 60000 # milliseconds
//! useLocalModel = true
//! localModelEndpoint = "http://localhost:8080/v1/chat/completions"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use crate::cache::CacheConfig;
use crate::limiter::RateLimitConfig;
use crate::{AssayError, Result};

/// Setting names understood by [`Settings::from_provider`].
pub mod keys {
    pub const MODEL: &str = "model";
    pub const TEMPERATURE: &str = "temperature";
    pub const MAX_TOKENS: &str = "maxTokens";
    pub const CACHE_SIZE: &str = "cacheSize";
    /// Seconds.
    pub const CACHE_TTL: &str = "cacheTTL";
    pub const RATE_LIMIT: &str = "rateLimit";
    /// Milliseconds.
    pub const RATE_LIMIT_WINDOW: &str = "rateLimitWindow";
    pub const USE_LOCAL_MODEL: &str = "useLocalModel";
    pub const LOCAL_MODEL_ENDPOINT: &str = "localModelEndpoint";
    pub const API_KEY: &str = "apiKey";
    pub const ORGANIZATION: &str = "organization";
    pub const BASE_URL: &str = "baseUrl";
    /// Milliseconds.
    pub const TIMEOUT: &str = "timeout";
}

/// Default hosted model.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
/// Default hosted API base URL (OpenAI-compatible).
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Source of named configuration values.
pub trait ConfigProvider: Send + Sync {
    /// Look up a setting; `None` when unset.
    fn get(&self, name: &str) -> Option<Value>;
}

/// In-memory configuration.
///
/// ```rust
/// # use assay::config::{MapConfig, ConfigProvider};
/// let config = MapConfig::new().set("model", "gpt-4o").set("maxTokens", 256);
/// assert_eq!(config.get("maxTokens"), Some(serde_json::json!(256)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, Value>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, returning the updated config.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ConfigProvider for MapConfig {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Configuration loaded from a flat TOML file.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    path: PathBuf,
    values: HashMap<String, Value>,
}

impl FileConfig {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.assay/config.toml`
    /// 3. `/etc/assay/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from_file(&path)
    }

    /// Load a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AssayError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let mut config = Self::parse(&content).map_err(|e| match e {
            AssayError::Configuration(msg) => {
                AssayError::Configuration(format!("Failed to parse config file {path:?}: {msg}"))
            }
            other => other,
        })?;
        config.path = path.to_path_buf();
        Ok(config)
    }

    /// Parse TOML text. Nested tables are kept as JSON objects.
    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| AssayError::Configuration(e.to_string()))?;
        let values = table
            .into_iter()
            .map(|(k, v)| Ok((k, serde_json::to_value(v)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self {
            path: PathBuf::new(),
            values,
        })
    }

    /// Path the configuration was read from (empty when parsed from text).
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(AssayError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".assay").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/assay/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(AssayError::Configuration(
            "No config file found. Create ~/.assay/config.toml or /etc/assay/config.toml"
                .to_string(),
        ))
    }
}

impl ConfigProvider for FileConfig {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Local inference endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEndpoint {
    pub url: String,
}

/// Typed settings for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    /// `Some` when `useLocalModel` is on. The URL may still be empty;
    /// the builder rejects that.
    pub local: Option<LocalEndpoint>,
    /// Key from configuration; takes precedence over the secret store.
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            local: None,
            api_key: None,
            organization: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(30_000),
        }
    }
}

impl Settings {
    /// Read every known key from `provider`, using defaults for the rest.
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        let defaults = Settings::default();

        let string = |name| {
            provider
                .get(name)
                .and_then(|v| v.as_str().map(str::to_string))
                .filter(|s| !s.is_empty())
        };
        let uint = |name| provider.get(name).and_then(|v| v.as_u64());

        let local = provider
            .get(keys::USE_LOCAL_MODEL)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
            .then(|| LocalEndpoint {
                url: string(keys::LOCAL_MODEL_ENDPOINT).unwrap_or_default(),
            });

        Settings {
            model: string(keys::MODEL).unwrap_or(defaults.model),
            temperature: provider
                .get(keys::TEMPERATURE)
                .and_then(|v| v.as_f64())
                .map(|t| t as f32)
                .unwrap_or(defaults.temperature),
            max_tokens: uint(keys::MAX_TOKENS)
                .map(|n| n.min(u64::from(u32::MAX)) as u32)
                .unwrap_or(defaults.max_tokens),
            cache: CacheConfig {
                max_entries: uint(keys::CACHE_SIZE)
                    .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                    .unwrap_or(defaults.cache.max_entries),
                ttl: uint(keys::CACHE_TTL)
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.cache.ttl),
            },
            rate_limit: RateLimitConfig {
                limit: uint(keys::RATE_LIMIT)
                    .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                    .unwrap_or(defaults.rate_limit.limit),
                window: uint(keys::RATE_LIMIT_WINDOW)
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.rate_limit.window),
            },
            local,
            api_key: string(keys::API_KEY),
            organization: string(keys::ORGANIZATION),
            base_url: string(keys::BASE_URL).unwrap_or(defaults.base_url),
            timeout: uint(keys::TIMEOUT)
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        }
    }
}
