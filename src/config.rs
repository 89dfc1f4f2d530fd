//! Configuration loading and types for the article store.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct; every field has a built-in default so the server
//! runs with no file at all. After loading, [`Config::apply_env_overrides`]
//! folds in the recognized environment variables (`MAX_ARTICLE_SIZE`,
//! `RATE_LIMIT_WINDOW_MS`, `RATE_LIMIT_MAX_REQUESTS`, `API_KEY`), which
//! win over file values.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// API key authorization settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Request size and rate limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Object storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// API key authorization.
///
/// When `api_key` is unset every request is authorized; this is the
/// development fallback and is logged as a warning at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Shared secret required for write and admin operations.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Size ceiling and rate-limit budget.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum serialized article size in bytes (default 1 MiB).
    #[serde(default = "default_max_article_size")]
    pub max_article_size: u64,

    /// Sliding rate-limit window in milliseconds.
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    /// Maximum requests per client key per window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_article_size: default_max_article_size(),
            rate_limit_window_ms: default_rate_limit_window_ms(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
        }
    }
}

/// Object storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `local`, `memory`, or `s3`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Local storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,

    /// S3-compatible gateway configuration (R2, MinIO, AWS).
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local: LocalStorageConfig::default(),
            s3: None,
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    /// Root directory for stored documents.
    #[serde(default = "default_storage_root")]
    pub root_dir: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_storage_root(),
        }
    }
}

/// S3-compatible gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct S3StorageConfig {
    /// Backing bucket name.
    pub bucket: String,
    /// Region (ignored by R2 but required by the SDK).
    #[serde(default = "default_region")]
    pub region: String,
    /// Key prefix in the backing bucket.
    #[serde(default)]
    pub prefix: String,
    /// Custom endpoint (e.g. an R2 or MinIO URL).
    #[serde(default)]
    pub endpoint_url: String,
    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_max_article_size() -> u64 {
    1024 * 1024 // 1 MiB
}

fn default_rate_limit_window_ms() -> u64 {
    60_000
}

fn default_rate_limit_max_requests() -> usize {
    10
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_storage_root() -> String {
    "./data/articles".to_string()
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

impl Config {
    /// Fold recognized environment variables into the configuration.
    ///
    /// Unparseable numeric values are ignored with a warning rather than
    /// failing startup.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u64("MAX_ARTICLE_SIZE") {
            self.limits.max_article_size = v;
        }
        if let Some(v) = env_u64("RATE_LIMIT_WINDOW_MS") {
            self.limits.rate_limit_window_ms = v;
        }
        if let Some(v) = env_u64("RATE_LIMIT_MAX_REQUESTS") {
            self.limits.rate_limit_max_requests = v as usize;
        }
        if let Ok(key) = std::env::var("API_KEY") {
            if !key.is_empty() {
                self.auth.api_key = Some(key);
            }
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

/// Load and parse configuration from a YAML file at `path`.
///
/// A missing file yields the built-in defaults; environment overrides
/// are applied in both cases.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let mut config: Config = if path.as_ref().exists() {
        let contents = std::fs::read_to_string(path.as_ref())?;
        serde_yaml::from_str(&contents)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.limits.max_article_size, 1024 * 1024);
        assert_eq!(config.limits.rate_limit_window_ms, 60_000);
        assert_eq!(config.limits.rate_limit_max_requests, 10);
        assert!(config.auth.api_key.is_none());
        assert_eq!(config.storage.backend, "local");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
server:
  port: 9000
limits:
  max_article_size: 2048
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.limits.max_article_size, 2048);
        assert_eq!(config.limits.rate_limit_max_requests, 10);
    }

    #[test]
    fn test_s3_section() {
        let yaml = r#"
storage:
  backend: s3
  s3:
    bucket: articles
    endpoint_url: "http://localhost:9000"
    use_path_style: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.storage.backend, "s3");
        let s3 = config.storage.s3.unwrap();
        assert_eq!(s3.bucket, "articles");
        assert!(s3.use_path_style);
        assert_eq!(s3.region, "auto");
    }
}
