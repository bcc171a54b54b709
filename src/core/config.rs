use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// FolioConfig: file-based config loader (folio-search.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "FOLIO_SEARCH_CONFIG";
pub const ENV_API_BASE_URL: &str = "FOLIO_API_BASE_URL";
pub const ENV_API_KEY: &str = "GOOGLE_BOOKS_API_KEY";
pub const ENV_LANGUAGE: &str = "FOLIO_LANGUAGE";
pub const ENV_MAX_RESULTS: &str = "FOLIO_MAX_RESULTS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "HTTP_CONNECT_TIMEOUT_SECS";
pub const ENV_RETRY_DELAY_MS: &str = "FOLIO_RETRY_DELAY_MS";
pub const ENV_REQUERY_DEBOUNCE_MS: &str = "FOLIO_REQUERY_DEBOUNCE_MS";
pub const ENV_CACHE_TTL_SECS: &str = "FOLIO_CACHE_TTL_SECS";

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/books/v1/";

/// The volumes endpoint rejects `maxResults` above 40.
pub const MAX_RESULTS_CEILING: usize = 40;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid api_base_url '{0}'")]
    InvalidBaseUrl(String),
}

/// Top-level config loaded from `folio-search.json`.
///
/// Every field is optional; the `resolve_*` accessors apply the env-var
/// fallback and the built-in default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct FolioConfig {
    /// Lookup endpoint root, e.g. `https://www.googleapis.com/books/v1/`.
    pub api_base_url: Option<String>,
    /// API key. Never logged.
    pub api_key: Option<String>,
    /// Language used to restrict results when translations are excluded.
    pub language: Option<String>,
    pub max_results: Option<usize>,
    pub http_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    /// Fixed wait before a retry actually hits the service. Default: 400.
    pub retry_delay_ms: Option<u64>,
    /// Quiet window that coalesces sort/translation toggles. `0` re-queries immediately.
    pub requery_debounce_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

impl FolioConfig {
    /// Base URL: JSON field → `FOLIO_API_BASE_URL` → Google Books v1.
    pub fn resolve_api_base_url(&self) -> String {
        if let Some(u) = &self.api_base_url {
            if !u.trim().is_empty() {
                return u.trim().to_string();
            }
        }
        env_string(ENV_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// API key: JSON field → `GOOGLE_BOOKS_API_KEY` → `None` (anonymous quota).
    ///
    /// An explicit `""` in the file means "send no key" and does not fall back.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.api_key {
            let k = k.trim();
            return (!k.is_empty()).then(|| k.to_string());
        }
        env_string(ENV_API_KEY)
    }

    /// Language: JSON field → `FOLIO_LANGUAGE` → `en`.
    pub fn resolve_language(&self) -> String {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .or_else(|| env_string(ENV_LANGUAGE))
            .unwrap_or_else(|| "en".to_string())
    }

    /// Page size: JSON field → `FOLIO_MAX_RESULTS` → 20, clamped to `1..=40`.
    pub fn resolve_max_results(&self) -> usize {
        self.max_results
            .or_else(|| env_parse(ENV_MAX_RESULTS))
            .unwrap_or(20)
            .clamp(1, MAX_RESULTS_CEILING)
    }

    pub fn resolve_http_timeout(&self) -> Duration {
        let secs = self
            .http_timeout_secs
            .or_else(|| env_parse(ENV_HTTP_TIMEOUT_SECS))
            .unwrap_or(15);
        Duration::from_secs(secs.max(1))
    }

    pub fn resolve_connect_timeout(&self) -> Duration {
        let secs = self
            .connect_timeout_secs
            .or_else(|| env_parse(ENV_CONNECT_TIMEOUT_SECS))
            .unwrap_or(5);
        Duration::from_secs(secs.max(1))
    }

    pub fn resolve_retry_delay(&self) -> Duration {
        let ms = self
            .retry_delay_ms
            .or_else(|| env_parse(ENV_RETRY_DELAY_MS))
            .unwrap_or(400);
        Duration::from_millis(ms)
    }

    pub fn resolve_requery_debounce(&self) -> Duration {
        let ms = self
            .requery_debounce_ms
            .or_else(|| env_parse(ENV_REQUERY_DEBOUNCE_MS))
            .unwrap_or(250);
        Duration::from_millis(ms)
    }

    pub fn resolve_cache_ttl(&self) -> Duration {
        let secs = self
            .cache_ttl_secs
            .or_else(|| env_parse(ENV_CACHE_TTL_SECS))
            .unwrap_or(60 * 10);
        Duration::from_secs(secs)
    }
}

/// Reads and parses one config file.
pub fn load_config_from(path: &Path) -> Result<FolioConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut v = Vec::new();
    if let Some(env_path) = env_string(ENV_CONFIG_PATH) {
        v.push(PathBuf::from(env_path));
    }
    v.push(PathBuf::from("folio-search.json"));
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".folio-search").join("config.json"));
    }
    v
}

/// Load `folio-search.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `FOLIO_SEARCH_CONFIG` env var path
/// 2. `./folio-search.json`
/// 3. `~/.folio-search/config.json`
///
/// Missing file → `FolioConfig::default()` (all env-var fallbacks apply).
/// Parse error → log a warning, return `FolioConfig::default()`.
pub fn load_config() -> FolioConfig {
    for path in candidate_paths() {
        match load_config_from(&path) {
            Ok(cfg) => {
                tracing::info!("config loaded from {}", path.display());
                return cfg;
            }
            Err(ConfigError::Io { .. }) => continue,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                return FolioConfig::default();
            }
        }
    }

    FolioConfig::default()
}
