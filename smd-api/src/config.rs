//! API Configuration Module
//!
//! Configuration is loaded from `SMD_*` environment variables with defaults
//! suitable for development.

use std::net::SocketAddr;
use std::path::PathBuf;

use smd_core::{KindPrefixes, VersionPolicy};
use smd_events::{DEFAULT_QUEUE_CAPACITY, DEFAULT_STREAM_CAPACITY};

use crate::error::{ApiError, ApiResult};

/// Default listen port of the SMD service.
pub const DEFAULT_PORT: u16 = 27779;

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Listener
    // ========================================================================
    pub host: String,
    pub port: u16,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
    pub cors_allow_credentials: bool,
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Persistence
    // ========================================================================
    /// Raw backend name, parsed by [`ApiConfig::store_backend`].
    pub store: String,
    pub data_dir: PathBuf,

    // ========================================================================
    // Resource identity and versioning
    // ========================================================================
    pub api_group: String,
    /// Served schema versions; the first is the default.
    pub schema_versions: Vec<String>,
    /// Raw `Kind=prefix` list, parsed by [`ApiConfig::kind_prefixes`].
    pub kind_prefixes: String,
    /// Reject creating a Component whose `ID` is already in use.
    pub enforce_unique_ids: bool,

    // ========================================================================
    // Notifications
    // ========================================================================
    pub event_queue_capacity: usize,
    pub event_stream_capacity: usize,
    pub event_source: String,

    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            store: "memory".to_string(),
            data_dir: PathBuf::from("./data"),
            api_group: "smd.openchami.io".to_string(),
            schema_versions: vec!["v1".to_string()],
            kind_prefixes: "Component=com".to_string(),
            enforce_unique_ids: false,
            event_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_stream_capacity: DEFAULT_STREAM_CAPACITY,
            event_source: "smd".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `SMD_API_BIND`: listen host (default `0.0.0.0`)
    /// - `PORT` / `SMD_API_PORT`: listen port (default 27779)
    /// - `SMD_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `SMD_CORS_ALLOW_CREDENTIALS`, `SMD_CORS_MAX_AGE_SECS`
    /// - `SMD_STORE`: `memory` or `file`
    /// - `SMD_DATA_DIR`: file store root (default `./data`)
    /// - `SMD_API_GROUP`, `SMD_SCHEMA_VERSIONS`, `SMD_KIND_PREFIXES`
    /// - `SMD_ENFORCE_UNIQUE_IDS`
    /// - `SMD_EVENT_QUEUE_CAPACITY`, `SMD_EVENT_STREAM_CAPACITY`, `SMD_EVENT_SOURCE`
    /// - `SMD_LOG_FORMAT`: `text` or `json`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] with an arbitrary variable source.
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = lookup("SMD_API_BIND").unwrap_or(defaults.host);
        let port = lookup("PORT")
            .or_else(|| lookup("SMD_API_PORT"))
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let cors_origins = lookup("SMD_CORS_ORIGINS")
            .map(|s| split_list(&s))
            .unwrap_or_default();
        let cors_allow_credentials = lookup("SMD_CORS_ALLOW_CREDENTIALS")
            .map(|s| parse_flag(&s))
            .unwrap_or(defaults.cors_allow_credentials);
        let cors_max_age_secs = lookup("SMD_CORS_MAX_AGE_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let store = lookup("SMD_STORE")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.store);
        let data_dir = lookup("SMD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let api_group = lookup("SMD_API_GROUP")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_group);
        let schema_versions = lookup("SMD_SCHEMA_VERSIONS")
            .map(|s| split_list(&s))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.schema_versions);
        let kind_prefixes = lookup("SMD_KIND_PREFIXES").unwrap_or(defaults.kind_prefixes);
        let enforce_unique_ids = lookup("SMD_ENFORCE_UNIQUE_IDS")
            .map(|s| parse_flag(&s))
            .unwrap_or(defaults.enforce_unique_ids);

        let event_queue_capacity = lookup("SMD_EVENT_QUEUE_CAPACITY")
            .and_then(|s| s.trim().parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.event_queue_capacity);
        let event_stream_capacity = lookup("SMD_EVENT_STREAM_CAPACITY")
            .and_then(|s| s.trim().parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.event_stream_capacity);
        let event_source = lookup("SMD_EVENT_SOURCE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.event_source);

        let log_format = match lookup("SMD_LOG_FORMAT").map(|s| s.trim().to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            host,
            port,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            store,
            data_dir,
            api_group,
            schema_versions,
            kind_prefixes,
            enforce_unique_ids,
            event_queue_capacity,
            event_stream_capacity,
            event_source,
            log_format,
        }
    }

    pub fn socket_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }

    pub fn version_policy(&self) -> ApiResult<VersionPolicy> {
        Ok(VersionPolicy::new(
            self.api_group.clone(),
            self.schema_versions.clone(),
        )?)
    }

    pub fn kind_prefixes(&self) -> ApiResult<KindPrefixes> {
        KindPrefixes::parse(&self.kind_prefixes)
            .map_err(|e| ApiError::invalid_input(format!("SMD_KIND_PREFIXES: {}", e)))
    }

    /// An unknown name is an error rather than a silent fall back to the
    /// in-memory store.
    pub fn store_backend(&self) -> ApiResult<StoreBackend> {
        match self.store.as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            other => Err(ApiError::invalid_input(format!(
                "SMD_STORE: unknown backend '{}', expected 'memory' or 'file'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ApiConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() -> ApiResult<()> {
        let config = config_from(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.store_backend()?, StoreBackend::Memory);
        assert!(!config.enforce_unique_ids);
        assert_eq!(config.socket_addr()?.port(), 27779);
        assert_eq!(config.kind_prefixes()?.prefix_for("Component"), Some("com"));
        assert_eq!(config.version_policy()?.default_version(), "v1");
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> ApiResult<()> {
        let config = config_from(&[
            ("SMD_API_BIND", "127.0.0.1"),
            ("SMD_API_PORT", "8080"),
            ("SMD_STORE", "FILE"),
            ("SMD_DATA_DIR", "/tmp/smd"),
            ("SMD_SCHEMA_VERSIONS", "v2, v1"),
            ("SMD_ENFORCE_UNIQUE_IDS", "true"),
            ("SMD_LOG_FORMAT", "json"),
            ("SMD_EVENT_QUEUE_CAPACITY", "8"),
        ]);
        assert_eq!(config.socket_addr()?.to_string(), "127.0.0.1:8080");
        assert_eq!(config.store_backend()?, StoreBackend::File);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/smd"));
        assert_eq!(config.version_policy()?.default_version(), "v2");
        assert!(config.enforce_unique_ids);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.event_queue_capacity, 8);
        Ok(())
    }

    #[test]
    fn test_port_env_wins() {
        let config = config_from(&[("PORT", "9000"), ("SMD_API_PORT", "8080")]);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let config = config_from(&[
            ("SMD_API_PORT", "not-a-port"),
            ("SMD_EVENT_QUEUE_CAPACITY", "0"),
            ("SMD_SCHEMA_VERSIONS", " , "),
        ]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.event_queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.schema_versions, vec!["v1".to_string()]);
    }

    #[test]
    fn test_bad_kind_prefixes_rejected() {
        let config = config_from(&[("SMD_KIND_PREFIXES", "Component")]);
        assert!(config.kind_prefixes().is_err());
    }

    #[test]
    fn test_unknown_store_backend_rejected() {
        let config = config_from(&[("SMD_STORE", "fiel")]);
        let err = config.store_backend().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
        assert!(err.message.contains("fiel"));
    }
}
