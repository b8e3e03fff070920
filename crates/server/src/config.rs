//! Process configuration.
//!
//! Everything comes from the environment (optionally seeded from a `.env`
//! file). [`RawSettings`] is the untyped view the `config` crate deserializes
//! into; [`ServerConfig::from_raw`] validates it once at startup so request
//! handlers only ever see typed values.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::Uri;
use ingest::IngestPolicy;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_HOST: &str = "http://localhost";
const DEFAULT_PORT: u16 = 9000;

/// Configuration errors. Each one aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid HOST format. Expected valid URL")]
    InvalidHost,

    #[error("Invalid PORT format. Expected number")]
    InvalidPort,

    #[error("Invalid BIND_ADDR format. Expected IP address")]
    InvalidBindAddr,

    #[error("Invalid API_ALLOWED_ORIGINS format. Expected JSON array")]
    InvalidAllowedOrigins,

    #[error("Invalid API_SHARED_TOKENS format. Expected JSON object")]
    InvalidSharedTokens,

    #[error("Invalid ALLOWED_TYPES format. Expected JSON array")]
    InvalidAllowedTypes,

    #[error("Invalid {var} format. Expected number")]
    InvalidNumber { var: &'static str },

    #[error("invalid ingest policy: {0}")]
    Policy(#[from] ingest::ConfigError),

    #[error("failed to read environment: {0}")]
    Source(#[from] config::ConfigError),
}

/// Environment variables as read, before validation.
///
/// Field names are the lowercased variable names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    pub host: Option<String>,
    pub port: Option<String>,
    pub bind_addr: Option<String>,
    pub api_allowed_origins: Option<String>,
    pub api_shared_tokens: Option<String>,
    pub storage_dir: Option<String>,
    pub public_dir: Option<String>,
    pub max_images: Option<String>,
    pub max_size_bytes: Option<String>,
    pub allowed_types: Option<String>,
    pub request_timeout_secs: Option<String>,
    pub max_body_size_mb: Option<String>,
    pub log_level: Option<String>,
}

impl RawSettings {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Public base URL, used in log output.
    pub host: String,
    pub port: u16,
    pub bind_addr: IpAddr,
    /// CORS origins.
    pub allowed_origins: Vec<String>,
    /// Client name to shared token.
    pub shared_tokens: HashMap<String, String>,
    /// Private storage root; articles live under `images/articles/<id>`.
    pub storage_dir: PathBuf,
    /// Public root; `<public>/storage` links to the storage root.
    pub public_dir: PathBuf,
    pub ingest: IngestPolicy,
    pub timeout_secs: u64,
    pub max_body_size_mb: usize,
    pub log_level: String,
    /// Settings that fell back to a default, reported once logging is up.
    pub defaulted: Vec<&'static str>,
}

impl ServerConfig {
    /// Load `.env` if present, then read and validate the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_raw(RawSettings::from_env()?)
    }

    /// Validate raw settings.
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let mut defaulted = Vec::new();
        let host = match raw.host {
            Some(host) => parse_host(&host)?,
            None => {
                defaulted.push("HOST");
                DEFAULT_HOST.to_string()
            }
        };

        let port = match raw.port {
            Some(port) => parse_port(&port)?,
            None => {
                defaulted.push("PORT");
                DEFAULT_PORT
            }
        };

        let bind_addr = match raw.bind_addr {
            Some(addr) => addr
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr)?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let allowed_origins: Vec<String> = raw
            .api_allowed_origins
            .as_deref()
            .and_then(|value| serde_json::from_str(value).ok())
            .ok_or(ConfigError::InvalidAllowedOrigins)?;

        let shared_tokens: HashMap<String, String> = raw
            .api_shared_tokens
            .as_deref()
            .and_then(|value| serde_json::from_str(value).ok())
            .ok_or(ConfigError::InvalidSharedTokens)?;

        let mut ingest = IngestPolicy::default();
        if let Some(value) = raw.max_images {
            ingest.max_images = parse_number(&value, "MAX_IMAGES")?;
        }
        if let Some(value) = raw.max_size_bytes {
            ingest.max_size_bytes = parse_number(&value, "MAX_SIZE_BYTES")?;
        }
        if let Some(value) = raw.allowed_types {
            ingest.allowed_types =
                serde_json::from_str(&value).map_err(|_| ConfigError::InvalidAllowedTypes)?;
        }
        ingest.validate()?;

        let timeout_secs = match raw.request_timeout_secs {
            Some(value) => parse_number(&value, "REQUEST_TIMEOUT_SECS")?,
            None => 30,
        };
        let max_body_size_mb = match raw.max_body_size_mb {
            Some(value) => parse_number(&value, "MAX_BODY_SIZE_MB")?,
            None => 50,
        };

        Ok(Self {
            host,
            port,
            bind_addr,
            allowed_origins,
            shared_tokens,
            storage_dir: raw
                .storage_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("storage")),
            public_dir: raw
                .public_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            ingest,
            timeout_secs,
            max_body_size_mb,
            log_level: raw.log_level.unwrap_or_else(|| "info".to_string()),
            defaulted,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb.saturating_mul(1024 * 1024)
    }

    /// Path of the public symlink to the storage root.
    pub fn public_storage_link(&self) -> PathBuf {
        self.public_dir.join("storage")
    }

    /// Directory served under `/images`.
    pub fn public_images_dir(&self) -> PathBuf {
        self.public_storage_link().join("images").join("articles")
    }

    /// Directory holding one article's files. `article_id` must already be
    /// a safe path segment.
    pub fn article_dir(&self, article_id: &str) -> PathBuf {
        articles_root(&self.storage_dir).join(article_id)
    }
}

fn articles_root(storage_dir: &Path) -> PathBuf {
    storage_dir.join("images").join("articles")
}

fn parse_host(value: &str) -> Result<String, ConfigError> {
    let uri: Uri = value.parse().map_err(|_| ConfigError::InvalidHost)?;
    match (uri.scheme(), uri.host()) {
        (Some(_), Some(host)) if !host.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::InvalidHost),
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidPort);
    }
    match value.parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidPort),
        Ok(port) => Ok(port),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, var: &'static str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var })
}
