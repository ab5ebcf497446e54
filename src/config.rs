// flow-backend/src/config.rs
use std::env;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be set when {reason}")]
    Missing {
        key: &'static str,
        reason: &'static str,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub authorize_url: Url,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub pool_size: u32,
    pub frontend_origins: Vec<String>,
    pub session_cookie_secure: bool,
    pub spotify: SpotifyConfig,
}

const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_url(key: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|e| ConfigError::Invalid {
        key,
        value,
        reason: e.to_string(),
    })
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let database_url = get("DATABASE_URL");
        let storage_backend = match get("STORAGE_BACKEND").as_deref() {
            Some("memory") => StorageBackend::Memory,
            Some("postgres") => StorageBackend::Postgres,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                    reason: "expected 'memory' or 'postgres'".to_string(),
                })
            }
            None if database_url.is_some() => StorageBackend::Postgres,
            None => StorageBackend::Memory,
        };
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing {
                key: "DATABASE_URL",
                reason: "STORAGE_BACKEND is 'postgres'",
            });
        }

        let pool_size = match get("DATABASE_POOL_SIZE") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_POOL_SIZE",
                        value: raw,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            },
            None => 10,
        };

        let frontend_origins = vec![
            get("FRONTEND_URL_PROD").unwrap_or_else(|| "http://localhost:5000".to_string()),
            get("FRONTEND_URL_DEV").unwrap_or_else(|| "http://localhost:3000".to_string()),
        ];

        let session_cookie_secure = match get("SESSION_COOKIE_SECURE") {
            Some(raw) => parse_bool("SESSION_COOKIE_SECURE", raw)?,
            None => false,
        };

        let spotify = SpotifyConfig {
            client_id: get("SPOTIFY_CLIENT_ID").unwrap_or_else(|| "flow-demo-client".to_string()),
            authorize_url: parse_url(
                "SPOTIFY_AUTHORIZE_URL",
                get("SPOTIFY_AUTHORIZE_URL").unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string()),
            )?,
            redirect_uri: get("SPOTIFY_REDIRECT_URI").unwrap_or_else(|| {
                format!("http://localhost:{}/api/spotify/callback", port)
            }),
        };

        Ok(AppConfig {
            host,
            port,
            database_url,
            storage_backend,
            pool_size,
            frontend_origins,
            session_cookie_secure,
            spotify,
        })
    }
}
