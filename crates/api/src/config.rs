//! Process configuration, read from the environment once at startup.

use std::{env, fmt, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use carhub_observability::LogFormat;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DB_NAME: &str = "carRentalDB";
const DEV_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required when {context}")]
    Missing { key: &'static str, context: &'static str },

    #[error("invalid {key} value '{value}': {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Mongo { uri: String, database: String },
    Memory,
}

#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// RS256 identity tokens issued for a Firebase project.
    Firebase { project_id: String },
    /// Shared-secret tokens, for development and tests.
    Hs256 { secret: String },
}

impl AuthConfig {
    pub fn uses_dev_secret(&self) -> bool {
        matches!(self, AuthConfig::Hs256 { secret } if secret == DEV_SECRET)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::Firebase { project_id } => {
                f.debug_struct("Firebase").field("project_id", project_id).finish()
            }
            AuthConfig::Hs256 { .. } => f.debug_struct("Hs256").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset and blank values fall back to
    /// defaults; malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => parse("PORT", raw)?,
            None => {
                info!("PORT not set, using default: {DEFAULT_PORT}");
                DEFAULT_PORT
            }
        };

        let store = match get("STORE_BACKEND").as_deref() {
            None | Some("mongo") => StoreConfig::Mongo {
                uri: get("MONGODB_URI").unwrap_or_else(|| {
                    info!("MONGODB_URI not set, using default: {DEFAULT_MONGODB_URI}");
                    DEFAULT_MONGODB_URI.to_string()
                }),
                database: get("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            },
            Some("memory") => StoreConfig::Memory,
            Some(other) => {
                return Err(invalid("STORE_BACKEND", other, "expected mongo or memory"));
            }
        };

        let auth = match get("AUTH_MODE").as_deref() {
            None | Some("firebase") => AuthConfig::Firebase {
                project_id: get("FIREBASE_PROJECT_ID").ok_or(ConfigError::Missing {
                    key: "FIREBASE_PROJECT_ID",
                    context: "AUTH_MODE is firebase",
                })?,
            },
            Some("hs256") => AuthConfig::Hs256 {
                secret: get("JWT_SECRET").unwrap_or_else(|| {
                    warn!("JWT_SECRET not set; using insecure dev default");
                    DEV_SECRET.to_string()
                }),
            },
            Some(other) => return Err(invalid("AUTH_MODE", other, "expected firebase or hs256")),
        };

        Ok(Self { port, store, auth })
    }
}

/// Log format from `LOG_FORMAT`. Read before logging exists, so a bad value
/// falls back silently.
pub fn log_format_from_env() -> LogFormat {
    env::var("LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

fn parse<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
        value: raw.clone(),
    })
}

fn invalid(key: &'static str, value: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        message: message.to_string(),
    }
}
