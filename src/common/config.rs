// src/common/config.rs
//! Runtime configuration read from the environment (and `.env` via dotenv)

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const DEFAULT_JWT_SECRET: &str = "replace_with_strong_secret";
const DEFAULT_JWT_REFRESH_SECRET: &str = "replace_with_strong_refresh_secret";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:3001,http://localhost:5173";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Session token settings handed to the session issuer
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

/// Google identity verification settings
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub tokeninfo_url: String,
    pub verify_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub reset_db: bool,
    pub cors_origins: Vec<String>,
    pub google: GoogleConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let client_id = var("GOOGLE_CLIENT_ID").ok_or(ConfigError::Missing("GOOGLE_CLIENT_ID"))?;

        let access_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the insecure default secret");
            DEFAULT_JWT_SECRET.to_string()
        });
        let refresh_secret = var("JWT_REFRESH_SECRET").unwrap_or_else(|| {
            warn!("JWT_REFRESH_SECRET not set, using the insecure default secret");
            DEFAULT_JWT_REFRESH_SECRET.to_string()
        });

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://identity_api.db".to_string()),
            port: parse_or("PORT", var("PORT"), 8080)?,
            reset_db: var("RESET_DB").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            cors_origins,
            google: GoogleConfig {
                client_id,
                tokeninfo_url: var("GOOGLE_TOKENINFO_URL")
                    .unwrap_or_else(|| DEFAULT_TOKENINFO_URL.to_string()),
                verify_timeout: Duration::from_secs(parse_or(
                    "IDENTITY_VERIFY_TIMEOUT_SECS",
                    var("IDENTITY_VERIFY_TIMEOUT_SECS"),
                    10,
                )?),
            },
            session: SessionConfig {
                access_secret,
                refresh_secret,
                access_ttl: chrono::Duration::minutes(parse_or(
                    "ACCESS_TOKEN_TTL_MINUTES",
                    var("ACCESS_TOKEN_TTL_MINUTES"),
                    60,
                )?),
                refresh_ttl: chrono::Duration::days(parse_or(
                    "REFRESH_TOKEN_TTL_DAYS",
                    var("REFRESH_TOKEN_TTL_DAYS"),
                    30,
                )?),
            },
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
