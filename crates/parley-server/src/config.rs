//! Typed environment configuration. Values are read from process env
//! (after `dotenvy` has loaded `.env`), coerced against the type of their
//! default, and startup fails fast on a missing required key or an
//! unparseable value.

use std::env;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable '{key}' is missing")]
    Missing { key: String },
    #[error("environment variable '{key}' has invalid value '{value}' (expected {expected})")]
    Invalid {
        key: String,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub host: String,
    pub port: u16,
    /// Attach a permissive CORS layer (local frontend development).
    pub dev_cors: bool,
    /// Assistant integration is enabled only when a key is present.
    pub assistant_api_key: Option<String>,
    pub assistant_base_url: String,
    pub assistant_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: require_var("SECRET_KEY")?,
            algorithm: parse_algorithm(&var_or("ALGORITHM", "HS256"))?,
            access_token_expire_minutes: var_parsed("ACCESS_TOKEN_EXPIRE_MINUTES", 60)?,
            host: var_or("PARLEY_HOST", "0.0.0.0"),
            port: var_parsed("PARLEY_PORT", 8000)?,
            dev_cors: var_bool("PARLEY_DEV_CORS", true)?,
            assistant_api_key: optional_var("ASSISTANT_API_KEY"),
            assistant_base_url: var_or("ASSISTANT_BASE_URL", "https://api.openai.com/v1"),
            assistant_model: var_or("ASSISTANT_MODEL", "gpt-4o"),
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn require_var(key: &str) -> Result<String, ConfigError> {
    optional_var(key).ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

fn var_or(key: &str, default: &str) -> String {
    optional_var(key).unwrap_or_else(|| default.to_string())
}

fn var_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
            expected: std::any::type_name::<T>(),
        }),
        None => Ok(default),
    }
}

fn var_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "t" | "yes" | "y" => Ok(true),
            "false" | "0" | "f" | "no" | "n" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
                expected: "bool",
            }),
        },
        None => Ok(default),
    }
}

/// Only HMAC algorithms make sense with a shared secret.
fn parse_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    match raw {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ConfigError::Invalid {
            key: "ALGORITHM".to_string(),
            value: raw.to_string(),
            expected: "HS256, HS384 or HS512",
        }),
    }
}
