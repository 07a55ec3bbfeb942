//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

use lingualive_core::progression::{DEFAULT_LEVEL_THRESHOLD, XP_PER_TRANSLATION};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Absent means the translation cache is disabled and every lookup misses.
    pub redis_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub vision_model: String,
    pub content_model: String,
    pub storage_base_url: String,
    pub storage_api_key: Option<String>,
    pub cache_ttl: Duration,
    pub xp_per_translation: i64,
    pub level_xp_threshold: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load External Service Settings ---
        let redis_url = std::env::var("REDIS_URL").ok();
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        let vision_model =
            std::env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let content_model = std::env::var("CONTENT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let storage_base_url = std::env::var("STORAGE_BASE_URL")
            .map_err(|_| ConfigError::MissingVar("STORAGE_BASE_URL".to_string()))?;
        let storage_api_key = std::env::var("STORAGE_API_KEY").ok();

        // --- Load Progression Settings ---
        let cache_ttl_secs = parse_or_default("TRANSLATION_CACHE_TTL_SECS", 3600)?;
        let xp_per_translation = parse_or_default("XP_PER_TRANSLATION", XP_PER_TRANSLATION)?;
        let level_xp_threshold = parse_or_default("LEVEL_XP_THRESHOLD", DEFAULT_LEVEL_THRESHOLD)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            redis_url,
            openai_api_key,
            vision_model,
            content_model,
            storage_base_url,
            storage_api_key,
            cache_ttl: Duration::from_secs(cache_ttl_secs as u64),
            xp_per_translation,
            level_xp_threshold,
        })
    }
}

fn parse_or_default(var: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
