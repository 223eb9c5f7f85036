// ============================================================================
// Gatehouse Config - Centralized configuration management
// ============================================================================
//
// This crate provides centralized configuration for the Gatehouse gateway.
// Supports loading from environment variables with sensible defaults.
//
// ============================================================================

mod constants;
mod gate;
mod routes;
mod security;

pub use gate::{GateConfig, RetryConfig};
pub use routes::RoutesConfig;
pub use security::SecurityConfig;

use anyhow::Result;
use constants::*;

/// Main configuration structure for the Gatehouse gateway
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,

    /// Connection string for the profile store
    pub redis_url: String,

    /// Key prefix for profile hashes: "user:profile:{user_id}"
    pub profile_key_prefix: String,

    pub rust_log: String,

    // Sub-configurations
    pub security: SecurityConfig,
    pub gate: GateConfig,
    pub retry: RetryConfig,
    pub routes: RoutesConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let security = SecurityConfig::from_env()?;
        let gate = GateConfig::from_env();
        let retry = RetryConfig::from_env();
        let routes = RoutesConfig::from_env();

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            profile_key_prefix: std::env::var("PROFILE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_PROFILE_KEY_PREFIX.to_string()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            security,
            gate,
            retry,
            routes,
        })
    }

}

/// Parse an env var, falling back to the default on absence or parse failure
pub(crate) fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated env var into a list, with a default list
pub(crate) fn env_list(key: &str, default: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
