// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use crate::spatial::DEFAULT_CLUSTER_RADIUS_METERS;
use std::env;

/// Day windows the map client offers.
pub const ALLOWED_DAY_WINDOWS: [u32; 4] = [1, 7, 30, 90];

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the association REST backend
    pub backend_url: String,
    /// Bearer token for the association backend, if it requires one
    pub backend_api_token: Option<String>,
    /// Backend request timeout in seconds
    pub backend_timeout_secs: u64,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Clustering radius in meters
    pub cluster_radius_m: f64,
    /// Day window used when the client does not pick one
    pub default_days: u32,
    /// Secret path segment for the live-update webhook
    pub webhook_path_uuid: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self::test_default()
    }
}

impl Config {
    /// Config for tests, pointing at nothing.
    pub fn test_default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            backend_api_token: None,
            backend_timeout_secs: 10,
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            cluster_radius_m: DEFAULT_CLUSTER_RADIUS_METERS,
            default_days: 7,
            webhook_path_uuid: "test-webhook-uuid".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let cluster_radius_m = match env::var("CLUSTER_RADIUS_METERS") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite() && *r > 0.0)
                .ok_or(ConfigError::Invalid("CLUSTER_RADIUS_METERS"))?,
            Err(_) => DEFAULT_CLUSTER_RADIUS_METERS,
        };

        let default_days = match env::var("DEFAULT_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|d| ALLOWED_DAY_WINDOWS.contains(d))
                .ok_or(ConfigError::Invalid("DEFAULT_DAYS"))?,
            Err(_) => 7,
        };

        Ok(Self {
            backend_url: env::var("BACKEND_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_URL"))?,
            backend_api_token: env::var("BACKEND_API_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            backend_timeout_secs: env::var("BACKEND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cluster_radius_m,
            default_days,
            webhook_path_uuid: env::var("WEBHOOK_PATH_UUID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("WEBHOOK_PATH_UUID"))?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so env mutation does not race with other tests in this module.
    #[test]
    fn test_config_from_env() {
        env::set_var("BACKEND_URL", "https://api.example.org/");
        env::set_var("WEBHOOK_PATH_UUID", "abc");
        env::remove_var("CLUSTER_RADIUS_METERS");
        env::remove_var("DEFAULT_DAYS");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.backend_url, "https://api.example.org");
        assert_eq!(config.cluster_radius_m, DEFAULT_CLUSTER_RADIUS_METERS);
        assert_eq!(config.default_days, 7);
        assert_eq!(config.port, 8080);

        env::set_var("DEFAULT_DAYS", "5");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("DEFAULT_DAYS"))
        ));

        env::set_var("DEFAULT_DAYS", "30");
        env::set_var("CLUSTER_RADIUS_METERS", "120");
        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.default_days, 30);
        assert_eq!(config.cluster_radius_m, 120.0);

        env::remove_var("DEFAULT_DAYS");
        env::remove_var("CLUSTER_RADIUS_METERS");
    }
}
