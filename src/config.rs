//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::path::PathBuf;

/// Minimum length of the token signing key, in bytes.
const MIN_SIGNING_KEY_LEN: usize = 32;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID for Firestore
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Shared key used to verify identity-provider session tokens
    pub jwt_signing_key: Vec<u8>,
    /// Directory holding on-device guest storage
    pub local_storage_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::Invalid(format!(
                "JWT_SIGNING_KEY must be at least {} bytes",
                MIN_SIGNING_KEY_LEN
            )));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_signing_key,
            local_storage_dir: env::var("LOCAL_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/local")),
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            local_storage_dir: PathBuf::from("data/test-local"),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the env mutations don't race each other
    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "short");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));

        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!!");
        env::set_var("LOCAL_STORAGE_DIR", "/tmp/runlog-test");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!!");
        assert_eq!(config.local_storage_dir, PathBuf::from("/tmp/runlog-test"));
        assert_eq!(config.port, 8080);
    }
}
