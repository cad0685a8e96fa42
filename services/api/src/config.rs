//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

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
    pub log_level: Level,
    pub printify_api_base: String,
    pub printify_api_token: Option<String>,
    pub printify_shop_id: String,
    pub stripe_api_base: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub openai_api_key: Option<String>,
    pub admin_password: String,
    pub admin_config_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure
    /// tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server settings ---
        // BIND_ADDRESS wins; PORT alone binds all interfaces on that port.
        let bind_address_str = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| {
            let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{port}")
        });
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Fulfillment platform ---
        let printify_api_base = std::env::var("PRINTIFY_API_BASE")
            .unwrap_or_else(|_| "https://api.printify.com/v1".to_string());
        let printify_api_token = std::env::var("PRINTIFY_API_TOKEN").ok();
        let printify_shop_id = std::env::var("PRINTIFY_SHOP_ID").unwrap_or_default();

        // --- Payment processor ---
        let stripe_api_base = std::env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string());
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY").ok();
        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET").ok();

        // --- Image generation ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Admin surface ---
        let admin_password = std::env::var("ADMIN_PASSWORD")
            .map_err(|_| ConfigError::MissingVar("ADMIN_PASSWORD".to_string()))?;
        let admin_config_path = std::env::var("ADMIN_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./adminConfig.json"));

        Ok(Self {
            bind_address,
            log_level,
            printify_api_base,
            printify_api_token,
            printify_shop_id,
            stripe_api_base,
            stripe_secret_key,
            stripe_webhook_secret,
            openai_api_key,
            admin_password,
            admin_config_path,
        })
    }
}
