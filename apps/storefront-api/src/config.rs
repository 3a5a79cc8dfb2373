//! Storefront API configuration.
//!
//! Layered with the `config` crate:
//!
//! ```text
//! built-in defaults
//!      │
//!      ▼
//! otherproteins.toml          (optional, working directory)
//!      │
//!      ▼
//! OTHERPROTEINS_* env vars    (OTHERPROTEINS_HTTP_PORT=9000, ...)
//! ```
//!
//! `SQLITE_PATH` is accepted as the default database path when
//! `OTHERPROTEINS_DATABASE_PATH` is not set.

use std::env;
use std::net::SocketAddr;

use chrono::Duration;
use serde::Deserialize;

use otherproteins_core::invoice::StoreDetails;
use otherproteins_core::validation::MAX_PRICE_CENTS;
use otherproteins_core::{Money, StorePolicy};
use otherproteins_db::DbConfig;

/// Signing secret used when none is configured. Only fit for development.
pub const DEV_JWT_SECRET: &str = "otherproteins-dev-secret-change-in-production";

/// Longest accepted cancellation window: one year.
pub const MAX_CANCELLATION_WINDOW_HOURS: i64 = 24 * 365;

/// Longest accepted token lifetime: 30 days.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 30 * 24 * 3600;

/// Storefront API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,

    pub http_host: String,
    pub http_port: u16,

    /// HS256 secret for bearer tokens
    pub jwt_secret: String,

    /// Bearer token lifetime in seconds
    pub token_lifetime_secs: i64,

    pub cancellation_window_hours: i64,
    pub free_shipping_threshold_cents: i64,
    pub shipping_fee_cents: i64,

    // Seller block printed on invoices
    pub store_name: String,
    pub store_address: String,
    pub store_tax_id: String,
    pub store_email: String,
}

impl ApiConfig {
    /// Load configuration from defaults, `otherproteins.toml` and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let store = StoreDetails::default();
        let database_path =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "./otherproteins.db".to_string());

        let settings = config::Config::builder()
            .set_default("database_path", database_path)?
            .set_default("max_connections", 5)?
            .set_default("http_host", "0.0.0.0")?
            .set_default("http_port", 8080)?
            .set_default("jwt_secret", DEV_JWT_SECRET)?
            .set_default("token_lifetime_secs", 86_400)? // 24 hours
            .set_default("cancellation_window_hours", 24)?
            .set_default("free_shipping_threshold_cents", 5000)?
            .set_default("shipping_fee_cents", 499)?
            .set_default("store_name", store.name)?
            .set_default("store_address", store.address)?
            .set_default("store_tax_id", store.tax_id)?
            .set_default("store_email", store.email)?
            .add_source(config::File::with_name("otherproteins").required(false))
            .add_source(config::Environment::with_prefix("OTHERPROTEINS").try_parsing(true))
            .build()?;

        let config: ApiConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&self.token_lifetime_secs) {
            return Err(ConfigError::InvalidValue("token_lifetime_secs".to_string()));
        }
        if !(1..=MAX_CANCELLATION_WINDOW_HOURS).contains(&self.cancellation_window_hours) {
            return Err(ConfigError::InvalidValue("cancellation_window_hours".to_string()));
        }
        if !(0..=MAX_PRICE_CENTS).contains(&self.free_shipping_threshold_cents) {
            return Err(ConfigError::InvalidValue("free_shipping_threshold_cents".to_string()));
        }
        if !(0..=MAX_PRICE_CENTS).contains(&self.shipping_fee_cents) {
            return Err(ConfigError::InvalidValue("shipping_fee_cents".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.http_host, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("http_host".to_string()))
    }

    /// Commercial rules derived from the configuration.
    pub fn policy(&self) -> StorePolicy {
        StorePolicy {
            cancellation_window: Duration::hours(self.cancellation_window_hours),
            free_shipping_threshold: Money::from_cents(self.free_shipping_threshold_cents),
            shipping_fee: Money::from_cents(self.shipping_fee_cents),
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn store_details(&self) -> StoreDetails {
        StoreDetails {
            name: self.store_name.clone(),
            address: self.store_address.clone(),
            tax_id: self.store_tax_id.clone(),
            email: self.store_email.clone(),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
