// src/config.rs
use crate::infrastructure::tenancy::TenantSettings;
use std::{env, path::PathBuf};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    listen_addr: String,
    database_provider: String,
    database_url: String,
    tenant_settings_path: Option<PathBuf>,
    max_connections: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_database_provider() -> String {
    "sqlite".into()
}

fn default_database_url() -> String {
    "sqlite://tenant_audit.db?mode=rwc".into()
}

fn default_max_connections() -> u32 {
    16
}

impl AppConfig {
    /// Build configuration from environment variables. Uses sensible defaults
    /// for optional values and validates the rest.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Allow dotenv files to populate env vars when present.
        dotenvy::dotenv().ok();

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| default_listen_addr());
        let database_provider =
            env::var("DATABASE_PROVIDER").unwrap_or_else(|_| default_database_provider());
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url());
        let tenant_settings_path = env::var("TENANT_SETTINGS_PATH")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| {
                    ConfigError::Invalid("DB_MAX_CONNECTIONS must be a positive integer".into())
                })?,
            Err(_) => default_max_connections(),
        };

        Ok(Self {
            listen_addr,
            database_provider,
            database_url,
            tenant_settings_path,
            max_connections,
        })
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    pub fn database_provider(&self) -> &str {
        &self.database_provider
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// Tenant settings from `TENANT_SETTINGS_PATH`, or a document holding only
    /// the database defaults when no path is configured.
    pub fn tenant_settings(&self) -> Result<TenantSettings, ConfigError> {
        match &self.tenant_settings_path {
            Some(path) => {
                TenantSettings::from_path(path).map_err(|err| ConfigError::Invalid(err.to_string()))
            }
            None => Ok(TenantSettings::defaults_only(
                self.database_provider.clone(),
                self.database_url.clone(),
            )),
        }
    }
}
