use crate::core::{AppError, Result};
use std::fmt;
use std::str::FromStr;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Deployment environment, selects the defaults below
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvType {
    Prod,
    Dev,
    Test,
}

impl FromStr for AppEnvType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(AppEnvType::Prod),
            "dev" | "development" => Ok(AppEnvType::Dev),
            "test" => Ok(AppEnvType::Test),
            other => Err(AppError::configuration(format!("Invalid APP_ENV '{}'", other))),
        }
    }
}

impl fmt::Display for AppEnvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEnvType::Prod => write!(f, "prod"),
            AppEnvType::Dev => write!(f, "dev"),
            AppEnvType::Test => write!(f, "test"),
        }
    }
}

/// String whose value never shows up in logs
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(\"**********\")")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("**********")
    }
}

/// Main application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub app_env: AppEnvType,
    pub debug: bool,
    pub title: String,
    pub version: String,
    pub secret_key: SecretString,
    pub logging_level: String,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl AppSettings {
    /// Load settings from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = match lookup("APP_ENV") {
            Some(value) => value.parse()?,
            None => AppEnvType::Prod,
        };

        let (debug, title, secret_key, logging_level) = match app_env {
            AppEnvType::Prod => (false, "Service Layout", None, "info"),
            AppEnvType::Dev => (true, "Dev Service Layout", Some("dev_secret"), "debug"),
            AppEnvType::Test => (true, "Test Service Layout", Some("test_secret"), "debug"),
        };

        let debug = match lookup("DEBUG") {
            Some(value) => parse_bool("DEBUG", &value)?,
            None => debug,
        };

        let secret_key = lookup("SECRET_KEY")
            .or_else(|| secret_key.map(str::to_string))
            .ok_or_else(|| AppError::configuration("SECRET_KEY not set"))?;

        Ok(AppSettings {
            app_env,
            debug,
            title: lookup("APP_TITLE").unwrap_or_else(|| title.to_string()),
            version: lookup("APP_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            secret_key: SecretString::new(secret_key),
            logging_level: lookup("LOG_LEVEL")
                .unwrap_or_else(|| logging_level.to_string())
                .to_ascii_lowercase(),
            database: DatabaseConfig::from_lookup(&lookup)?,
            server: ServerConfig::from_lookup(&lookup)?,
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging_level.as_str()) {
            return Err(AppError::configuration(format!(
                "Invalid LOG_LEVEL '{}'",
                self.logging_level
            )));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::configuration(
                "Database max connections must be greater than 0",
            ));
        }

        if self.database.pool_size > self.database.max_connections {
            return Err(AppError::configuration(
                "Database pool size cannot exceed max connections",
            ));
        }

        if self.server.workers == 0 {
            return Err(AppError::configuration(
                "Server workers must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::configuration(format!("Invalid {}", key))),
    }
}

/// Parse a numeric variable, falling back to `default` when unset
pub(crate) fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .parse()
            .map_err(|_| AppError::configuration(format!("Invalid {}", key))),
        None => Ok(default),
    }
}
