//! Application settings.
//!
//! Loaded from an optional `settings` file (TOML) overlaid with
//! `FLORIN__*` environment variables (`__` as the section separator, e.g.
//! `FLORIN__SERVER__PORT=8080`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub server: Http,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub reconciler: ReconcilerSettings,
    #[serde(default)]
    pub rate_limit: RateLimit,
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate_usd_to_eur: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Where the data lives. Postgres is the deployment target; sqlite keeps
/// local development and tests self-contained.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "driver", rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite {
        path: String,
    },
    Postgres {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

impl Default for Database {
    fn default() -> Self {
        Database::Sqlite {
            path: "./florin.db".to_string(),
        }
    }
}

impl Database {
    #[must_use]
    pub fn url(&self) -> String {
        match self {
            Database::Memory => "sqlite::memory:".to_string(),
            Database::Sqlite { path } => format!("sqlite:{path}?mode=rwc"),
            Database::Postgres {
                host,
                port,
                user,
                password,
                name,
            } => format!("postgres://{user}:{password}@{host}:{port}/{name}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl_seconds")]
    pub access_ttl_seconds: u64,
    #[serde(default = "default_refresh_ttl_seconds")]
    pub refresh_ttl_seconds: u64,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_ttl_seconds: default_access_ttl_seconds(),
            refresh_ttl_seconds: default_refresh_ttl_seconds(),
        }
    }
}

impl Auth {
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == default_jwt_secret()
    }
}

#[derive(Debug, Deserialize)]
pub struct ReconcilerSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_reconciler_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_reconciler_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_reconciler_stop_timeout_seconds")]
    pub stop_timeout_seconds: u64,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_reconciler_interval_seconds(),
            timeout_seconds: default_reconciler_timeout_seconds(),
            stop_timeout_seconds: default_reconciler_stop_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RateLimit {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rate_limit_rps")]
    pub rps: u32,
    #[serde(default = "default_rate_limit_burst")]
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            enabled: false,
            rps: default_rate_limit_rps(),
            burst: default_rate_limit_burst(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("FLORIN").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_jwt_secret() -> String {
    "florin-dev-secret".to_string()
}

fn default_access_ttl_seconds() -> u64 {
    15 * 60
}

fn default_refresh_ttl_seconds() -> u64 {
    30 * 24 * 60 * 60
}

fn default_reconciler_interval_seconds() -> u64 {
    10
}

fn default_reconciler_timeout_seconds() -> u64 {
    3
}

fn default_reconciler_stop_timeout_seconds() -> u64 {
    1
}

fn default_shutdown_timeout_seconds() -> u64 {
    3
}

fn default_rate_limit_rps() -> u32 {
    10
}

fn default_rate_limit_burst() -> u32 {
    20
}

fn default_exchange_rate() -> String {
    "0.92".to_string()
}
