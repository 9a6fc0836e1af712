use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;

pub mod rules;

pub use rules::{RulesConfig, SuspiciousOrigin};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_format: LogFormat,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Postgres => f.write_str("postgres"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let store_backend: StoreBackend = env_parse("STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = env::var("DATABASE_URL").ok();

        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        Ok(Config {
            server_port: env_parse("SERVER_PORT", 3000)?,
            store_backend,
            database_url,
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5)?,
            log_format: env_parse("LOG_FORMAT", LogFormat::Pretty)?,
            rules: RulesConfig::from_env()?,
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL is not configured")
    }
}

/// Reads `key` from the environment, falling back to `default` when unset.
pub(crate) fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e)),
        Err(_) => Ok(default),
    }
}
