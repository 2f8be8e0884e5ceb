use crate::error::{MaintainerError, Result};
use std::env;
use tracing::warn;
use url::Url;

const DEFAULT_MAX_CONCURRENCY: usize = 10;
const DEFAULT_EACH_FETCH_NUM: usize = 10;
const DEFAULT_MAX_ERR: i32 = 5;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Validation engine configuration
    pub maintainer: MaintainerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct MaintainerConfig {
    /// Size of the report budget; the inventory client pools twice this many connections
    pub max_concurrency: usize,
    /// Candidates requested from the inventory per cycle
    pub each_fetch_num: usize,
    /// Base URL of the pxier inventory service, without a trailing slash
    pub pxier_base_url: String,
    /// URL fetched through each candidate to prove it forwards traffic
    pub check_connection_url: String,
    /// Error count at which a persisted proxy is reaped
    pub max_err: i32,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection string of the writable database
    pub write_db: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Minimum connections in pool
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            maintainer: MaintainerConfig {
                max_concurrency: get_count_or("MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?,
                each_fetch_num: get_count_or("EACH_FETCH_NUM", DEFAULT_EACH_FETCH_NUM)?,
                pxier_base_url: parse_base_url()?,
                check_connection_url: parse_check_url()?,
                max_err: parse_max_err()?,
            },
            database: DatabaseConfig {
                write_db: require_env("WRITE_DB")?,
                max_connections: get_env_or("DB_MAX_CONNECTIONS", "100")
                    .parse()
                    .map_err(|_| {
                        MaintainerError::InvalidConfig(
                            "DB_MAX_CONNECTIONS must be a valid number".into(),
                        )
                    })?,
                min_connections: get_env_or("DB_MIN_CONNECTIONS", "0").parse().map_err(|_| {
                    MaintainerError::InvalidConfig(
                        "DB_MIN_CONNECTIONS must be a valid number".into(),
                    )
                })?,
            },
        })
    }
}

impl LogConfig {
    /// Load logging settings; read separately so tracing is up before the rest is validated
    pub fn from_env() -> Self {
        LogConfig {
            level: get_env_or("LOG_LEVEL", "info"),
            format: get_env_or("LOG_FORMAT", "pretty"),
        }
    }
}

/// Read a positive count, falling back to `default` when unset or zero
fn get_count_or(key: &str, default: usize) -> Result<usize> {
    let raw = get_env_or(key, "0");
    let value: usize = raw.trim().parse().map_err(|_| {
        MaintainerError::InvalidConfig(format!("{} must be a valid number", key))
    })?;

    if value == 0 {
        warn!("missing {}, set to {}", key.to_lowercase(), default);
        return Ok(default);
    }

    Ok(value)
}

/// Error ceiling for the reaper; zero or negative means unset
fn parse_max_err() -> Result<i32> {
    let value: i32 = get_env_or("MAX_ERR", "0").trim().parse().map_err(|_| {
        MaintainerError::InvalidConfig("MAX_ERR must be a valid number".into())
    })?;

    if value <= 0 {
        warn!("missing max_err, set to {}", DEFAULT_MAX_ERR);
        return Ok(DEFAULT_MAX_ERR);
    }

    Ok(value)
}

fn parse_base_url() -> Result<String> {
    let raw = require_env("PXIER_BASE_URL")?;
    let url = Url::parse(raw.trim()).map_err(|e| {
        MaintainerError::InvalidConfig(format!("PXIER_BASE_URL must be a valid URL: {}", e))
    })?;

    if url.host_str().is_none() {
        return Err(MaintainerError::InvalidConfig(
            "PXIER_BASE_URL must include a host".into(),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_check_url() -> Result<String> {
    let raw = require_env("CHECK_CONNECTION_URL")?;
    let url = Url::parse(raw.trim()).map_err(|e| {
        MaintainerError::InvalidConfig(format!("CHECK_CONNECTION_URL must be a valid URL: {}", e))
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(MaintainerError::InvalidConfig(format!(
                "CHECK_CONNECTION_URL has unsupported scheme: {}",
                other
            )))
        }
    }

    if url.host_str().is_none() {
        return Err(MaintainerError::InvalidConfig(
            "CHECK_CONNECTION_URL must include a host".into(),
        ));
    }

    Ok(url.to_string())
}

/// Get a required, non-empty environment variable
fn require_env(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MaintainerError::MissingEnvVar(key.to_string())),
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}
