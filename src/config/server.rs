//! Server settings loaded from environment variables.
//!
//! All settings are optional; `.env` is loaded by `main` before this runs.

use crate::errors::{Error, Result};
use std::{path::PathBuf, time::Duration};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CATALOG_CONFIG: &str = "config.toml";

/// Settings for the HTTP server and its read-through cache.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on (`BIND_ADDRESS`)
    pub bind_address: String,
    /// Lifetime of cached read results (`CACHE_TTL_SECS`)
    pub cache_ttl: Duration,
    /// Path of the catalog seed file (`CATALOG_CONFIG`)
    pub catalog_config: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            catalog_config: PathBuf::from(DEFAULT_CATALOG_CONFIG),
        }
    }
}

/// Builds a [`ServerConfig`] from the process environment.
///
/// # Errors
/// Returns [`Error::Config`] if `CACHE_TTL_SECS` is set but not a whole number.
pub fn load_server_config() -> Result<ServerConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup<F>(lookup: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ServerConfig::default();

    let cache_ttl = match lookup("CACHE_TTL_SECS") {
        Some(raw) => {
            let secs = raw.trim().parse::<u64>().map_err(|e| Error::Config {
                message: format!("CACHE_TTL_SECS must be a whole number of seconds: {e}"),
            })?;
            Duration::from_secs(secs)
        }
        None => defaults.cache_ttl,
    };

    Ok(ServerConfig {
        bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
        cache_ttl,
        catalog_config: lookup("CATALOG_CONFIG").map_or(defaults.catalog_config, PathBuf::from),
    })
}
