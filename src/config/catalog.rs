//! Item catalog seed loading from config.toml
//!
//! The items declared in the configuration file are inserted, together with
//! their initial price, the first time the server starts against an empty
//! catalog (see `core::catalog::seed_catalog`).

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// Items to seed
    #[serde(default)]
    pub items: Vec<ItemSeed>,
}

/// Configuration for a single catalog item
#[derive(Debug, Deserialize, Clone)]
pub struct ItemSeed {
    /// Catalog code
    pub codigo: String,
    /// Display name
    pub nombre: String,
    /// Unit of measure
    pub unidad: String,
    /// Category tag (rubro)
    pub categoria: String,
    /// Initial unit price, if any
    pub precio: Option<f64>,
    /// Date the initial price is effective from; defaults to today
    pub fecha: Option<NaiveDate>,
}

/// Loads the catalog seed from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}
