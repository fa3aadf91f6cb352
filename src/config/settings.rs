//! Runtime settings loaded from environment variables.
//!
//! Every value has a default so the binary runs with an empty environment; values
//! that are present but malformed are rejected rather than silently replaced.

use crate::config::database;
use crate::errors::{Error, Result};
use std::str::FromStr;

/// Name of the production center store when `PRODUCTION_CENTER_NAME` is unset.
pub const DEFAULT_PRODUCTION_CENTER_NAME: &str = "Production Center";
/// Discrepancy alert threshold in percent.
pub const DEFAULT_DISCREPANCY_THRESHOLD: f64 = 5.0;
/// Number of recent stock entries scanned for discrepancy alerts.
pub const DEFAULT_DISCREPANCY_WINDOW: u64 = 50;

/// Application settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `SeaORM` connection string
    pub database_url: String,
    /// Path of the TOML catalog used for seeding
    pub catalog_path: String,
    /// Store name designating the production center
    pub production_center_name: String,
    /// Minimum absolute discrepancy (percent) reported as an alert
    pub discrepancy_threshold: f64,
    /// Number of most recent stock entries scanned for alerts
    pub discrepancy_window: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: database::DEFAULT_DATABASE_URL.to_string(),
            catalog_path: "config.toml".to_string(),
            production_center_name: DEFAULT_PRODUCTION_CENTER_NAME.to_string(),
            discrepancy_threshold: DEFAULT_DISCREPANCY_THRESHOLD,
            discrepancy_window: DEFAULT_DISCREPANCY_WINDOW,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    /// Returns `Error::Config` when a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Used by `from_env` and tests.
    ///
    /// # Errors
    /// Returns `Error::Config` when a numeric variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            catalog_path: lookup("BAKERY_CATALOG").unwrap_or(defaults.catalog_path),
            production_center_name: lookup("PRODUCTION_CENTER_NAME")
                .unwrap_or(defaults.production_center_name),
            discrepancy_threshold: parse_var(&lookup, "DISCREPANCY_THRESHOLD")?
                .unwrap_or(defaults.discrepancy_threshold),
            discrepancy_window: parse_var(&lookup, "DISCREPANCY_WINDOW")?
                .unwrap_or(defaults.discrepancy_window),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| Error::Config {
                message: format!("{key} has invalid value '{raw}': {e}"),
            })
        })
        .transpose()
}
