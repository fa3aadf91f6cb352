//! Catalog loading from config.toml
//!
//! The catalog file describes stores, ingredients, products and recipe lines used to
//! seed an empty database (see `core::seed`). Recipe lines reference products by code
//! and ingredients by name so the file stays readable without database ids.

use crate::entities::DeliverySchedule;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire catalog file
#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    /// Stores, including the production center
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
    /// Ingredients with their purchase costs
    #[serde(default)]
    pub ingredients: Vec<IngredientConfig>,
    /// Sellable products
    #[serde(default)]
    pub products: Vec<ProductConfig>,
    /// Recipe lines linking products to ingredients
    #[serde(default)]
    pub recipes: Vec<RecipeConfig>,
}

/// Configuration for a single store
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Store name
    pub name: String,
    /// Delivery cadence, defaults to daily
    #[serde(default = "default_schedule")]
    pub delivery_schedule: DeliverySchedule,
}

/// Configuration for a single ingredient
#[derive(Debug, Deserialize, Clone)]
pub struct IngredientConfig {
    /// Ingredient name
    pub name: String,
    /// Cost of one unit
    pub cost_per_unit: f64,
    /// Unit of measure
    pub unit: String,
}

/// Configuration for a single product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Unique product code
    pub code: String,
    /// Display name
    pub name: String,
    /// Retail price per unit
    pub selling_price: f64,
    /// Low-stock threshold
    #[serde(default)]
    pub min_stock_level: i32,
    /// Allowed waste share in percent
    #[serde(default = "default_max_waste_percent")]
    pub max_waste_percent: f64,
    /// Units per batch
    #[serde(default = "default_batch_yield")]
    pub batch_yield: i32,
}

/// Configuration for a single recipe line
#[derive(Debug, Deserialize, Clone)]
pub struct RecipeConfig {
    /// Code of the product the line belongs to
    pub product: String,
    /// Name of the ingredient used
    pub ingredient: String,
    /// Quantity per batch
    pub quantity: f64,
}

const fn default_schedule() -> DeliverySchedule {
    DeliverySchedule::Daily
}

const fn default_max_waste_percent() -> f64 {
    crate::core::product::DEFAULT_MAX_WASTE_PERCENT
}

const fn default_batch_yield() -> i32 {
    1
}

/// Loads the catalog from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file: {e}"),
    })?;

    parse_catalog(&contents)
}

/// Parses catalog TOML text.
///
/// # Errors
/// Returns `Error::Config` if the text is not a valid catalog.
pub fn parse_catalog(contents: &str) -> Result<Catalog> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog: {e}"),
    })
}
