/// Catalog (stores, ingredients, products, recipes) loading from config.toml
pub mod catalog;

/// Database configuration and connection management
pub mod database;

/// Runtime settings from environment variables
pub mod settings;
