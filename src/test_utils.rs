//! Shared test utilities for the bakery ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        ingredient,
        product::{self, NewProduct},
        reconciliation::StockCounts,
        store::{self, ProductionCenter},
    },
    entities::{self, DeliverySchedule},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Name of the production center store in test databases.
pub const TEST_PRODUCTION_CENTER: &str = "Production Center";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in a fresh temporary directory.
///
/// Unlike `sqlite::memory:`, the pool can hand out several connections, so concurrent
/// transactions really interleave. Keep the returned directory alive for the test.
pub async fn setup_file_db() -> Result<(tempfile::TempDir, DatabaseConnection)> {
    let dir = tempfile::tempdir()?;
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("ledger.sqlite").display()
    );
    let db = sea_orm::Database::connect(url).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((dir, db))
}

/// A fixed business date in March 2024, `day` of the month.
///
/// # Panics
/// Panics if `day` is not a valid day of March.
#[allow(clippy::unwrap_used)]
pub fn test_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

/// Builds stock counts in `delivered, waste, sales, reported_stock` order.
pub const fn counts(delivered: i32, waste: i32, sales: i32, reported_stock: i32) -> StockCounts {
    StockCounts {
        delivered,
        waste,
        sales,
        reported_stock,
    }
}

/// Creates a store with a daily delivery schedule.
pub async fn create_test_store(db: &DatabaseConnection, name: &str) -> Result<entities::store::Model> {
    store::create_store(db, name.to_string(), DeliverySchedule::Daily).await
}

/// Creates the production center store and returns its handle.
pub async fn create_production_center(db: &DatabaseConnection) -> Result<ProductionCenter> {
    let center = create_test_store(db, TEST_PRODUCTION_CENTER).await?;
    Ok(ProductionCenter {
        store_id: center.id,
    })
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * name: `"Test {code}"`
/// * `selling_price`: 2.5
/// * `min_stock_level`: 0
/// * `max_waste_percent`: 5.0
/// * `batch_yield`: 1
pub async fn create_test_product(
    db: &DatabaseConnection,
    code: &str,
) -> Result<entities::product::Model> {
    product::create_product(db, NewProduct::new(code, format!("Test {code}"), 2.5)).await
}

/// Creates a test product with custom price, minimum stock and batch yield.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    code: &str,
    selling_price: f64,
    min_stock_level: i32,
    batch_yield: i32,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            min_stock_level,
            batch_yield,
            ..NewProduct::new(code, format!("Test {code}"), selling_price)
        },
    )
    .await
}

/// Creates an ingredient measured in kilograms.
pub async fn create_test_ingredient(
    db: &DatabaseConnection,
    name: &str,
    cost_per_unit: f64,
) -> Result<entities::ingredient::Model> {
    ingredient::create_ingredient(db, name.to_string(), cost_per_unit, "kg".to_string()).await
}

/// Sets up a complete stock-tracking environment.
/// Returns (db, production center, retail store, product) for ledger and reconciliation tests.
pub async fn setup_with_stock_fixture() -> Result<(
    DatabaseConnection,
    ProductionCenter,
    entities::store::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let center = create_production_center(&db).await?;
    let store = create_test_store(&db, "Main Street").await?;
    let product = create_test_product(&db, "CRO-01").await?;
    Ok((db, center, store, product))
}
