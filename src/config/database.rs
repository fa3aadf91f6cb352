//! Database configuration module for the bakery ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite unique constraints that the
//! entity macros cannot express are added as explicit indexes.

use crate::entities::{
    Delivery, Ingredient, InventoryLedger, InventoryLevel, Product, Recipe, Sale, StockEntry,
    Store, inventory_level, stock_entry,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default database location used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/bakery_ledger.sqlite?mode=rwc";

/// Establishes a connection to the given database URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// File path of a `sqlite://` URL, or `None` for in-memory and non-SQLite URLs.
#[must_use]
pub fn sqlite_file_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Creates the parent directory of a file-backed SQLite database.
///
/// # Errors
/// Returns `Error::Io` if the directory cannot be created.
pub fn ensure_database_dir(database_url: &str) -> Result<()> {
    let Some(parent) = sqlite_file_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };
    if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(&parent)?;
        debug!("Ensured database directory {}", parent.display());
    }
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

/// Creates all tables and unique indexes if they do not exist yet.
///
/// Parents are created before children so foreign keys resolve.
/// The `(date, product_id, store_id)` index on stock entries is what makes duplicate
/// submissions fail atomically at the storage layer.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Store).await?;
    create_table(db, &schema, Ingredient).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Recipe).await?;
    create_table(db, &schema, StockEntry).await?;
    create_table(db, &schema, Delivery).await?;
    create_table(db, &schema, Sale).await?;
    create_table(db, &schema, InventoryLedger).await?;
    create_table(db, &schema, InventoryLevel).await?;

    let stock_entry_key = Index::create()
        .name("idx_stock_entries_date_product_store")
        .table(StockEntry)
        .col(stock_entry::Column::Date)
        .col(stock_entry::Column::ProductId)
        .col(stock_entry::Column::StoreId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&stock_entry_key)).await?;

    let inventory_level_key = Index::create()
        .name("idx_inventory_levels_product_store")
        .table(InventoryLevel)
        .col(inventory_level::Column::ProductId)
        .col(inventory_level::Column::StoreId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&inventory_level_key)).await?;

    info!("Database schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        inventory_level::Model as InventoryLevelModel, product::Model as ProductModel,
        stock_entry::Model as StockEntryModel, store::Model as StoreModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<StoreModel> = Store::find().limit(1).all(&db).await?;
        let _: Vec<ProductModel> = Product::find().limit(1).all(&db).await?;
        let _: Vec<StockEntryModel> = StockEntry::find().limit(1).all(&db).await?;
        let _: Vec<InventoryLevelModel> = InventoryLevel::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path(DEFAULT_DATABASE_URL),
            Some(PathBuf::from("data/bakery_ledger.sqlite"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("sqlite://:memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/bakery"), None);
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
