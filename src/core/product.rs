//! Product business logic - Handles all product-related operations.
//!
//! This module provides functions for creating, retrieving, updating and deleting
//! products. A product's `unit_cost` is owned by the cost engine whenever the product
//! has recipe lines; direct edits are only accepted for products without a recipe.

use crate::{
    core::cost,
    entities::{
        Delivery, InventoryLedger, InventoryLevel, Product, Recipe, Sale, StockEntry, delivery,
        inventory_ledger, inventory_level, product, recipe, sale, stock_entry,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Waste share (percent) tolerated when a product does not specify one.
pub const DEFAULT_MAX_WASTE_PERCENT: f64 = 5.0;

/// Input for [`create_product`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Unique product code
    pub code: String,
    /// Display name
    pub name: String,
    /// Retail price per unit
    pub selling_price: f64,
    /// Low-stock threshold
    pub min_stock_level: i32,
    /// Allowed waste share in percent
    pub max_waste_percent: f64,
    /// Units per batch
    pub batch_yield: i32,
}

impl NewProduct {
    /// A product with default thresholds and a batch yield of one.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, selling_price: f64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            selling_price,
            min_stock_level: 0,
            max_waste_percent: DEFAULT_MAX_WASTE_PERCENT,
            batch_yield: 1,
        }
    }
}

/// Partial update for [`update_product`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    /// New display name
    pub name: Option<String>,
    /// New retail price
    pub selling_price: Option<f64>,
    /// New low-stock threshold
    pub min_stock_level: Option<i32>,
    /// New waste tolerance
    pub max_waste_percent: Option<f64>,
    /// New batch yield; triggers cost recalculation
    pub batch_yield: Option<i32>,
    /// Direct unit cost, only for products without recipe lines
    pub unit_cost: Option<f64>,
}

fn validate_money(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(
            field,
            format!("must be a non-negative number, got {value}"),
        ));
    }
    Ok(())
}

fn validate_batch_yield(batch_yield: i32) -> Result<()> {
    if batch_yield < 1 {
        return Err(Error::validation(
            "batch_yield",
            format!("must be at least 1, got {batch_yield}"),
        ));
    }
    Ok(())
}

fn validate_min_stock_level(level: i32) -> Result<()> {
    if level < 0 {
        return Err(Error::validation(
            "min_stock_level",
            format!("cannot be negative, got {level}"),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "Product name cannot be empty"));
    }
    Ok(())
}

/// Retrieves all products ordered alphabetically by name.
pub async fn get_all_products<C>(db: &C) -> Result<Vec<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by its unique code.
pub async fn get_product_by_code<C>(db: &C, code: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a product or fails with `Error::NotFound`.
pub async fn require_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))
}

/// Creates a new product with a zero unit cost; the cost engine fills it in once
/// recipe lines are added.
///
/// # Errors
/// Returns an error if:
/// - The code or name is empty
/// - A price or percentage is negative or not finite
/// - `batch_yield` is below 1 or `min_stock_level` is negative
/// - The code is already taken (`Error::Conflict`)
#[instrument(skip(db))]
pub async fn create_product(db: &DatabaseConnection, input: NewProduct) -> Result<product::Model> {
    if input.code.trim().is_empty() {
        return Err(Error::validation("code", "Product code cannot be empty"));
    }
    validate_name(&input.name)?;
    validate_money("selling_price", input.selling_price)?;
    validate_money("max_waste_percent", input.max_waste_percent)?;
    validate_min_stock_level(input.min_stock_level)?;
    validate_batch_yield(input.batch_yield)?;

    let now = chrono::Utc::now().naive_utc();

    let product = product::ActiveModel {
        code: Set(input.code.trim().to_string()),
        name: Set(input.name.trim().to_string()),
        unit_cost: Set(0.0),
        selling_price: Set(input.selling_price),
        min_stock_level: Set(input.min_stock_level),
        max_waste_percent: Set(input.max_waste_percent),
        batch_yield: Set(input.batch_yield),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let product = product.insert(db).await?;
    info!("Created product '{}' ({})", product.name, product.code);
    Ok(product)
}

/// Applies a partial update to a product.
///
/// A changed `batch_yield` recalculates the unit cost in the same transaction.
///
/// # Errors
/// Returns an error if:
/// - Any supplied field fails validation
/// - `unit_cost` is supplied for a product that has recipe lines
/// - The product does not exist
#[instrument(skip(db))]
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    changes: ProductUpdate,
) -> Result<product::Model> {
    if let Some(name) = &changes.name {
        validate_name(name)?;
    }
    if let Some(price) = changes.selling_price {
        validate_money("selling_price", price)?;
    }
    if let Some(percent) = changes.max_waste_percent {
        validate_money("max_waste_percent", percent)?;
    }
    if let Some(level) = changes.min_stock_level {
        validate_min_stock_level(level)?;
    }
    if let Some(batch_yield) = changes.batch_yield {
        validate_batch_yield(batch_yield)?;
    }
    if let Some(unit_cost) = changes.unit_cost {
        validate_money("unit_cost", unit_cost)?;
    }

    let txn = db.begin().await?;

    let existing = require_product(&txn, product_id).await?;

    if changes.unit_cost.is_some() {
        let recipe_lines = Recipe::find()
            .filter(recipe::Column::ProductId.eq(product_id))
            .count(&txn)
            .await?;
        if recipe_lines > 0 {
            return Err(Error::validation(
                "unit_cost",
                "unit cost is derived from the recipe and cannot be set directly",
            ));
        }
    }

    let yield_changed = changes
        .batch_yield
        .is_some_and(|batch_yield| batch_yield != existing.batch_yield);

    let mut product: product::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        product.name = Set(name.trim().to_string());
    }
    if let Some(price) = changes.selling_price {
        product.selling_price = Set(price);
    }
    if let Some(level) = changes.min_stock_level {
        product.min_stock_level = Set(level);
    }
    if let Some(percent) = changes.max_waste_percent {
        product.max_waste_percent = Set(percent);
    }
    if let Some(batch_yield) = changes.batch_yield {
        product.batch_yield = Set(batch_yield);
    }
    if let Some(unit_cost) = changes.unit_cost {
        product.unit_cost = Set(unit_cost);
    }
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    let mut updated = product.update(&txn).await?;

    if yield_changed {
        if let Some(recalculated) = cost::recalculate_product_cost(&txn, product_id).await? {
            updated = recalculated;
        }
    }

    txn.commit().await?;
    Ok(updated)
}

/// Deletes a product together with everything that references it.
///
/// Recipe lines, ledger rows, stock counters, deliveries, sales and stock entries of
/// the product are removed in one transaction.
///
/// # Errors
/// Returns an error if the product does not exist or a delete fails.
#[instrument(skip(db))]
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    let txn = db.begin().await?;

    let product = require_product(&txn, product_id).await?;

    Recipe::delete_many()
        .filter(recipe::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    InventoryLedger::delete_many()
        .filter(inventory_ledger::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    InventoryLevel::delete_many()
        .filter(inventory_level::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Delivery::delete_many()
        .filter(delivery::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Sale::delete_many()
        .filter(sale::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    StockEntry::delete_many()
        .filter(stock_entry::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Product::delete_by_id(product_id).exec(&txn).await?;

    txn.commit().await?;
    info!("Deleted product '{}' ({})", product.name, product.code);
    Ok(product)
}
