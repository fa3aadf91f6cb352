//! Cost engine - derives a product's unit cost from its recipe.
//!
//! The batch cost is the sum of `ingredient.cost_per_unit * recipe.quantity` over the
//! product's recipe lines and covers `batch_yield` units. The stored `unit_cost` is the
//! per-unit figure, `batch_cost / batch_yield`, so it can be compared directly with the
//! per-unit `selling_price`.
//!
//! Recalculation is an explicit operation: callers that change recipes, ingredient
//! costs or batch yields invoke it inside their own transaction.

use crate::{
    entities::{Ingredient, Product, Recipe, product, recipe},
    errors::Result,
};
use sea_orm::{QuerySelect, Set, prelude::*};
use serde::Serialize;
use tracing::debug;

/// Cost figures for one product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Ingredient cost of one batch
    pub batch_cost: f64,
    /// Ingredient cost of one sellable unit
    pub unit_cost: f64,
    /// `selling_price - unit_cost`
    pub margin_per_unit: f64,
    /// Margin as a percentage of the selling price, 0 when the price is 0
    pub margin_percent: f64,
}

/// Sums `(quantity, cost_per_unit)` pairs into a batch cost.
#[must_use]
pub fn calculate_batch_cost(lines: &[(f64, f64)]) -> f64 {
    lines
        .iter()
        .map(|(quantity, cost_per_unit)| quantity * cost_per_unit)
        .sum()
}

/// Converts a batch cost into a per-unit cost. A yield below one is treated as one.
#[must_use]
pub fn unit_cost_from_batch(batch_cost: f64, batch_yield: i32) -> f64 {
    batch_cost / f64::from(batch_yield.max(1))
}

/// Builds the full cost breakdown for a product priced at `selling_price`.
#[must_use]
pub fn cost_breakdown(batch_cost: f64, batch_yield: i32, selling_price: f64) -> CostBreakdown {
    let unit_cost = unit_cost_from_batch(batch_cost, batch_yield);
    let margin_per_unit = selling_price - unit_cost;
    let margin_percent = if selling_price > 0.0 {
        margin_per_unit / selling_price * 100.0
    } else {
        0.0
    };
    CostBreakdown {
        batch_cost,
        unit_cost,
        margin_per_unit,
        margin_percent,
    }
}

async fn recipe_lines<C>(db: &C, product_id: i64) -> Result<Vec<(f64, f64)>>
where
    C: ConnectionTrait,
{
    let lines = Recipe::find()
        .filter(recipe::Column::ProductId.eq(product_id))
        .find_also_related(Ingredient)
        .all(db)
        .await?;

    Ok(lines
        .into_iter()
        .filter_map(|(line, ingredient)| {
            ingredient.map(|ingredient| (line.quantity, ingredient.cost_per_unit))
        })
        .collect())
}

/// Computes the cost breakdown of a product from its current recipe without saving.
///
/// Returns `None` if the product does not exist.
pub async fn get_cost_breakdown<C>(db: &C, product_id: i64) -> Result<Option<CostBreakdown>>
where
    C: ConnectionTrait,
{
    let Some(product) = Product::find_by_id(product_id).one(db).await? else {
        return Ok(None);
    };
    let batch_cost = calculate_batch_cost(&recipe_lines(db, product_id).await?);
    Ok(Some(cost_breakdown(
        batch_cost,
        product.batch_yield,
        product.selling_price,
    )))
}

/// Recomputes and stores the unit cost of a product from its recipe lines.
///
/// A product without recipe lines ends up with a unit cost of zero. Returns `None`
/// (and writes nothing) when the product does not exist.
pub async fn recalculate_product_cost<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    let Some(product) = Product::find_by_id(product_id).one(db).await? else {
        debug!("Skipping cost recalculation for missing product {product_id}");
        return Ok(None);
    };

    let batch_cost = calculate_batch_cost(&recipe_lines(db, product_id).await?);
    let unit_cost = unit_cost_from_batch(batch_cost, product.batch_yield);
    debug!(
        "Product {} batch cost {batch_cost:.4}, unit cost {unit_cost:.4}",
        product.code
    );

    let mut active: product::ActiveModel = product.into();
    active.unit_cost = Set(unit_cost);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    Ok(Some(active.update(db).await?))
}

/// Returns the distinct ids of products whose recipe uses the ingredient.
pub async fn get_products_using_ingredient<C>(db: &C, ingredient_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    Recipe::find()
        .select_only()
        .column(recipe::Column::ProductId)
        .filter(recipe::Column::IngredientId.eq(ingredient_id))
        .distinct()
        .into_tuple::<i64>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Recalculates every product that uses the ingredient and returns the updated products.
pub async fn recalculate_products_using_ingredient<C>(
    db: &C,
    ingredient_id: i64,
) -> Result<Vec<product::Model>>
where
    C: ConnectionTrait,
{
    let mut updated = Vec::new();
    for product_id in get_products_using_ingredient(db, ingredient_id).await? {
        if let Some(product) = recalculate_product_cost(db, product_id).await? {
            updated.push(product);
        }
    }
    Ok(updated)
}
