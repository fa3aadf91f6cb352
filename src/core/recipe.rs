//! Recipe business logic - adding and removing ingredient lines.
//!
//! Both mutations recalculate the owning product's unit cost before committing.

use crate::{
    core::{cost, ingredient::get_ingredient_by_id, product::require_product},
    entities::{Recipe, recipe},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Lists the recipe lines of a product.
pub async fn get_recipe_for_product<C>(db: &C, product_id: i64) -> Result<Vec<recipe::Model>>
where
    C: ConnectionTrait,
{
    Recipe::find()
        .filter(recipe::Column::ProductId.eq(product_id))
        .order_by_asc(recipe::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds an ingredient line to a product's recipe and recalculates the product cost.
///
/// # Errors
/// Returns an error if:
/// - `quantity` is not a positive finite number
/// - The product or ingredient does not exist
#[instrument(skip(db))]
pub async fn create_recipe(
    db: &DatabaseConnection,
    product_id: i64,
    ingredient_id: i64,
    quantity: f64,
) -> Result<recipe::Model> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(Error::validation(
            "quantity",
            format!("must be greater than zero, got {quantity}"),
        ));
    }

    let txn = db.begin().await?;

    require_product(&txn, product_id).await?;
    get_ingredient_by_id(&txn, ingredient_id)
        .await?
        .ok_or_else(|| Error::not_found("Ingredient", ingredient_id))?;

    let line = recipe::ActiveModel {
        product_id: Set(product_id),
        ingredient_id: Set(ingredient_id),
        quantity: Set(quantity),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    cost::recalculate_product_cost(&txn, product_id).await?;

    txn.commit().await?;
    info!("Added ingredient {ingredient_id} x{quantity} to product {product_id}");
    Ok(line)
}

/// Removes a recipe line and recalculates the owning product's cost.
///
/// # Errors
/// Returns `Error::NotFound` if the line does not exist.
#[instrument(skip(db))]
pub async fn delete_recipe(db: &DatabaseConnection, recipe_id: i64) -> Result<recipe::Model> {
    let txn = db.begin().await?;

    let line = Recipe::find_by_id(recipe_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Recipe", recipe_id))?;

    Recipe::delete_by_id(recipe_id).exec(&txn).await?;
    cost::recalculate_product_cost(&txn, line.product_id).await?;

    txn.commit().await?;
    info!(
        "Removed ingredient {} from product {}",
        line.ingredient_id, line.product_id
    );
    Ok(line)
}
