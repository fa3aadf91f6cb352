//! Seeding the catalog from the TOML configuration.
//!
//! Seeding is idempotent: stores and ingredients are matched by name, products by code
//! and recipe lines by `(product, ingredient)`. Existing records are left as they are,
//! so edits made through the application survive a restart.

use crate::{
    config::catalog::Catalog,
    core::{
        ingredient::{create_ingredient, get_ingredient_by_name},
        product::{NewProduct, create_product, get_product_by_code},
        recipe::{create_recipe, get_recipe_for_product},
        store::{create_store, get_store_by_name},
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Number of records inserted by [`seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Stores inserted
    pub stores: usize,
    /// Ingredients inserted
    pub ingredients: usize,
    /// Products inserted
    pub products: usize,
    /// Recipe lines inserted
    pub recipes: usize,
}

/// Inserts the catalog records that are not in the database yet.
///
/// Recipe lines go through the recipe operations, so product costs are recalculated as
/// lines are added.
///
/// # Errors
/// Returns an error if a record fails validation or a recipe line references a product
/// code or ingredient name that is neither in the catalog nor in the database.
#[instrument(skip(db, catalog))]
pub async fn seed_catalog(db: &DatabaseConnection, catalog: &Catalog) -> Result<SeedSummary> {
    info!(
        "Seeding catalog: {} stores, {} ingredients, {} products, {} recipe lines",
        catalog.stores.len(),
        catalog.ingredients.len(),
        catalog.products.len(),
        catalog.recipes.len()
    );
    let mut summary = SeedSummary::default();

    for cfg in &catalog.stores {
        if get_store_by_name(db, cfg.name.trim()).await?.is_some() {
            debug!("Store '{}' already exists. Skipping.", cfg.name);
            continue;
        }
        create_store(db, cfg.name.clone(), cfg.delivery_schedule).await?;
        summary.stores += 1;
    }

    for cfg in &catalog.ingredients {
        if get_ingredient_by_name(db, cfg.name.trim()).await?.is_some() {
            debug!("Ingredient '{}' already exists. Skipping.", cfg.name);
            continue;
        }
        create_ingredient(db, cfg.name.clone(), cfg.cost_per_unit, cfg.unit.clone()).await?;
        summary.ingredients += 1;
    }

    for cfg in &catalog.products {
        if get_product_by_code(db, cfg.code.trim()).await?.is_some() {
            debug!("Product '{}' already exists. Skipping.", cfg.code);
            continue;
        }
        create_product(
            db,
            NewProduct {
                code: cfg.code.clone(),
                name: cfg.name.clone(),
                selling_price: cfg.selling_price,
                min_stock_level: cfg.min_stock_level,
                max_waste_percent: cfg.max_waste_percent,
                batch_yield: cfg.batch_yield,
            },
        )
        .await?;
        summary.products += 1;
    }

    for cfg in &catalog.recipes {
        let product = get_product_by_code(db, cfg.product.trim())
            .await?
            .ok_or_else(|| Error::Config {
                message: format!("Recipe line references unknown product '{}'", cfg.product),
            })?;
        let ingredient = get_ingredient_by_name(db, cfg.ingredient.trim())
            .await?
            .ok_or_else(|| Error::Config {
                message: format!(
                    "Recipe line for '{}' references unknown ingredient '{}'",
                    cfg.product, cfg.ingredient
                ),
            })?;

        let already_listed = get_recipe_for_product(db, product.id)
            .await?
            .iter()
            .any(|line| line.ingredient_id == ingredient.id);
        if already_listed {
            debug!(
                "Recipe line {} -> {} already exists. Skipping.",
                cfg.product, cfg.ingredient
            );
            continue;
        }
        create_recipe(db, product.id, ingredient.id, cfg.quantity).await?;
        summary.recipes += 1;
    }

    if summary == SeedSummary::default() {
        info!("Catalog already seeded; nothing inserted");
    } else {
        info!("Seeded catalog: {summary:?}");
    }
    if catalog.stores.is_empty() {
        warn!("Catalog lists no stores");
    }
    Ok(summary)
}
