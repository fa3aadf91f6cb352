//! Ingredient business logic.
//!
//! Changing an ingredient's `cost_per_unit` recalculates the unit cost of every product
//! whose recipe uses it, in the same transaction as the ingredient update.

use crate::{
    core::cost,
    entities::{Ingredient, ingredient, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Partial update for [`update_ingredient`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientUpdate {
    /// New name
    pub name: Option<String>,
    /// New cost per unit; cascades to product costs
    pub cost_per_unit: Option<f64>,
    /// New unit of measure
    pub unit: Option<String>,
}

/// Result of [`update_ingredient`].
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientUpdateOutcome {
    /// The ingredient after the update
    pub ingredient: ingredient::Model,
    /// Products whose unit cost was recalculated
    pub recalculated: Vec<product::Model>,
}

fn validate_cost(cost_per_unit: f64) -> Result<()> {
    if !cost_per_unit.is_finite() || cost_per_unit < 0.0 {
        return Err(Error::validation(
            "cost_per_unit",
            format!("must be a non-negative number, got {cost_per_unit}"),
        ));
    }
    Ok(())
}

/// Retrieves all ingredients ordered by name.
pub async fn get_all_ingredients<C>(db: &C) -> Result<Vec<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find()
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an ingredient by ID.
pub async fn get_ingredient_by_id<C>(db: &C, ingredient_id: i64) -> Result<Option<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an ingredient by exact name.
pub async fn get_ingredient_by_name<C>(db: &C, name: &str) -> Result<Option<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find()
        .filter(ingredient::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new ingredient.
///
/// # Errors
/// Returns an error if the name is empty or the cost is negative or not finite.
#[instrument(skip(db))]
pub async fn create_ingredient(
    db: &DatabaseConnection,
    name: String,
    cost_per_unit: f64,
    unit: String,
) -> Result<ingredient::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "Ingredient name cannot be empty"));
    }
    validate_cost(cost_per_unit)?;

    let ingredient = ingredient::ActiveModel {
        name: Set(name.trim().to_string()),
        cost_per_unit: Set(cost_per_unit),
        unit: Set(unit.trim().to_string()),
        ..Default::default()
    };
    ingredient.insert(db).await.map_err(Into::into)
}

/// Updates an ingredient and cascades a cost change to the products using it.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or the cost is invalid
/// - The ingredient does not exist
#[instrument(skip(db))]
pub async fn update_ingredient(
    db: &DatabaseConnection,
    ingredient_id: i64,
    changes: IngredientUpdate,
) -> Result<IngredientUpdateOutcome> {
    if let Some(name) = &changes.name {
        if name.trim().is_empty() {
            return Err(Error::validation("name", "Ingredient name cannot be empty"));
        }
    }
    if let Some(cost_per_unit) = changes.cost_per_unit {
        validate_cost(cost_per_unit)?;
    }

    let txn = db.begin().await?;

    let existing = get_ingredient_by_id(&txn, ingredient_id)
        .await?
        .ok_or_else(|| Error::not_found("Ingredient", ingredient_id))?;

    #[allow(clippy::float_cmp)]
    let cost_changed = changes
        .cost_per_unit
        .is_some_and(|cost| cost != existing.cost_per_unit);

    let mut active: ingredient::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(cost_per_unit) = changes.cost_per_unit {
        active.cost_per_unit = Set(cost_per_unit);
    }
    if let Some(unit) = changes.unit {
        active.unit = Set(unit.trim().to_string());
    }
    let ingredient = active.update(&txn).await?;

    let recalculated = if cost_changed {
        cost::recalculate_products_using_ingredient(&txn, ingredient_id).await?
    } else {
        Vec::new()
    };

    txn.commit().await?;

    if cost_changed {
        info!(
            "Ingredient '{}' now costs {:.4}/{}; recalculated {} product(s)",
            ingredient.name,
            ingredient.cost_per_unit,
            ingredient.unit,
            recalculated.len()
        );
    }

    Ok(IngredientUpdateOutcome {
        ingredient,
        recalculated,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{product::get_product_by_id, recipe::create_recipe};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_ingredient_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_ingredient(&db, String::new(), 1.0, "kg".to_string()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "name", .. }
        ));

        let result = create_ingredient(&db, "Flour".to_string(), -0.5, "kg".to_string()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "cost_per_unit",
                ..
            }
        ));

        let result =
            create_ingredient(&db, "Flour".to_string(), f64::INFINITY, "kg".to_string()).await;
        assert!(result.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_cost_change_cascades_to_products() -> Result<()> {
        let db = setup_test_db().await?;
        let croissant = create_test_product(&db, "CRO-01").await?;
        let baguette = create_test_product(&db, "BAG-01").await?;
        let butter = create_test_ingredient(&db, "Butter", 3.0).await?;
        let flour = create_test_ingredient(&db, "Flour", 0.5).await?;

        create_recipe(&db, croissant.id, butter.id, 1.0).await?;
        create_recipe(&db, croissant.id, flour.id, 2.0).await?;
        create_recipe(&db, baguette.id, flour.id, 4.0).await?;

        let outcome = update_ingredient(
            &db,
            flour.id,
            IngredientUpdate {
                cost_per_unit: Some(1.0),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(outcome.ingredient.cost_per_unit, 1.0);
        assert_eq!(outcome.recalculated.len(), 2);

        let croissant = get_product_by_id(&db, croissant.id).await?.unwrap();
        let baguette = get_product_by_id(&db, baguette.id).await?.unwrap();
        assert_eq!(croissant.unit_cost, 5.0);
        assert_eq!(baguette.unit_cost, 4.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_rename_does_not_recalculate() -> Result<()> {
        let db = setup_test_db().await?;
        let flour = create_test_ingredient(&db, "Flour", 0.5).await?;

        let outcome = update_ingredient(
            &db,
            flour.id,
            IngredientUpdate {
                name: Some("Wheat Flour".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(outcome.ingredient.name, "Wheat Flour");
        assert!(outcome.recalculated.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_ingredient() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_ingredient(&db, 77, IngredientUpdate::default()).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }
}
