//! Recipe entity - One ingredient line of a product's batch recipe.
//!
//! `quantity` is the amount of the ingredient (in the ingredient's unit) needed
//! for one batch of the product.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product this line belongs to
    pub product_id: i64,
    /// Ingredient consumed by this line
    pub ingredient_id: i64,
    /// Ingredient quantity per batch
    pub quantity: f64,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each recipe line belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Each recipe line references one ingredient
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
