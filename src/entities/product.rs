//! Product entity - Represents a sellable bakery item.
//!
//! `unit_cost` is derived from the product's recipe lines (see `core::cost`) and is
//! expressed per sellable unit, i.e. the batch ingredient cost divided by `batch_yield`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short unique product code (e.g., "CRO-01")
    #[sea_orm(unique)]
    pub code: String,
    /// Display name (e.g., "Butter Croissant")
    pub name: String,
    /// Ingredient cost of one sellable unit
    pub unit_cost: f64,
    /// Retail price of one unit
    pub selling_price: f64,
    /// Stock level under which the product is reported as low
    pub min_stock_level: i32,
    /// Waste share (percent) above which a stock entry is flagged
    pub max_waste_percent: f64,
    /// Number of units one recipe batch produces
    pub batch_yield: i32,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product has many recipe lines
    #[sea_orm(has_many = "super::recipe::Entity")]
    Recipes,
    /// One product has many stock entries
    #[sea_orm(has_many = "super::stock_entry::Entity")]
    StockEntries,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipes.def()
    }
}

impl Related<super::stock_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
