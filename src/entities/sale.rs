//! Sale entity - A recorded sale, independent from the `sales` column of stock entries.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a sale record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum SaleSource {
    /// Typed in by staff
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Imported from another system
    #[sea_orm(string_value = "other")]
    Other,
}

/// Sale database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business date of the sale
    pub date: Date,
    /// Selling store
    pub store_id: i64,
    /// Product sold
    pub product_id: i64,
    /// Units sold
    pub quantity: i32,
    /// Price charged per unit, if known
    pub unit_price: Option<f64>,
    /// Origin of the record
    pub source: SaleSource,
    /// When the sale was recorded
    pub created_at: DateTime,
}

/// Defines relationships between Sale and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each sale happens at one store
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
    /// Each sale is for one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
