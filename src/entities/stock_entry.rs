//! Stock entry entity - The daily count of one product at one store.
//!
//! At most one entry exists per `(date, product_id, store_id)`; the constraint is a
//! unique index created alongside the table (see `config::database`).
//! `expected_stock` and `discrepancy` are computed by `core::reconciliation`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stock entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business date of the count
    pub date: Date,
    /// Product counted
    pub product_id: i64,
    /// Store where the count happened
    pub store_id: i64,
    /// Units delivered to the store that day
    pub delivered: i32,
    /// Physical stock counted by staff at the end of the period
    pub reported_stock: i32,
    /// Units thrown away
    pub waste: i32,
    /// Units sold, as entered on the stock sheet
    pub sales: i32,
    /// Stock predicted from the previous count and the day's movements
    pub expected_stock: i32,
    /// `reported_stock` as it was when the entry was created
    pub reported_remaining: i32,
    /// Percentage deviation of reported from expected stock
    pub discrepancy: f64,
    /// When the entry was created
    pub created_at: DateTime,
    /// When the entry was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between `StockEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Each entry belongs to one store
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
