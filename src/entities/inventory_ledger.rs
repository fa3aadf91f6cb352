//! Inventory ledger entity - Append-only log of stock movements per location.
//!
//! Rows are never updated. `quantity_in_stock` is the running total of the
//! `(product_id, store_id)` counter right after the row was written.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why a ledger row was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum LedgerMovement {
    /// Units baked at the production center
    #[sea_orm(string_value = "production")]
    Production,
    /// Units sent out to a store
    #[sea_orm(string_value = "delivery")]
    Delivery,
    /// Manual correction
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

/// Inventory ledger database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_ledger")]
pub struct Model {
    /// Unique identifier for the ledger row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business date of the movement
    pub date: Date,
    /// Product moved
    pub product_id: i64,
    /// Location whose stock changed (the production center for central stock)
    pub store_id: i64,
    /// Kind of movement
    pub movement: LedgerMovement,
    /// Units produced by this event (zero for non-production movements)
    pub quantity_produced: i32,
    /// Signed change applied to the counter
    pub quantity_change: i32,
    /// Counter value after this row
    pub quantity_in_stock: i32,
    /// Free-text reason
    pub notes: Option<String>,
    /// When the row was written
    pub created_at: DateTime,
}

/// Defines relationships between ledger rows and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row concerns one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Each row concerns one location
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
