//! Inventory level entity - Current stock counter per `(product_id, store_id)`.
//!
//! The counter is only ever changed through `core::ledger`, which writes a matching
//! ledger row in the same transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory level database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_levels")]
pub struct Model {
    /// Unique identifier for the counter
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product tracked
    pub product_id: i64,
    /// Location tracked
    pub store_id: i64,
    /// Units on hand, never negative
    pub quantity: i32,
    /// When the counter last moved
    pub updated_at: DateTime,
}

/// Defines relationships between counters and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each counter tracks one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Each counter tracks one location
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
