//! Delivery entity - Goods sent from the production center to a store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Delivery database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deliveries")]
pub struct Model {
    /// Unique identifier for the delivery
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business date of the delivery
    pub date: Date,
    /// Receiving store
    pub store_id: i64,
    /// Product delivered
    pub product_id: i64,
    /// Units sent
    pub quantity_sent: i32,
    /// When the delivery was recorded
    pub created_at: DateTime,
}

/// Defines relationships between Delivery and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each delivery goes to one store
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
    /// Each delivery carries one product
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
