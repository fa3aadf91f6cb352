//! Store entity - A retail outlet or the production center.
//!
//! Which store is the production center is decided by configuration
//! (`PRODUCTION_CENTER_NAME`), not by a column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How often a store receives deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "kebab-case")]
pub enum DeliverySchedule {
    /// Every day
    #[sea_orm(string_value = "daily")]
    Daily,
    /// Every second day
    #[sea_orm(string_value = "every-2-days")]
    #[serde(rename = "every-2-days")]
    Every2Days,
    /// Every third day
    #[sea_orm(string_value = "every-3-days")]
    #[serde(rename = "every-3-days")]
    Every3Days,
}

/// Store database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    /// Unique identifier for the store
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Store name, unique across the chain
    #[sea_orm(unique)]
    pub name: String,
    /// Delivery cadence
    pub delivery_schedule: DeliverySchedule,
}

/// Defines relationships between Store and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One store has many stock entries
    #[sea_orm(has_many = "super::stock_entry::Entity")]
    StockEntries,
}

impl Related<super::stock_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
