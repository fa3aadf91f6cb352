//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod delivery;
pub mod ingredient;
pub mod inventory_ledger;
pub mod inventory_level;
pub mod product;
pub mod recipe;
pub mod sale;
pub mod stock_entry;
pub mod store;

// Re-export specific types to avoid conflicts
pub use delivery::{Column as DeliveryColumn, Entity as Delivery, Model as DeliveryModel};
pub use ingredient::{Column as IngredientColumn, Entity as Ingredient, Model as IngredientModel};
pub use inventory_ledger::{
    Column as InventoryLedgerColumn, Entity as InventoryLedger, LedgerMovement,
    Model as InventoryLedgerModel,
};
pub use inventory_level::{
    Column as InventoryLevelColumn, Entity as InventoryLevel, Model as InventoryLevelModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use recipe::{Column as RecipeColumn, Entity as Recipe, Model as RecipeModel};
pub use sale::{Column as SaleColumn, Entity as Sale, Model as SaleModel, SaleSource};
pub use stock_entry::{
    Column as StockEntryColumn, Entity as StockEntry, Model as StockEntryModel,
};
pub use store::{Column as StoreColumn, DeliverySchedule, Entity as Store, Model as StoreModel};
