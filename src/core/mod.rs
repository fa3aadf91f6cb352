//! Core business logic - framework-agnostic operations over the bakery ledger.
//!
//! Every function takes a database connection (or transaction) and returns
//! [`crate::errors::Result`]. Role-based visibility is the caller's concern and is
//! passed in as a [`Scope`].

/// Reporting: low-stock, discrepancy and forecast aggregations
pub mod analytics;
/// Cost engine: unit cost derivation from recipes
pub mod cost;
/// Deliveries from the production center to stores
pub mod delivery;
/// Ingredient catalog
pub mod ingredient;
/// Inventory ledger: production and stock counters
pub mod ledger;
/// Product catalog
pub mod product;
/// Recipe lines
pub mod recipe;
/// Expected stock and discrepancy arithmetic
pub mod reconciliation;
/// Text formatting of report data
pub mod report;
/// Sale records
pub mod sale;
/// Catalog seeding
pub mod seed;
/// Stock entry submission and updates
pub mod stock_entry;
/// Stores and the production center
pub mod store;

use serde::{Deserialize, Serialize};

/// Restricts read operations to one store.
///
/// Staff members only see their assigned store; the caller builds the scope from the
/// session and the engine only applies it as a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Store to restrict to, or `None` for every store
    pub store_id: Option<i64>,
}

impl Scope {
    /// Scope covering every store.
    #[must_use]
    pub const fn all() -> Self {
        Self { store_id: None }
    }

    /// Scope restricted to a single store.
    #[must_use]
    pub const fn store(store_id: i64) -> Self {
        Self {
            store_id: Some(store_id),
        }
    }
}
