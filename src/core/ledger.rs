//! Inventory ledger - production events and stock counters per location.
//!
//! Current stock lives in `inventory_levels`, one counter per `(product_id, store_id)`.
//! Every change to a counter is paired with an append-only `inventory_ledger` row in the
//! same transaction, so the counter can always be audited against the log.
//!
//! Counters are changed with a single conditional statement:
//! `UPDATE inventory_levels SET quantity = quantity + delta WHERE ... AND quantity >= -delta`.
//! The non-negative check and the write are one atomic step, so two concurrent
//! deductions reading the same stale total cannot both succeed.

use crate::{
    core::{Scope, product::require_product, store::ProductionCenter, store::require_store},
    entities::{
        InventoryLedger, InventoryLevel, LedgerMovement, inventory_ledger, inventory_level,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// A signed change to one location's stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    /// Business date of the movement
    pub date: NaiveDate,
    /// Product whose stock changes
    pub product_id: i64,
    /// Location whose stock changes
    pub store_id: i64,
    /// Units added (positive) or removed (negative)
    pub delta: i32,
    /// Kind of movement recorded in the ledger
    pub movement: LedgerMovement,
    /// Reason recorded with the ledger row
    pub notes: Option<String>,
}

/// Comparison of a stock counter with the sum of its ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerAudit {
    /// Value of the materialised counter
    pub counter: i32,
    /// Sum of `quantity_change` over the ledger rows
    pub replayed: i32,
}

impl LedgerAudit {
    /// Whether the counter matches the log.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.counter == self.replayed
    }
}

/// Returns the current stock of a product at a location, zero when untracked.
pub async fn get_current_stock<C>(db: &C, product_id: i64, store_id: i64) -> Result<i32>
where
    C: ConnectionTrait,
{
    let level = InventoryLevel::find()
        .filter(inventory_level::Column::ProductId.eq(product_id))
        .filter(inventory_level::Column::StoreId.eq(store_id))
        .one(db)
        .await?;
    Ok(level.map_or(0, |level| level.quantity))
}

/// Returns `product_id -> quantity` for every product tracked at the scoped location.
///
/// An unscoped call, or one scoped to the production center, reads central stock.
/// Products that never had a movement at that location are absent from the map.
pub async fn get_current_inventory_levels<C>(
    db: &C,
    center: ProductionCenter,
    scope: Scope,
) -> Result<BTreeMap<i64, i32>>
where
    C: ConnectionTrait,
{
    let store_id = scope.store_id.unwrap_or(center.store_id);
    let levels = InventoryLevel::find()
        .filter(inventory_level::Column::StoreId.eq(store_id))
        .all(db)
        .await?;
    Ok(levels
        .into_iter()
        .map(|level| (level.product_id, level.quantity))
        .collect())
}

/// Returns the ledger rows of a product at a location, oldest first.
pub async fn get_ledger_history<C>(
    db: &C,
    product_id: i64,
    store_id: i64,
) -> Result<Vec<inventory_ledger::Model>>
where
    C: ConnectionTrait,
{
    InventoryLedger::find()
        .filter(inventory_ledger::Column::ProductId.eq(product_id))
        .filter(inventory_ledger::Column::StoreId.eq(store_id))
        .order_by_asc(inventory_ledger::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Compares a counter with the replayed sum of its ledger rows.
pub async fn audit_inventory_level<C>(db: &C, product_id: i64, store_id: i64) -> Result<LedgerAudit>
where
    C: ConnectionTrait,
{
    let counter = get_current_stock(db, product_id, store_id).await?;
    let replayed = get_ledger_history(db, product_id, store_id)
        .await?
        .iter()
        .map(|row| row.quantity_change)
        .sum();
    let audit = LedgerAudit { counter, replayed };
    if !audit.is_consistent() {
        warn!("Ledger mismatch for product {product_id} at store {store_id}: {audit:?}");
    }
    Ok(audit)
}

async fn ensure_level_row<C>(db: &C, product_id: i64, store_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let exists = InventoryLevel::find()
        .filter(inventory_level::Column::ProductId.eq(product_id))
        .filter(inventory_level::Column::StoreId.eq(store_id))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    let level = inventory_level::ActiveModel {
        product_id: Set(product_id),
        store_id: Set(store_id),
        quantity: Set(0),
        updated_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    match level.insert(db).await {
        Ok(_) => Ok(()),
        // Created concurrently; the unique index guarantees a single row
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Applies a stock change and appends its ledger row. Must run inside a transaction.
pub(crate) async fn apply_stock_change<C>(
    db: &C,
    adjustment: &StockAdjustment,
    quantity_produced: i32,
) -> Result<inventory_ledger::Model>
where
    C: ConnectionTrait,
{
    let StockAdjustment {
        product_id,
        store_id,
        delta,
        ..
    } = *adjustment;

    ensure_level_row(db, product_id, store_id).await?;

    let result = InventoryLevel::update_many()
        .col_expr(
            inventory_level::Column::Quantity,
            Expr::col(inventory_level::Column::Quantity).add(delta),
        )
        .col_expr(
            inventory_level::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(inventory_level::Column::ProductId.eq(product_id))
        .filter(inventory_level::Column::StoreId.eq(store_id))
        .filter(inventory_level::Column::Quantity.gte(-i64::from(delta)))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let available = get_current_stock(db, product_id, store_id).await?;
        debug!("Rejected change of {delta} for product {product_id}: only {available} on hand");
        return Err(Error::InsufficientStock {
            product_id,
            available,
            requested: delta.saturating_neg(),
        });
    }

    let quantity_in_stock = get_current_stock(db, product_id, store_id).await?;

    let row = inventory_ledger::ActiveModel {
        date: Set(adjustment.date),
        product_id: Set(product_id),
        store_id: Set(store_id),
        movement: Set(adjustment.movement),
        quantity_produced: Set(quantity_produced),
        quantity_change: Set(delta),
        quantity_in_stock: Set(quantity_in_stock),
        notes: Set(adjustment.notes.clone()),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Records a production event at the production center.
///
/// The new ledger row carries `quantity_produced` and the running total after it.
///
/// # Errors
/// Returns an error if:
/// - `quantity_produced` is not positive (`Error::Validation`)
/// - The product does not exist (`Error::NotFound`)
#[instrument(skip(db))]
pub async fn record_production(
    db: &DatabaseConnection,
    center: ProductionCenter,
    date: NaiveDate,
    product_id: i64,
    quantity_produced: i32,
    notes: Option<String>,
) -> Result<inventory_ledger::Model> {
    if quantity_produced <= 0 {
        return Err(Error::validation(
            "quantity_produced",
            format!("must be greater than zero, got {quantity_produced}"),
        ));
    }

    let txn = db.begin().await?;

    require_product(&txn, product_id).await?;

    let adjustment = StockAdjustment {
        date,
        product_id,
        store_id: center.store_id,
        delta: quantity_produced,
        movement: LedgerMovement::Production,
        notes,
    };
    let row = apply_stock_change(&txn, &adjustment, quantity_produced).await?;

    txn.commit().await?;
    info!(
        "Produced {quantity_produced} of product {product_id}; central stock now {}",
        row.quantity_in_stock
    );
    Ok(row)
}

/// Applies a signed stock change to a location.
///
/// Nothing is written when the change would leave the location with negative stock.
///
/// # Errors
/// Returns an error if:
/// - `delta` is zero (`Error::Validation`)
/// - The product or store does not exist (`Error::NotFound`)
/// - The resulting stock would be negative (`Error::InsufficientStock`)
#[instrument(skip(db))]
pub async fn update_inventory_stock(
    db: &DatabaseConnection,
    adjustment: StockAdjustment,
) -> Result<inventory_ledger::Model> {
    if adjustment.delta == 0 {
        return Err(Error::validation("delta", "stock change cannot be zero"));
    }

    let txn = db.begin().await?;

    require_product(&txn, adjustment.product_id).await?;
    require_store(&txn, adjustment.store_id).await?;

    let produced = if adjustment.movement == LedgerMovement::Production {
        adjustment.delta.max(0)
    } else {
        0
    };
    let row = apply_stock_change(&txn, &adjustment, produced).await?;

    txn.commit().await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn deduction(product_id: i64, store_id: i64, delta: i32) -> StockAdjustment {
        StockAdjustment {
            date: test_date(2),
            product_id,
            store_id,
            delta,
            movement: LedgerMovement::Adjustment,
            notes: Some("count correction".to_string()),
        }
    }

    #[tokio::test]
    async fn test_record_production_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let center = ProductionCenter { store_id: 1 };

        for quantity in [0, -5] {
            let result = record_production(&db, center, test_date(1), 1, quantity, None).await;
            assert!(matches!(
                result.unwrap_err(),
                Error::Validation {
                    field: "quantity_produced",
                    ..
                }
            ));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_record_production_builds_running_total() -> Result<()> {
        let db = setup_test_db().await?;
        let center = create_production_center(&db).await?;
        let product = create_test_product(&db, "CRO-01").await?;

        let first = record_production(&db, center, test_date(1), product.id, 30, None).await?;
        let second = record_production(
            &db,
            center,
            test_date(2),
            product.id,
            20,
            Some("second bake".to_string()),
        )
        .await?;

        assert_eq!(first.quantity_produced, 30);
        assert_eq!(first.quantity_in_stock, 30);
        assert_eq!(second.quantity_produced, 20);
        assert_eq!(second.quantity_in_stock, 50);
        assert_eq!(second.movement, LedgerMovement::Production);
        assert_eq!(second.notes.as_deref(), Some("second bake"));

        assert_eq!(
            get_current_stock(&db, product.id, center.store_id).await?,
            50
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_record_production_unknown_product() -> Result<()> {
        let db = setup_test_db().await?;
        let center = create_production_center(&db).await?;

        let result = record_production(&db, center, test_date(1), 404, 10, None).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_over_deduction_leaves_ledger_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let center = create_production_center(&db).await?;
        let product = create_test_product(&db, "CRO-01").await?;
        record_production(&db, center, test_date(1), product.id, 50, None).await?;

        let result =
            update_inventory_stock(&db, deduction(product.id, center.store_id, -100)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientStock {
                available: 50,
                requested: 100,
                ..
            }
        ));

        assert_eq!(
            get_current_stock(&db, product.id, center.store_id).await?,
            50
        );
        assert_eq!(
            get_ledger_history(&db, product.id, center.store_id)
                .await?
                .len(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_deduction_down_to_zero() -> Result<()> {
        let db = setup_test_db().await?;
        let center = create_production_center(&db).await?;
        let product = create_test_product(&db, "CRO-01").await?;
        record_production(&db, center, test_date(1), product.id, 50, None).await?;

        let row = update_inventory_stock(&db, deduction(product.id, center.store_id, -50)).await?;
        assert_eq!(row.quantity_change, -50);
        assert_eq!(row.quantity_in_stock, 0);
        assert_eq!(row.quantity_produced, 0);

        // Nothing left for a further deduction
        let result = update_inventory_stock(&db, deduction(product.id, center.store_id, -1)).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InsufficientStock);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_delta_rejected() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = update_inventory_stock(&db, deduction(1, 1, 0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "delta", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_levels_are_scoped_per_location() -> Result<()> {
        let db = setup_test_db().await?;
        let center = create_production_center(&db).await?;
        let store = create_test_store(&db, "Harbour Street").await?;
        let croissant = create_test_product(&db, "CRO-01").await?;
        let baguette = create_test_product(&db, "BAG-01").await?;

        record_production(&db, center, test_date(1), croissant.id, 40, None).await?;
        record_production(&db, center, test_date(1), baguette.id, 15, None).await?;
        update_inventory_stock(
            &db,
            StockAdjustment {
                date: test_date(1),
                product_id: croissant.id,
                store_id: store.id,
                delta: 6,
                movement: LedgerMovement::Adjustment,
                notes: None,
            },
        )
        .await?;

        let central = get_current_inventory_levels(&db, center, Scope::all()).await?;
        assert_eq!(central.len(), 2);
        assert_eq!(central[&croissant.id], 40);
        assert_eq!(central[&baguette.id], 15);

        let same = get_current_inventory_levels(&db, center, Scope::store(center.store_id)).await?;
        assert_eq!(same, central);

        let retail = get_current_inventory_levels(&db, center, Scope::store(store.id)).await?;
        assert_eq!(retail.len(), 1);
        assert_eq!(retail[&croissant.id], 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_audit_matches_counter() -> Result<()> {
        let db = setup_test_db().await?;
        let center = create_production_center(&db).await?;
        let product = create_test_product(&db, "CRO-01").await?;

        record_production(&db, center, test_date(1), product.id, 25, None).await?;
        update_inventory_stock(&db, deduction(product.id, center.store_id, -7)).await?;
        record_production(&db, center, test_date(3), product.id, 5, None).await?;

        let audit = audit_inventory_level(&db, product.id, center.store_id).await?;
        assert_eq!(audit.counter, 23);
        assert!(audit.is_consistent());
        Ok(())
    }
}
