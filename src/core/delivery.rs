//! Delivery business logic - moving product from the production center to a store.
//!
//! A delivery with a positive quantity deducts central stock, adds to the store's stock
//! entry for that day and is recorded, all in one transaction. If the production center
//! does not hold enough stock the whole delivery is rejected and nothing is written.

use crate::{
    core::{
        Scope,
        ledger::{self, StockAdjustment},
        product::require_product,
        stock_entry,
        store::{ProductionCenter, require_store},
    },
    entities::{Delivery, LedgerMovement, delivery},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Input for [`create_delivery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDelivery {
    /// Business date of the delivery
    pub date: NaiveDate,
    /// Receiving store
    pub store_id: i64,
    /// Product delivered
    pub product_id: i64,
    /// Units sent
    pub quantity_sent: i32,
}

/// Records a delivery and applies its stock effects.
///
/// When `quantity_sent > 0` the production center's stock is reduced by that amount and
/// the `delivered` field of the store's stock entry for the date is increased, creating
/// a zero-filled entry when none exists. A zero quantity only records the delivery row.
///
/// # Errors
/// Returns an error if:
/// - `quantity_sent` is negative (`Error::Validation`)
/// - The product or store does not exist (`Error::NotFound`)
/// - The production center holds less than `quantity_sent` (`Error::InsufficientStock`)
#[instrument(skip(db))]
pub async fn create_delivery(
    db: &DatabaseConnection,
    center: ProductionCenter,
    input: NewDelivery,
) -> Result<delivery::Model> {
    if input.quantity_sent < 0 {
        return Err(Error::validation(
            "quantity_sent",
            format!("cannot be negative, got {}", input.quantity_sent),
        ));
    }

    let txn = db.begin().await?;

    require_product(&txn, input.product_id).await?;
    require_store(&txn, input.store_id).await?;

    if input.quantity_sent > 0 {
        let adjustment = StockAdjustment {
            date: input.date,
            product_id: input.product_id,
            store_id: center.store_id,
            delta: -input.quantity_sent,
            movement: LedgerMovement::Delivery,
            notes: Some(format!("delivery to store {}", input.store_id)),
        };
        ledger::apply_stock_change(&txn, &adjustment, 0).await?;

        stock_entry::add_delivered(
            &txn,
            input.date,
            input.product_id,
            input.store_id,
            input.quantity_sent,
        )
        .await?;
    }

    let row = delivery::ActiveModel {
        date: Set(input.date),
        store_id: Set(input.store_id),
        product_id: Set(input.product_id),
        quantity_sent: Set(input.quantity_sent),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        "Delivered {} of product {} to store {} on {}",
        row.quantity_sent, row.product_id, row.store_id, row.date
    );
    Ok(row)
}

/// Lists deliveries in `from..=to`, oldest first, restricted to the scope.
pub async fn list_deliveries<C>(
    db: &C,
    scope: Scope,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<delivery::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Delivery::find()
        .filter(delivery::Column::Date.gte(from))
        .filter(delivery::Column::Date.lte(to));
    if let Some(store_id) = scope.store_id {
        query = query.filter(delivery::Column::StoreId.eq(store_id));
    }
    query
        .order_by_asc(delivery::Column::Date)
        .order_by_asc(delivery::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
