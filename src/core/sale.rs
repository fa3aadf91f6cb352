//! Sale records and their relation to the `sales` field of stock entries.
//!
//! Sales are tracked on two channels. Sale records feed the weekly forecast, while the
//! `sales` count typed into a stock entry feeds the discrepancy arithmetic. Recording a
//! sale never touches a stock entry. [`sales_channel_gap`] shows where the two disagree
//! and [`sync_entry_sales_from_records`] copies the recorded total into the entry when
//! a manager decides the records are authoritative.

use crate::{
    core::{
        Scope,
        product::require_product,
        reconciliation::StockCounts,
        stock_entry::{find_stock_entry, save_counts},
        store::require_store,
    },
    entities::{Sale, SaleSource, sale, stock_entry},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Input for [`record_sale`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    /// Business date of the sale
    pub date: NaiveDate,
    /// Selling store
    pub store_id: i64,
    /// Product sold
    pub product_id: i64,
    /// Units sold
    pub quantity: i32,
    /// Price per unit, if known
    pub unit_price: Option<f64>,
    /// Origin of the record
    pub source: SaleSource,
}

/// Comparison of the two sales channels for one stock entry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SalesChannelGap {
    /// Sum of sale record quantities
    pub recorded: i32,
    /// `sales` field of the stock entry, if one exists
    pub entry_sales: Option<i32>,
}

impl SalesChannelGap {
    /// `recorded - entry_sales`, treating a missing entry as zero.
    #[must_use]
    pub fn gap(&self) -> i32 {
        self.recorded - self.entry_sales.unwrap_or(0)
    }

    /// Whether both channels agree.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.gap() == 0
    }
}

/// Stores a sale record.
///
/// # Errors
/// Returns an error if:
/// - `quantity` is negative or `unit_price` is negative or not finite
/// - The product or store does not exist
#[instrument(skip(db))]
pub async fn record_sale(db: &DatabaseConnection, input: NewSale) -> Result<sale::Model> {
    if input.quantity < 0 {
        return Err(Error::validation(
            "quantity",
            format!("cannot be negative, got {}", input.quantity),
        ));
    }
    if let Some(price) = input.unit_price {
        if !price.is_finite() || price < 0.0 {
            return Err(Error::validation(
                "unit_price",
                format!("must be a non-negative number, got {price}"),
            ));
        }
    }

    require_product(db, input.product_id).await?;
    require_store(db, input.store_id).await?;

    let row = sale::ActiveModel {
        date: Set(input.date),
        store_id: Set(input.store_id),
        product_id: Set(input.product_id),
        quantity: Set(input.quantity),
        unit_price: Set(input.unit_price),
        source: Set(input.source),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Lists sale records in `from..=to`, oldest first, restricted to the scope.
pub async fn list_sales<C>(
    db: &C,
    scope: Scope,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<sale::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Sale::find()
        .filter(sale::Column::Date.gte(from))
        .filter(sale::Column::Date.lte(to));
    if let Some(store_id) = scope.store_id {
        query = query.filter(sale::Column::StoreId.eq(store_id));
    }
    query
        .order_by_asc(sale::Column::Date)
        .order_by_asc(sale::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of sale record quantities for one product at one store on one date.
pub async fn recorded_sales_total<C>(
    db: &C,
    date: NaiveDate,
    product_id: i64,
    store_id: i64,
) -> Result<i32>
where
    C: ConnectionTrait,
{
    let total: i64 = Sale::find()
        .filter(sale::Column::Date.eq(date))
        .filter(sale::Column::ProductId.eq(product_id))
        .filter(sale::Column::StoreId.eq(store_id))
        .all(db)
        .await?
        .iter()
        .map(|s| i64::from(s.quantity))
        .sum();
    Ok(i32::try_from(total)?)
}

/// Compares recorded sales with the stock entry's `sales` field.
pub async fn sales_channel_gap<C>(
    db: &C,
    date: NaiveDate,
    product_id: i64,
    store_id: i64,
) -> Result<SalesChannelGap>
where
    C: ConnectionTrait,
{
    let recorded = recorded_sales_total(db, date, product_id, store_id).await?;
    let entry_sales = find_stock_entry(db, date, product_id, store_id)
        .await?
        .map(|entry| entry.sales);
    Ok(SalesChannelGap {
        recorded,
        entry_sales,
    })
}

/// Overwrites the stock entry's `sales` with the recorded total and recomputes it.
///
/// # Errors
/// Returns `Error::NotFound` if no stock entry exists for the key.
#[instrument(skip(db))]
pub async fn sync_entry_sales_from_records(
    db: &DatabaseConnection,
    date: NaiveDate,
    product_id: i64,
    store_id: i64,
) -> Result<stock_entry::Model> {
    let txn = db.begin().await?;

    let entry = find_stock_entry(&txn, date, product_id, store_id)
        .await?
        .ok_or_else(|| {
            Error::not_found(
                "StockEntry",
                format!("{date}/product {product_id}/store {store_id}"),
            )
        })?;
    let recorded = recorded_sales_total(&txn, date, product_id, store_id).await?;

    let previous_sales = entry.sales;
    let counts = StockCounts {
        sales: recorded,
        ..StockCounts::from(&entry)
    };
    let updated = save_counts(&txn, entry, counts).await?;

    txn.commit().await?;
    info!(
        "Synced sales for product {product_id} at store {store_id} on {date}: {previous_sales} -> {recorded}"
    );
    Ok(updated)
}
