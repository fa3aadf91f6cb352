//! Stock entry business logic - submission, correction and bulk upload of daily counts.
//!
//! An entry is created once per `(date, product_id, store_id)`. A second create for the
//! same key fails with `Error::Conflict`; the unique index makes that check atomic with
//! the insert. Later changes go through [`update_stock_entry`], which recomputes the
//! reconciliation fields against the entry's own date, so the referenced previous entry
//! never changes. Entries are never deleted by these operations.

use crate::{
    core::{
        Scope,
        product::require_product,
        reconciliation::{self, Reconciliation, StockCounts},
        store::require_store,
    },
    entities::{Product, StockEntry, Store, product, stock_entry},
    errors::{Error, ErrorKind, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Input for [`create_stock_entry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockEntry {
    /// Business date of the count
    pub date: NaiveDate,
    /// Product counted
    pub product_id: i64,
    /// Store counted
    pub store_id: i64,
    /// Quantities for the day
    #[serde(flatten)]
    pub counts: StockCounts,
}

/// Partial update for [`update_stock_entry`]. `None` fields keep their stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntryPatch {
    /// Replacement delivered quantity
    pub delivered: Option<i32>,
    /// Replacement counted stock
    pub reported_stock: Option<i32>,
    /// Replacement waste
    pub waste: Option<i32>,
    /// Replacement sales
    pub sales: Option<i32>,
}

impl StockEntryPatch {
    fn apply(self, counts: StockCounts) -> StockCounts {
        StockCounts {
            delivered: self.delivered.unwrap_or(counts.delivered),
            waste: self.waste.unwrap_or(counts.waste),
            sales: self.sales.unwrap_or(counts.sales),
            reported_stock: self.reported_stock.unwrap_or(counts.reported_stock),
        }
    }
}

/// One failed item of a bulk submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Position of the item in the submitted list
    pub index: usize,
    /// Error classification
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
}

/// Result of [`submit_stock_entries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Entries that were stored
    pub succeeded: Vec<stock_entry::Model>,
    /// Items that were rejected
    pub failed: Vec<BatchFailure>,
}

/// A stock entry whose waste exceeds its product's tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteAlert {
    /// The offending entry
    pub entry: stock_entry::Model,
    /// Name of the product
    pub product_name: String,
    /// Name of the store
    pub store_name: String,
    /// `waste / (waste + reported_stock) * 100`
    pub waste_percent: f64,
    /// The product's tolerance
    pub max_waste_percent: f64,
}

pub(crate) fn validate_counts(counts: &StockCounts) -> Result<()> {
    let fields = [
        ("delivered", counts.delivered),
        ("reported_stock", counts.reported_stock),
        ("waste", counts.waste),
        ("sales", counts.sales),
    ];
    for (field, value) in fields {
        if value < 0 {
            return Err(Error::validation(
                field,
                format!("cannot be negative, got {value}"),
            ));
        }
    }
    Ok(())
}

fn duplicate_entry(date: NaiveDate, product_id: i64, store_id: i64) -> Error {
    Error::Conflict {
        message: format!(
            "a stock entry for product {product_id} at store {store_id} on {date} already exists; update it instead"
        ),
    }
}

fn set_reconciliation(entry: &mut stock_entry::ActiveModel, reconciliation: &Reconciliation) {
    entry.expected_stock = Set(reconciliation.expected_stock);
    entry.discrepancy = Set(reconciliation.discrepancy);
}

/// Retrieves a stock entry by ID.
pub async fn get_stock_entry<C>(db: &C, entry_id: i64) -> Result<Option<stock_entry::Model>>
where
    C: ConnectionTrait,
{
    StockEntry::find_by_id(entry_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the entry for a `(date, product_id, store_id)` key.
pub async fn find_stock_entry<C>(
    db: &C,
    date: NaiveDate,
    product_id: i64,
    store_id: i64,
) -> Result<Option<stock_entry::Model>>
where
    C: ConnectionTrait,
{
    StockEntry::find()
        .filter(stock_entry::Column::Date.eq(date))
        .filter(stock_entry::Column::ProductId.eq(product_id))
        .filter(stock_entry::Column::StoreId.eq(store_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists entries in `from..=to`, newest first, restricted to the scope.
pub async fn list_stock_entries<C>(
    db: &C,
    scope: Scope,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<stock_entry::Model>>
where
    C: ConnectionTrait,
{
    let mut query = StockEntry::find()
        .filter(stock_entry::Column::Date.gte(from))
        .filter(stock_entry::Column::Date.lte(to));
    if let Some(store_id) = scope.store_id {
        query = query.filter(stock_entry::Column::StoreId.eq(store_id));
    }
    query
        .order_by_desc(stock_entry::Column::Date)
        .order_by_asc(stock_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn insert_entry<C>(db: &C, input: &NewStockEntry) -> Result<stock_entry::Model>
where
    C: ConnectionTrait,
{
    let reconciliation = reconciliation::reconcile(
        db,
        input.product_id,
        input.store_id,
        input.date,
        input.counts,
    )
    .await?;

    let now = chrono::Utc::now().naive_utc();
    let mut entry = stock_entry::ActiveModel {
        date: Set(input.date),
        product_id: Set(input.product_id),
        store_id: Set(input.store_id),
        delivered: Set(input.counts.delivered),
        reported_stock: Set(input.counts.reported_stock),
        waste: Set(input.counts.waste),
        sales: Set(input.counts.sales),
        reported_remaining: Set(input.counts.reported_stock),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    set_reconciliation(&mut entry, &reconciliation);

    entry.insert(db).await.map_err(|e| match Error::from(e) {
        Error::Conflict { .. } => duplicate_entry(input.date, input.product_id, input.store_id),
        other => other,
    })
}

/// Creates a stock entry with its expected stock and discrepancy filled in.
///
/// `reported_remaining` is set to the submitted `reported_stock`.
///
/// # Errors
/// Returns an error if:
/// - A count is negative (`Error::Validation`)
/// - The product or store does not exist (`Error::NotFound`)
/// - An entry for the same date, product and store exists (`Error::Conflict`)
#[instrument(skip(db))]
pub async fn create_stock_entry(
    db: &DatabaseConnection,
    input: NewStockEntry,
) -> Result<stock_entry::Model> {
    validate_counts(&input.counts)?;

    let txn = db.begin().await?;

    require_product(&txn, input.product_id).await?;
    require_store(&txn, input.store_id).await?;

    let entry = insert_entry(&txn, &input).await?;

    txn.commit().await?;
    info!(
        "Stock entry {} for product {} at store {} on {}: expected {}, reported {}, discrepancy {:.2}%",
        entry.id,
        entry.product_id,
        entry.store_id,
        entry.date,
        entry.expected_stock,
        entry.reported_stock,
        entry.discrepancy
    );
    Ok(entry)
}

/// Merges a patch into an entry and recomputes its reconciliation fields.
///
/// # Errors
/// Returns an error if a merged count is negative or the entry does not exist.
#[instrument(skip(db))]
pub async fn update_stock_entry(
    db: &DatabaseConnection,
    entry_id: i64,
    patch: StockEntryPatch,
) -> Result<stock_entry::Model> {
    let txn = db.begin().await?;

    let existing = get_stock_entry(&txn, entry_id)
        .await?
        .ok_or_else(|| Error::not_found("StockEntry", entry_id))?;
    let counts = patch.apply(StockCounts::from(&existing));
    validate_counts(&counts)?;

    let updated = save_counts(&txn, existing, counts).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Writes new counts to an entry and recomputes it against its own date.
pub(crate) async fn save_counts<C>(
    db: &C,
    existing: stock_entry::Model,
    counts: StockCounts,
) -> Result<stock_entry::Model>
where
    C: ConnectionTrait,
{
    let reconciliation = reconciliation::reconcile(
        db,
        existing.product_id,
        existing.store_id,
        existing.date,
        counts,
    )
    .await?;

    let mut entry: stock_entry::ActiveModel = existing.into();
    entry.delivered = Set(counts.delivered);
    entry.reported_stock = Set(counts.reported_stock);
    entry.waste = Set(counts.waste);
    entry.sales = Set(counts.sales);
    set_reconciliation(&mut entry, &reconciliation);
    entry.updated_at = Set(chrono::Utc::now().naive_utc());
    entry.update(db).await.map_err(Into::into)
}

/// Adds delivered units to the entry for the key, creating a zero-filled entry if needed.
pub(crate) async fn add_delivered<C>(
    db: &C,
    date: NaiveDate,
    product_id: i64,
    store_id: i64,
    quantity: i32,
) -> Result<stock_entry::Model>
where
    C: ConnectionTrait,
{
    match find_stock_entry(db, date, product_id, store_id).await? {
        Some(existing) => {
            let mut counts = StockCounts::from(&existing);
            counts.delivered = counts.delivered.checked_add(quantity).ok_or_else(|| {
                Error::validation(
                    "delivered",
                    format!(
                        "{} + {quantity} is out of range for one stock entry",
                        counts.delivered
                    ),
                )
            })?;
            save_counts(db, existing, counts).await
        }
        None => {
            let input = NewStockEntry {
                date,
                product_id,
                store_id,
                counts: StockCounts {
                    delivered: quantity,
                    ..StockCounts::default()
                },
            };
            insert_entry(db, &input).await
        }
    }
}

/// Submits several entries, each in its own transaction.
///
/// Failed items are reported by position and do not roll back the items that succeeded.
pub async fn submit_stock_entries(
    db: &DatabaseConnection,
    entries: Vec<NewStockEntry>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match create_stock_entry(db, entry).await {
            Ok(created) => outcome.succeeded.push(created),
            Err(e) => {
                warn!("Stock entry #{index} rejected: {e}");
                outcome.failed.push(BatchFailure {
                    index,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }
    info!(
        "Bulk stock submission: {} stored, {} rejected",
        outcome.succeeded.len(),
        outcome.failed.len()
    );
    outcome
}

/// Entries of `date` whose waste exceeds their product's `max_waste_percent`.
pub async fn waste_alerts<C>(db: &C, scope: Scope, date: NaiveDate) -> Result<Vec<WasteAlert>>
where
    C: ConnectionTrait,
{
    let entries = list_stock_entries(db, scope, date, date).await?;
    let products: HashMap<i64, product::Model> = Product::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let store_names: HashMap<i64, String> = Store::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let product = products.get(&entry.product_id)?;
            if !reconciliation::is_excessive_waste(
                entry.waste,
                entry.reported_stock,
                product.max_waste_percent,
            ) {
                return None;
            }
            let waste_percent =
                reconciliation::waste_percent(entry.waste, entry.reported_stock).unwrap_or(100.0);
            Some(WasteAlert {
                product_name: product.name.clone(),
                store_name: store_names
                    .get(&entry.store_id)
                    .cloned()
                    .unwrap_or_default(),
                waste_percent,
                max_waste_percent: product.max_waste_percent,
                entry,
            })
        })
        .collect())
}
