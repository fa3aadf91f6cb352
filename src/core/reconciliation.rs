//! Stock reconciliation arithmetic.
//!
//! For a stock entry on date `d`:
//!
//! ```text
//! expected_stock = previous_reported + delivered - waste - sales
//! inventory_base = previous_reported + delivered
//! discrepancy    = (reported - expected) / inventory_base * 100   (0 when base <= 0)
//! ```
//!
//! `previous_reported` is the `reported_stock` of the latest entry for the same product
//! and store dated strictly before `d`. A positive discrepancy means more stock was
//! counted than expected (unrecorded delivery or miscount); a negative one means less
//! (unrecorded waste, theft or oversale). Values are exact; rounding is for display.

use crate::{
    entities::{StockEntry, stock_entry},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};

/// The counted and moved quantities of one stock entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCounts {
    /// Units delivered
    pub delivered: i32,
    /// Units wasted
    pub waste: i32,
    /// Units sold
    pub sales: i32,
    /// Units counted at the end of the period
    pub reported_stock: i32,
}

impl From<&stock_entry::Model> for StockCounts {
    fn from(entry: &stock_entry::Model) -> Self {
        Self {
            delivered: entry.delivered,
            waste: entry.waste,
            sales: entry.sales,
            reported_stock: entry.reported_stock,
        }
    }
}

/// Derived reconciliation figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reconciliation {
    /// Reported stock of the previous entry, 0 if none
    pub previous_reported_stock: i32,
    /// Stock predicted from the previous count and the movements
    pub expected_stock: i32,
    /// Previous stock plus deliveries
    pub inventory_base: i64,
    /// Deviation in percent of the inventory base
    pub discrepancy: f64,
}

/// Computes expected stock and discrepancy for a draft entry.
///
/// Sums are taken in `i64`, so large counts never wrap.
///
/// # Errors
/// Returns `Error::Validation` if the expected stock does not fit the stored column.
pub fn compute_expected_and_discrepancy(
    previous_reported_stock: i32,
    counts: StockCounts,
) -> Result<Reconciliation> {
    let inventory_base = i64::from(previous_reported_stock) + i64::from(counts.delivered);
    let expected = inventory_base - i64::from(counts.waste) - i64::from(counts.sales);
    let expected_stock = i32::try_from(expected).map_err(|_| {
        Error::validation(
            "expected_stock",
            format!("{expected} is out of range; check the delivered and reported counts"),
        )
    })?;

    // Every operand is an i32, so these f64 sums are exact
    let base = f64::from(previous_reported_stock) + f64::from(counts.delivered);
    let discrepancy = if inventory_base > 0 {
        (f64::from(counts.reported_stock) - f64::from(expected_stock)) / base * 100.0
    } else {
        0.0
    };

    Ok(Reconciliation {
        previous_reported_stock,
        expected_stock,
        inventory_base,
        discrepancy,
    })
}

/// Share of `waste` in `waste + reported_stock`, in percent.
///
/// Returns `None` when both are zero or the total is not positive.
#[must_use]
pub fn waste_percent(waste: i32, reported_stock: i32) -> Option<f64> {
    let total = f64::from(waste) + f64::from(reported_stock);
    (total > 0.0).then(|| f64::from(waste) / total * 100.0)
}

/// Whether the day's waste exceeds the product's tolerance.
///
/// This uses `waste / (waste + reported_stock)` rather than the inventory base, because
/// deliveries and sales may not be known yet when waste is entered. Zero waste is never
/// excessive.
#[must_use]
pub fn is_excessive_waste(waste: i32, reported_stock: i32, max_waste_percent: f64) -> bool {
    if waste <= 0 {
        return false;
    }
    waste_percent(waste, reported_stock).is_none_or(|percent| percent > max_waste_percent)
}

/// Reported stock of the latest entry before `date` for the product and store, 0 if none.
pub async fn previous_reported_stock<C>(
    db: &C,
    product_id: i64,
    store_id: i64,
    date: NaiveDate,
) -> Result<i32>
where
    C: ConnectionTrait,
{
    let previous = StockEntry::find()
        .filter(stock_entry::Column::ProductId.eq(product_id))
        .filter(stock_entry::Column::StoreId.eq(store_id))
        .filter(stock_entry::Column::Date.lt(date))
        .order_by_desc(stock_entry::Column::Date)
        .one(db)
        .await?;
    Ok(previous.map_or(0, |entry| entry.reported_stock))
}

/// Looks up the previous count and reconciles `counts` against it.
pub async fn reconcile<C>(
    db: &C,
    product_id: i64,
    store_id: i64,
    date: NaiveDate,
    counts: StockCounts,
) -> Result<Reconciliation>
where
    C: ConnectionTrait,
{
    let previous = previous_reported_stock(db, product_id, store_id, date).await?;
    compute_expected_and_discrepancy(previous, counts)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    const fn counts(delivered: i32, waste: i32, sales: i32, reported_stock: i32) -> StockCounts {
        StockCounts {
            delivered,
            waste,
            sales,
            reported_stock,
        }
    }

    #[test]
    fn test_balanced_entry_has_no_discrepancy() -> Result<()> {
        let result = compute_expected_and_discrepancy(10, counts(5, 1, 2, 12))?;
        assert_eq!(result.expected_stock, 12);
        assert_eq!(result.inventory_base, 15);
        assert_eq!(result.discrepancy, 0.0);
        Ok(())
    }

    #[test]
    fn test_surplus_is_positive() -> Result<()> {
        let result = compute_expected_and_discrepancy(10, counts(5, 1, 2, 13))?;
        assert_eq!(result.expected_stock, 12);
        assert!((result.discrepancy - 6.666_666_666_666_667).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_shortfall_is_negative() -> Result<()> {
        let result = compute_expected_and_discrepancy(20, counts(0, 0, 5, 12))?;
        assert_eq!(result.expected_stock, 15);
        assert_eq!(result.discrepancy, -15.0);
        Ok(())
    }

    #[test]
    fn test_empty_base_yields_zero() -> Result<()> {
        let result = compute_expected_and_discrepancy(0, counts(0, 0, 0, 7))?;
        assert_eq!(result.inventory_base, 0);
        assert_eq!(result.expected_stock, 0);
        assert_eq!(result.discrepancy, 0.0);
        Ok(())
    }

    #[test]
    fn test_large_counts_do_not_wrap() -> Result<()> {
        // The base exceeds i32::MAX but the expected stock fits
        let result =
            compute_expected_and_discrepancy(i32::MAX, counts(10, 0, 10, i32::MAX))?;
        assert_eq!(result.inventory_base, i64::from(i32::MAX) + 10);
        assert_eq!(result.expected_stock, i32::MAX);
        assert_eq!(result.discrepancy, 0.0);

        let result = compute_expected_and_discrepancy(i32::MAX, counts(1, 0, 0, 0));
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "expected_stock",
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_waste_percent() {
        assert_eq!(waste_percent(10, 90), Some(10.0));
        assert_eq!(waste_percent(3, 0), Some(100.0));
        assert_eq!(waste_percent(0, 0), None);
        assert_eq!(waste_percent(i32::MAX, i32::MAX), Some(50.0));
    }

    #[test]
    fn test_excessive_waste_heuristic() {
        // 10 / (10 + 90) = 10% > 5%
        assert!(is_excessive_waste(10, 90, 5.0));
        // 5 / (5 + 95) = 5%, not strictly above
        assert!(!is_excessive_waste(5, 95, 5.0));
        // No waste is never excessive
        assert!(!is_excessive_waste(0, 0, 5.0));
        assert!(!is_excessive_waste(0, 1000, 0.0));
        // Everything wasted
        assert!(is_excessive_waste(3, 0, 5.0));
        // Totals beyond i32::MAX
        assert!(is_excessive_waste(i32::MAX, i32::MAX, 5.0));
    }
}
