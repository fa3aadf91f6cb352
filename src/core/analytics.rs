//! Analytics - read-only aggregations behind the alerts and the inventory dashboard.
//!
//! Nothing here writes to the database. Every query takes a [`Scope`] so a staff member
//! only sees figures for their own store.

use crate::{
    core::{
        Scope, delivery::list_deliveries, ledger::get_current_inventory_levels,
        product::get_all_products, sale::list_sales, store::ProductionCenter,
    },
    entities::{Product, StockEntry, Store, product, stock_entry},
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Days covered by the demand forecast, `as_of` included.
pub const FORECAST_WINDOW_DAYS: u64 = 7;

/// A product whose observed stock is below its minimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockProduct {
    /// The product
    pub product: product::Model,
    /// Highest reported stock across the product's entries
    pub current_stock: i32,
}

/// A recent stock entry with a large discrepancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockDiscrepancy {
    /// The entry
    pub entry: stock_entry::Model,
    /// Name of the product counted
    pub product_name: String,
    /// Name of the store counted
    pub store_name: String,
}

/// Stock coverage relative to weekly demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    /// At least two weeks of demand on hand
    Good,
    /// At least one week of demand on hand
    Medium,
    /// Less than a week of demand on hand
    Low,
}

impl std::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Good => "good",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.pad(label)
    }
}

/// Demand figures derived from one week of activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Forecast {
    /// Sales plus deliveries over the window
    pub weekly_demand: i64,
    /// Units to bake to reach two weeks of coverage
    pub suggested_production: i64,
    /// Coverage classification
    pub stock_level: StockLevel,
}

/// Computes the forecast for one product.
#[must_use]
pub fn forecast(weekly_sales: i64, weekly_deliveries: i64, current_stock: i64) -> Forecast {
    let weekly_demand = weekly_sales + weekly_deliveries;
    let target = weekly_demand * 2;
    let stock_level = if current_stock >= target {
        StockLevel::Good
    } else if current_stock >= weekly_demand {
        StockLevel::Medium
    } else {
        StockLevel::Low
    };
    Forecast {
        weekly_demand,
        suggested_production: (target - current_stock).max(0),
        stock_level,
    }
}

/// One row of the inventory dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductForecast {
    /// Product ID
    pub product_id: i64,
    /// Product code
    pub product_code: String,
    /// Product name
    pub product_name: String,
    /// Sale record quantities over the window
    pub weekly_sales: i64,
    /// Delivered quantities over the window
    pub weekly_deliveries: i64,
    /// Stock at the production center
    pub current_stock: i64,
    /// Derived demand figures
    pub forecast: Forecast,
}

/// Weekly production forecast for every product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryDashboard {
    /// First day of the window
    pub from: NaiveDate,
    /// Last day of the window
    pub to: NaiveDate,
    /// One row per product, ordered by name
    pub products: Vec<ProductForecast>,
}

fn scoped_entries(scope: Scope) -> Select<StockEntry> {
    let query = StockEntry::find();
    match scope.store_id {
        Some(store_id) => query.filter(stock_entry::Column::StoreId.eq(store_id)),
        None => query,
    }
}

/// Products whose highest reported stock is strictly below `min_stock_level`.
///
/// The highest `reported_stock` across a product's entries stands in for its current
/// stock. Products without any entry in scope are not reported.
pub async fn get_products_with_low_stock<C>(db: &C, scope: Scope) -> Result<Vec<LowStockProduct>>
where
    C: ConnectionTrait,
{
    let mut observed: HashMap<i64, i32> = HashMap::new();
    for entry in scoped_entries(scope).all(db).await? {
        observed
            .entry(entry.product_id)
            .and_modify(|max| *max = (*max).max(entry.reported_stock))
            .or_insert(entry.reported_stock);
    }

    let low: Vec<LowStockProduct> = get_all_products(db)
        .await?
        .into_iter()
        .filter_map(|product| {
            let current_stock = *observed.get(&product.id)?;
            (current_stock < product.min_stock_level).then_some(LowStockProduct {
                product,
                current_stock,
            })
        })
        .collect();

    debug!("{} product(s) below minimum stock", low.len());
    Ok(low)
}

/// Recent entries whose absolute discrepancy is at least `threshold_percent`.
///
/// Only the latest `window` entries by date are scanned; this is an alert feed, not
/// an audit.
///
/// # Errors
/// Returns `Error::Validation` if the threshold is negative or not finite.
pub async fn get_stock_discrepancies<C>(
    db: &C,
    threshold_percent: f64,
    window: u64,
    scope: Scope,
) -> Result<Vec<StockDiscrepancy>>
where
    C: ConnectionTrait,
{
    if !threshold_percent.is_finite() || threshold_percent < 0.0 {
        return Err(Error::validation(
            "threshold_percent",
            format!("must be a non-negative number, got {threshold_percent}"),
        ));
    }

    let recent = scoped_entries(scope)
        .order_by_desc(stock_entry::Column::Date)
        .order_by_desc(stock_entry::Column::Id)
        .limit(window)
        .all(db)
        .await?;

    let product_names: HashMap<i64, String> = Product::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let store_names: HashMap<i64, String> = Store::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    Ok(recent
        .into_iter()
        .filter(|entry| entry.discrepancy.abs() >= threshold_percent)
        .map(|entry| StockDiscrepancy {
            product_name: product_names
                .get(&entry.product_id)
                .cloned()
                .unwrap_or_default(),
            store_name: store_names
                .get(&entry.store_id)
                .cloned()
                .unwrap_or_default(),
            entry,
        })
        .collect())
}

/// Builds the weekly production forecast as of `as_of`.
///
/// Sales and deliveries are summed over `as_of - 6 ..= as_of` within the scope. Current
/// stock is always the production center's.
pub async fn inventory_dashboard<C>(
    db: &C,
    center: ProductionCenter,
    as_of: NaiveDate,
    scope: Scope,
) -> Result<InventoryDashboard>
where
    C: ConnectionTrait,
{
    let from = as_of
        .checked_sub_days(Days::new(FORECAST_WINDOW_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);

    let mut sales: HashMap<i64, i64> = HashMap::new();
    for sale in list_sales(db, scope, from, as_of).await? {
        *sales.entry(sale.product_id).or_default() += i64::from(sale.quantity);
    }
    let mut deliveries: HashMap<i64, i64> = HashMap::new();
    for delivery in list_deliveries(db, scope, from, as_of).await? {
        *deliveries.entry(delivery.product_id).or_default() += i64::from(delivery.quantity_sent);
    }
    let central = get_current_inventory_levels(db, center, Scope::all()).await?;

    let mut products = get_all_products(db).await?;
    products.sort_by(|a, b| a.name.cmp(&b.name));

    let products = products
        .into_iter()
        .map(|product| {
            let weekly_sales = sales.get(&product.id).copied().unwrap_or(0);
            let weekly_deliveries = deliveries.get(&product.id).copied().unwrap_or(0);
            let current_stock = i64::from(central.get(&product.id).copied().unwrap_or(0));
            ProductForecast {
                product_id: product.id,
                product_code: product.code,
                product_name: product.name,
                weekly_sales,
                weekly_deliveries,
                current_stock,
                forecast: forecast(weekly_sales, weekly_deliveries, current_stock),
            }
        })
        .collect();

    Ok(InventoryDashboard {
        from,
        to: as_of,
        products,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        delivery::{NewDelivery, create_delivery},
        ledger::record_production,
        sale::{NewSale, record_sale},
        stock_entry::{NewStockEntry, create_stock_entry},
    };
    use crate::entities::SaleSource;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    async fn count_entry(
        db: &DatabaseConnection,
        day: u32,
        product_id: i64,
        store_id: i64,
        stock: (i32, i32, i32, i32),
    ) -> Result<stock_entry::Model> {
        create_stock_entry(
            db,
            NewStockEntry {
                date: test_date(day),
                product_id,
                store_id,
                counts: counts(stock.0, stock.1, stock.2, stock.3),
            },
        )
        .await
    }

    #[test]
    fn test_forecast_classification() {
        // 14 + 6 = 20 demand; 40 on hand covers two weeks
        let f = forecast(14, 6, 40);
        assert_eq!(f.weekly_demand, 20);
        assert_eq!(f.suggested_production, 0);
        assert_eq!(f.stock_level, StockLevel::Good);

        let f = forecast(14, 6, 20);
        assert_eq!(f.suggested_production, 20);
        assert_eq!(f.stock_level, StockLevel::Medium);

        let f = forecast(14, 6, 19);
        assert_eq!(f.suggested_production, 21);
        assert_eq!(f.stock_level, StockLevel::Low);

        let f = forecast(0, 0, 0);
        assert_eq!(f.suggested_production, 0);
        assert_eq!(f.stock_level, StockLevel::Good);
    }

    #[tokio::test]
    async fn test_low_stock_boundary_is_strict() -> Result<()> {
        let (db, _center, store, _product) = setup_with_stock_fixture().await?;
        let at_minimum = create_custom_product(&db, "AT-MIN", 2.0, 10, 1).await?;
        let below = create_custom_product(&db, "BELOW", 2.0, 10, 1).await?;
        let never_counted = create_custom_product(&db, "NEVER", 2.0, 10, 1).await?;

        count_entry(&db, 1, at_minimum.id, store.id, (10, 0, 0, 10)).await?;
        count_entry(&db, 1, below.id, store.id, (9, 0, 0, 9)).await?;

        let low = get_products_with_low_stock(&db, Scope::all()).await?;
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product.id, below.id);
        assert_eq!(low[0].current_stock, 9);
        assert!(low.iter().all(|l| l.product.id != never_counted.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_low_stock_uses_highest_reported_count_in_scope() -> Result<()> {
        let (db, _center, store, _product) = setup_with_stock_fixture().await?;
        let other = create_test_store(&db, "Harbour Street").await?;
        let rolls = create_custom_product(&db, "ROLL", 1.0, 10, 1).await?;

        count_entry(&db, 1, rolls.id, store.id, (4, 0, 0, 4)).await?;
        count_entry(&db, 2, rolls.id, store.id, (0, 0, 0, 3)).await?;
        count_entry(&db, 1, rolls.id, other.id, (12, 0, 0, 12)).await?;

        assert!(get_products_with_low_stock(&db, Scope::all()).await?.is_empty());

        let scoped = get_products_with_low_stock(&db, Scope::store(store.id)).await?;
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].current_stock, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_discrepancy_threshold_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = get_stock_discrepancies(&db, -1.0, 50, Scope::all()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_discrepancies_are_filtered_and_enriched() -> Result<()> {
        let (db, _center, store, product) = setup_with_stock_fixture().await?;

        // Day 1: base 20, expected 20, counted 19 -> -5%
        count_entry(&db, 1, product.id, store.id, (20, 0, 0, 19)).await?;
        // Day 2: base 19, expected 19, counted 19 -> 0%
        count_entry(&db, 2, product.id, store.id, (0, 0, 0, 19)).await?;
        // Day 3: base 20, expected 20, counted 24 -> +20%
        count_entry(&db, 3, product.id, store.id, (1, 0, 0, 24)).await?;

        let found = get_stock_discrepancies(&db, 5.0, 50, Scope::all()).await?;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].entry.date, test_date(3));
        assert_eq!(found[1].entry.date, test_date(1));
        assert_eq!(found[0].product_name, product.name);
        assert_eq!(found[0].store_name, store.name);

        // The window only covers the newest entry
        let windowed = get_stock_discrepancies(&db, 5.0, 1, Scope::all()).await?;
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].entry.date, test_date(3));

        let other = create_test_store(&db, "Harbour Street").await?;
        let scoped = get_stock_discrepancies(&db, 5.0, 50, Scope::store(other.id)).await?;
        assert!(scoped.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_inventory_dashboard_trailing_week() -> Result<()> {
        let (db, center, store, product) = setup_with_stock_fixture().await?;
        record_production(&db, center, test_date(1), product.id, 100, None).await?;

        // Day 1 falls outside the window ending on day 8
        for (day, quantity) in [(1, 50), (2, 10), (8, 5)] {
            create_delivery(
                &db,
                center,
                NewDelivery {
                    date: test_date(day),
                    store_id: store.id,
                    product_id: product.id,
                    quantity_sent: quantity,
                },
            )
            .await?;
        }
        for (day, quantity) in [(1, 7), (3, 4), (8, 2)] {
            record_sale(
                &db,
                NewSale {
                    date: test_date(day),
                    store_id: store.id,
                    product_id: product.id,
                    quantity,
                    unit_price: None,
                    source: SaleSource::Manual,
                },
            )
            .await?;
        }

        let dashboard = inventory_dashboard(&db, center, test_date(8), Scope::all()).await?;
        assert_eq!(dashboard.from, test_date(2));
        assert_eq!(dashboard.to, test_date(8));

        let row = dashboard
            .products
            .iter()
            .find(|p| p.product_id == product.id)
            .unwrap();
        assert_eq!(row.weekly_sales, 6);
        assert_eq!(row.weekly_deliveries, 15);
        assert_eq!(row.current_stock, 35);
        assert_eq!(row.forecast.weekly_demand, 21);
        assert_eq!(row.forecast.suggested_production, 7);
        assert_eq!(row.forecast.stock_level, StockLevel::Medium);
        Ok(())
    }
}
