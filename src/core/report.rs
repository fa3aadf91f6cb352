//! Daily report generation.
//!
//! [`generate_daily_report`] gathers the alert feeds and the forecast into one structure;
//! the `format_*` helpers turn it into plain text for the terminal.

use crate::{
    core::{
        Scope,
        analytics::{self, InventoryDashboard, LowStockProduct, ProductForecast, StockDiscrepancy},
        cost::{self, CostBreakdown},
        product::get_all_products,
        stock_entry::{self, WasteAlert},
        store::ProductionCenter,
    },
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use std::fmt::Write;

/// Thresholds applied when building a [`DailyReport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportOptions {
    /// Minimum absolute discrepancy to report, in percent
    pub discrepancy_threshold: f64,
    /// Number of recent entries scanned for discrepancies
    pub discrepancy_window: u64,
    /// Store filter
    pub scope: Scope,
}

/// Margin figures for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductMargin {
    /// Product code
    pub code: String,
    /// Product name
    pub name: String,
    /// Selling price per unit
    pub selling_price: f64,
    /// Cost figures
    pub cost: CostBreakdown,
}

/// Everything shown in the daily report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    /// Business date of the report
    pub date: NaiveDate,
    /// Products below their minimum stock
    pub low_stock: Vec<LowStockProduct>,
    /// Recent entries with large discrepancies
    pub discrepancies: Vec<StockDiscrepancy>,
    /// Entries of the day with excessive waste
    pub waste_alerts: Vec<WasteAlert>,
    /// Weekly production forecast
    pub dashboard: InventoryDashboard,
    /// Margin per product
    pub margins: Vec<ProductMargin>,
}

/// Collects the report data for `date`.
pub async fn generate_daily_report<C>(
    db: &C,
    center: ProductionCenter,
    date: NaiveDate,
    options: ReportOptions,
) -> Result<DailyReport>
where
    C: ConnectionTrait,
{
    let low_stock = analytics::get_products_with_low_stock(db, options.scope).await?;
    let discrepancies = analytics::get_stock_discrepancies(
        db,
        options.discrepancy_threshold,
        options.discrepancy_window,
        options.scope,
    )
    .await?;
    let waste_alerts = stock_entry::waste_alerts(db, options.scope, date).await?;
    let dashboard = analytics::inventory_dashboard(db, center, date, options.scope).await?;

    let mut margins = Vec::new();
    for product in get_all_products(db).await? {
        if let Some(cost) = cost::get_cost_breakdown(db, product.id).await? {
            margins.push(ProductMargin {
                code: product.code,
                name: product.name,
                selling_price: product.selling_price,
                cost,
            });
        }
    }

    Ok(DailyReport {
        date,
        low_stock,
        discrepancies,
        waste_alerts,
        dashboard,
        margins,
    })
}

/// Formats a discrepancy with an explicit sign, e.g. `+6.67%` or `-15.00%`.
#[must_use]
pub fn format_discrepancy(discrepancy: f64) -> String {
    if discrepancy >= 0.0 {
        format!("+{discrepancy:.2}%")
    } else {
        format!("-{:.2}%", discrepancy.abs())
    }
}

/// Generates a coverage bar for stock against the two-week target.
///
/// Creates a text bar like: `[████████░░] 80%`
#[must_use]
pub fn format_coverage_bar(current_stock: i64, target: i64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    #[allow(clippy::cast_precision_loss)]
    let percent = if target > 0 {
        current_stock as f64 / target as f64 * 100.0
    } else {
        100.0
    };
    let clamped = percent.clamp(0.0, 100.0);

    // clamped is in [0, 100] and length is small, so the product fits in usize
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!("[{}{}] {percent:.0}%", "█".repeat(filled), "░".repeat(empty))
}

/// One line per low-stock product.
#[must_use]
pub fn format_low_stock_line(item: &LowStockProduct) -> String {
    format!(
        "{} ({}): {} on hand, minimum {}",
        item.product.name, item.product.code, item.current_stock, item.product.min_stock_level
    )
}

/// One line per discrepancy alert.
#[must_use]
pub fn format_discrepancy_line(item: &StockDiscrepancy) -> String {
    format!(
        "{} | {} @ {} | expected {}, counted {} ({})",
        item.entry.date,
        item.product_name,
        item.store_name,
        item.entry.expected_stock,
        item.entry.reported_stock,
        format_discrepancy(item.entry.discrepancy)
    )
}

/// One line per waste alert.
#[must_use]
pub fn format_waste_alert_line(item: &WasteAlert) -> String {
    format!(
        "{} @ {}: wasted {} ({:.1}% > {:.1}%)",
        item.product_name,
        item.store_name,
        item.entry.waste,
        item.waste_percent,
        item.max_waste_percent
    )
}

/// One line per forecast row.
#[must_use]
pub fn format_forecast_line(item: &ProductForecast) -> String {
    let target = item.forecast.weekly_demand * 2;
    format!(
        "{:<24} demand {:>4}  stock {:>4}  bake {:>4}  {:<6} {}",
        item.product_name,
        item.forecast.weekly_demand,
        item.current_stock,
        item.forecast.suggested_production,
        item.forecast.stock_level,
        format_coverage_bar(item.current_stock, target, None)
    )
}

/// Formats a product's margin, e.g. `1.20 cost / 3.00 price (60.0% margin)`.
#[must_use]
pub fn format_margin(margin: &ProductMargin) -> String {
    format!(
        "{} ({}): {:.2} cost / {:.2} price ({:.1}% margin)",
        margin.name,
        margin.code,
        margin.cost.unit_cost,
        margin.selling_price,
        margin.cost.margin_percent
    )
}

fn write_section<T>(out: &mut String, title: &str, items: &[T], line: impl Fn(&T) -> String) {
    let _ = writeln!(out, "\n{title}");
    if items.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for item in items {
        let _ = writeln!(out, "  {}", line(item));
    }
}

/// Renders the whole report as text.
#[must_use]
pub fn format_daily_report(report: &DailyReport) -> String {
    let mut out = format!("Daily stock report for {}\n", report.date);
    write_section(
        &mut out,
        "Low stock",
        &report.low_stock,
        format_low_stock_line,
    );
    write_section(
        &mut out,
        "Discrepancies",
        &report.discrepancies,
        format_discrepancy_line,
    );
    write_section(
        &mut out,
        "Excessive waste",
        &report.waste_alerts,
        format_waste_alert_line,
    );
    write_section(
        &mut out,
        &format!(
            "Production forecast ({} to {})",
            report.dashboard.from, report.dashboard.to
        ),
        &report.dashboard.products,
        format_forecast_line,
    );
    write_section(&mut out, "Margins", &report.margins, format_margin);
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        ledger::record_production,
        recipe::create_recipe,
        stock_entry::{NewStockEntry, create_stock_entry},
    };
    use crate::test_utils::*;

    #[test]
    fn test_format_discrepancy_sign() {
        assert_eq!(format_discrepancy(6.666_666), "+6.67%");
        assert_eq!(format_discrepancy(0.0), "+0.00%");
        assert_eq!(format_discrepancy(-15.0), "-15.00%");
    }

    #[test]
    fn test_format_coverage_bar() {
        assert_eq!(format_coverage_bar(40, 40, Some(10)), "[██████████] 100%");
        assert_eq!(format_coverage_bar(20, 40, Some(10)), "[█████░░░░░] 50%");
        assert_eq!(format_coverage_bar(0, 40, Some(10)), "[░░░░░░░░░░] 0%");
        // Overstock is capped in the bar but not in the label
        assert_eq!(format_coverage_bar(80, 40, Some(10)), "[██████████] 200%");
        // No demand means full coverage
        assert_eq!(format_coverage_bar(0, 0, Some(4)), "[████] 100%");
    }

    #[tokio::test]
    async fn test_generate_daily_report_integration() -> Result<()> {
        let (db, center, store, product) = setup_with_stock_fixture().await?;
        let flour = create_test_ingredient(&db, "Flour", 0.5).await?;
        create_recipe(&db, product.id, flour.id, 2.0).await?;
        record_production(&db, center, test_date(1), product.id, 30, None).await?;

        // 10% waste and a -10% discrepancy
        create_stock_entry(
            &db,
            NewStockEntry {
                date: test_date(1),
                product_id: product.id,
                store_id: store.id,
                counts: counts(10, 1, 0, 8),
            },
        )
        .await?;

        let options = ReportOptions {
            discrepancy_threshold: 5.0,
            discrepancy_window: 50,
            scope: Scope::all(),
        };
        let report = generate_daily_report(&db, center, test_date(1), options).await?;

        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.waste_alerts.len(), 1);
        assert_eq!(report.dashboard.products.len(), 1);
        assert_eq!(report.margins.len(), 1);
        assert_eq!(report.margins[0].cost.unit_cost, 1.0);

        let text = format_daily_report(&report);
        assert!(text.starts_with("Daily stock report for"));
        assert!(text.contains("-10.00%"));
        assert!(text.contains("Excessive waste"));
        assert!(text.contains(&format!(
            "{} @ {}: wasted 1 (11.1% > 5.0%)",
            product.name, store.name
        )));
        assert!(text.contains(&product.name));
        Ok(())
    }
}
