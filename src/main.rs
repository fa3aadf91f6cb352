use bakery_ledger::{
    config::{catalog, database, settings::Settings},
    core::{
        Scope,
        report::{self, ReportOptions},
        seed, store,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use dotenvy::dotenv;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal
    dotenv().ok();

    // 3. Settings and report date
    let settings = Settings::from_env()?;
    let report_date = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d").map_err(|e| Error::Config {
            message: format!("Invalid report date '{arg}', expected YYYY-MM-DD: {e}"),
        })?,
        None => chrono::Local::now().date_naive(),
    };

    // 4. Database
    database::ensure_database_dir(&settings.database_url)?;
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    info!("Database ready at {}", settings.database_url);

    // 5. Seed the catalog when the file is present
    if Path::new(&settings.catalog_path).exists() {
        let catalog = catalog::load_catalog(&settings.catalog_path)?;
        seed::seed_catalog(&db, &catalog)
            .await
            .inspect_err(|e| error!("Failed to seed catalog: {e}"))?;
    } else {
        warn!(
            "Catalog file {} not found; skipping seeding",
            settings.catalog_path
        );
    }

    // 6. Report
    let center = store::resolve_production_center(&db, &settings.production_center_name)
        .await
        .inspect_err(|_| {
            error!(
                "No store named '{}'; set PRODUCTION_CENTER_NAME or add it to the catalog",
                settings.production_center_name
            );
        })?;
    let options = ReportOptions {
        discrepancy_threshold: settings.discrepancy_threshold,
        discrepancy_window: settings.discrepancy_window,
        scope: Scope::all(),
    };
    let daily = report::generate_daily_report(&db, center, report_date, options).await?;
    println!("{}", report::format_daily_report(&daily));

    Ok(())
}
