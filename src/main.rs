// src/main.rs
use cashflow::application::usecase::{PriceRefresher, ReportService};
use cashflow::config::Config;
use cashflow::domain::errors::AppResult;
use cashflow::domain::repository::{PriceHistoryProvider, StockRepository};
use cashflow::infrastructure::price::JsonPriceProvider;
use cashflow::infrastructure::repository::JsonLedgerRepository;
use cashflow::price::PriceCache;

use std::sync::Arc;
use tokio::signal::ctrl_c;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    config.init_logging()?;

    log::info!("Starting cashflow v{}", env!("CARGO_PKG_VERSION"));
    log::info!(
        "Ledger: {}, quotes: {}",
        config.sources.ledger_path,
        config.sources.prices_path
    );

    let repository: Arc<dyn StockRepository> =
        Arc::new(JsonLedgerRepository::new(&config.sources.ledger_path));
    let provider: Arc<dyn PriceHistoryProvider> =
        Arc::new(JsonPriceProvider::new(&config.sources.prices_path));
    let prices = Arc::new(PriceCache::new(provider));

    let refresher = PriceRefresher::new(repository.clone(), prices.clone());
    let reports = ReportService::new(repository, prices);

    // The first tick fires immediately, so prices are loaded at startup
    let mut interval = tokio::time::interval(config.refresh.interval());
    log::info!(
        "Refreshing prices every {}s. Press Ctrl+C to stop.",
        config.refresh.interval().as_secs()
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                refresh_and_report(&refresher, &reports, config.refresh.stock.as_deref()).await;
            }
            result = ctrl_c() => {
                if let Err(e) = result {
                    log::error!("Failed to listen for control-c event: {}", e);
                }
                break;
            }
        }
    }

    log::info!("Shutdown complete. Goodbye!");
    Ok(())
}

/// Refresh the cache and log the resulting portfolio. Failures are logged and
/// the previous prices stay in use until the next tick.
async fn refresh_and_report(refresher: &PriceRefresher, reports: &ReportService, stock: Option<&str>) {
    if let Err(e) = refresher.refresh_now().await {
        log::error!("Price refresh failed: {}", e);
        return;
    }

    match reports.current_portfolio_report(stock).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => log::info!("Portfolio:\n{}", json),
            Err(e) => log::error!("Failed to encode portfolio report: {}", e),
        },
        Err(e) => log::error!("Failed to build portfolio report: {}", e),
    }
}
