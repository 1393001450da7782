//! Orchestration of one sync run: ensure the stock row exists, then pull
//! the daily series for the window and persist whatever is new.

use equisync_core::{AlphaVantageClient, DateRange, PriceBar, StockProfile, Symbol};
use equisync_store::{DailyPriceRecord, StockRecord, Store};

use crate::error::CliError;

/// How the stock row was reconciled before the price fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    /// The symbol was unknown; a row was created.
    Created(i64),
    /// The symbol was known and its metadata was refetched.
    Refreshed(i64),
    /// The symbol was known and left untouched.
    Unchanged(i64),
}

impl StockOutcome {
    pub const fn stock_id(self) -> i64 {
        match self {
            Self::Created(id) | Self::Refreshed(id) | Self::Unchanged(id) => id,
        }
    }
}

/// Summary of one completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub stock: StockOutcome,
    pub inserted: usize,
    pub skipped: usize,
}

pub async fn run(
    client: &AlphaVantageClient,
    store: &Store,
    symbol: &Symbol,
    window: &DateRange,
    update_info: bool,
) -> Result<SyncReport, CliError> {
    let stock = ensure_stock(client, store, symbol, update_info).await?;
    let stock_id = stock.stock_id();

    log::info!(
        "fetching price history for {symbol} from {} to {}",
        window.start(),
        window.end()
    );
    let bars = client.daily_series(symbol, window).await?;

    if bars.is_empty() {
        log::warn!("no price data available for {symbol} in the requested window");
        return Ok(SyncReport {
            stock,
            inserted: 0,
            skipped: 0,
        });
    }

    let rows: Vec<DailyPriceRecord> = bars.iter().map(to_price_record).collect();
    let report = store.insert_daily_prices(stock_id, &rows)?;
    log::info!(
        "inserted {} price records for {symbol} (skipped {} duplicates)",
        report.inserted,
        report.skipped
    );

    Ok(SyncReport {
        stock,
        inserted: report.inserted,
        skipped: report.skipped,
    })
}

async fn ensure_stock(
    client: &AlphaVantageClient,
    store: &Store,
    symbol: &Symbol,
    update_info: bool,
) -> Result<StockOutcome, CliError> {
    match store.find_stock(symbol.as_str())? {
        None => {
            log::info!("fetching company information for {symbol}");
            let profile = client.company_overview(symbol).await?;
            let stock_id = store.insert_stock(&to_stock_record(&profile))?;
            log::info!("added {symbol} to stocks table with id {stock_id}");
            Ok(StockOutcome::Created(stock_id))
        }
        Some(stock_id) if update_info => {
            log::info!("refreshing company information for {symbol}");
            let profile = client.company_overview(symbol).await?;
            store.update_stock(stock_id, &to_stock_record(&profile))?;
            Ok(StockOutcome::Refreshed(stock_id))
        }
        Some(stock_id) => {
            log::info!("{symbol} already exists in stocks table with id {stock_id}");
            Ok(StockOutcome::Unchanged(stock_id))
        }
    }
}

fn to_stock_record(profile: &StockProfile) -> StockRecord {
    StockRecord {
        symbol: profile.symbol.to_string(),
        company_name: profile.company_name.clone(),
        industry: profile.industry.clone(),
        market_cap: profile.market_cap,
        description: profile.description.clone(),
    }
}

fn to_price_record(bar: &PriceBar) -> DailyPriceRecord {
    DailyPriceRecord {
        price_date: bar.date.to_string(),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume,
    }
}
