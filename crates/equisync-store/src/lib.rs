//! Embedded DuckDB store for stocks and their daily price history.
//!
//! The schema is versioned through `schema_migrations`, so opening the same
//! database twice is safe. Price rows are keyed by `(stock_id, price_date)`;
//! the batch writer treats a duplicate key as an expected skip rather than
//! a failure, which is what makes re-running a sync idempotent.

pub mod migrations;

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use duckdb::{Connection, ToSql};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("store connection poisoned")]
    Poisoned,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// Company row as persisted, decoupled from the fetch-side types.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub symbol: String,
    pub company_name: String,
    pub industry: String,
    pub market_cap: f64,
    pub description: String,
}

/// One daily bar ready for insertion; `price_date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPriceRecord {
    pub price_date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Outcome of a batch price insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped: usize,
}

pub struct Store {
    connection: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at the configured path and bring the
    /// schema up to date.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(config.db_path.as_path())?;
        migrations::apply_migrations(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()?;
        migrations::apply_migrations(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Look up a stock id by symbol.
    pub fn find_stock(&self, symbol: &str) -> Result<Option<i64>, StoreError> {
        let connection = self.lock()?;
        let result = connection.query_row(
            "SELECT stock_id FROM stocks WHERE symbol = ?",
            [&symbol as &dyn ToSql],
            |row| row.get(0),
        );

        match result {
            Ok(stock_id) => Ok(Some(stock_id)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a new stock row and return its generated id.
    pub fn insert_stock(&self, record: &StockRecord) -> Result<i64, StoreError> {
        let connection = self.lock()?;
        let stock_id = connection.query_row(
            "INSERT INTO stocks (symbol, company_name, industry, market_cap, description) \
             VALUES (?, ?, ?, ?, ?) RETURNING stock_id",
            [
                &record.symbol as &dyn ToSql,
                &record.company_name,
                &record.industry,
                &record.market_cap,
                &record.description,
            ],
            |row| row.get(0),
        )?;
        Ok(stock_id)
    }

    /// Overwrite the mutable company fields of an existing stock.
    pub fn update_stock(&self, stock_id: i64, record: &StockRecord) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection.execute(
            "UPDATE stocks SET company_name = ?, industry = ?, market_cap = ?, \
             description = ?, updated_at = CURRENT_TIMESTAMP WHERE stock_id = ?",
            [
                &record.company_name as &dyn ToSql,
                &record.industry,
                &record.market_cap,
                &record.description,
                &stock_id,
            ],
        )?;
        Ok(())
    }

    /// Load a stock row by symbol, if present.
    pub fn load_stock(&self, symbol: &str) -> Result<Option<(i64, StockRecord)>, StoreError> {
        let connection = self.lock()?;
        let result = connection.query_row(
            "SELECT stock_id, symbol, company_name, industry, market_cap, description \
             FROM stocks WHERE symbol = ?",
            [&symbol as &dyn ToSql],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    StockRecord {
                        symbol: row.get(1)?,
                        company_name: row.get(2)?,
                        industry: row.get(3)?,
                        market_cap: row.get(4)?,
                        description: row.get(5)?,
                    },
                ))
            },
        );

        match result {
            Ok(found) => Ok(Some(found)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a batch of daily bars for one stock.
    ///
    /// Each row is written independently: a duplicate `(stock_id, price_date)`
    /// key counts as a skip, and any other per-row failure is logged and does
    /// not abort the rest of the batch.
    pub fn insert_daily_prices(
        &self,
        stock_id: i64,
        rows: &[DailyPriceRecord],
    ) -> Result<IngestReport, StoreError> {
        let connection = self.lock()?;
        let mut report = IngestReport::default();

        for row in rows {
            let result = connection.execute(
                "INSERT INTO daily_prices (stock_id, price_date, open, high, low, close, volume) \
                 VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?)",
                [
                    &stock_id as &dyn ToSql,
                    &row.price_date,
                    &row.open,
                    &row.high,
                    &row.low,
                    &row.close,
                    &row.volume,
                ],
            );

            match result {
                Ok(_) => report.inserted += 1,
                Err(e) if is_duplicate_key(&e) => report.skipped += 1,
                Err(e) => {
                    log::error!("failed to insert price row for {}: {e}", row.price_date);
                }
            }
        }

        Ok(report)
    }

    /// Count of persisted daily bars for one stock.
    pub fn count_daily_prices(&self, stock_id: i64) -> Result<i64, StoreError> {
        let connection = self.lock()?;
        let count = connection.query_row(
            "SELECT COUNT(*) FROM daily_prices WHERE stock_id = ?",
            [&stock_id as &dyn ToSql],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn is_duplicate_key(error: &duckdb::Error) -> bool {
    let message = error.to_string();
    message.contains("Duplicate key")
        || message.contains("violates primary key")
        || message.contains("violates unique constraint")
}
