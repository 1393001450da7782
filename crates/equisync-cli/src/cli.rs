//! Command-line interface for the equisync batch job.
//!
//! One invocation syncs one ticker: company metadata plus the daily bars
//! falling inside the requested window. With no explicit bounds the window
//! is the trailing 30 days ending today.

use clap::Parser;
use time::Date;

use equisync_core::{parse_date, DateRange, ValidationError};

/// Sync one stock's metadata and daily price history into the local store.
#[derive(Debug, Parser)]
#[command(
    name = "equisync",
    version,
    about = "Sync stock metadata and daily prices into a local DuckDB store"
)]
pub struct Cli {
    /// Ticker symbol to sync (e.g. AAPL).
    pub symbol: String,

    /// Window start (YYYY-MM-DD). Defaults to 30 days before today.
    #[arg(long)]
    pub start: Option<String>,

    /// Window end (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    /// Refresh company metadata even if the stock is already known.
    #[arg(long)]
    pub update_info: bool,
}

impl Cli {
    /// Resolve the sync window from the optional bounds.
    ///
    /// Inverted bounds (`--start` after `--end`) are rejected up front
    /// rather than silently producing an empty window; the run fails
    /// before any network or database work.
    pub fn window(&self) -> Result<DateRange, ValidationError> {
        let default = DateRange::trailing_days(30);
        let start = resolve_bound(self.start.as_deref(), default.start())?;
        let end = resolve_bound(self.end.as_deref(), default.end())?;
        DateRange::new(start, end)
    }
}

fn resolve_bound(raw: Option<&str>, default: Date) -> Result<Date, ValidationError> {
    match raw {
        Some(value) => parse_date(value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use time::{Duration, OffsetDateTime};

    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(args.iter().copied())
    }

    #[test]
    fn default_window_is_trailing_thirty_days() {
        let cli = parse_args(&["equisync", "AAPL"]);
        let window = cli.window().expect("valid window");
        let today = OffsetDateTime::now_utc().date();
        assert_eq!(window.end(), today);
        assert_eq!(window.start(), today - Duration::days(30));
    }

    #[test]
    fn explicit_bounds_are_honored() {
        let cli = parse_args(&[
            "equisync",
            "AAPL",
            "--start",
            "2026-07-01",
            "--end",
            "2026-07-31",
        ]);
        let window = cli.window().expect("valid window");
        assert_eq!(window.start(), date!(2026 - 07 - 01));
        assert_eq!(window.end(), date!(2026 - 07 - 31));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let cli = parse_args(&[
            "equisync",
            "AAPL",
            "--start",
            "2026-08-01",
            "--end",
            "2026-07-01",
        ]);
        assert!(cli.window().is_err());
    }

    #[test]
    fn malformed_date_is_rejected() {
        let cli = parse_args(&["equisync", "AAPL", "--start", "07/01/2026"]);
        assert!(matches!(
            cli.window(),
            Err(ValidationError::InvalidDate { .. })
        ));
    }
}
