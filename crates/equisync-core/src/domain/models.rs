use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Symbol, ValidationError};

/// Company metadata as returned by the overview endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    pub symbol: Symbol,
    pub company_name: String,
    pub industry: String,
    pub market_cap: f64,
    pub description: String,
}

impl StockProfile {
    pub fn new(
        symbol: Symbol,
        company_name: impl Into<String>,
        industry: impl Into<String>,
        market_cap: f64,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("market_cap", market_cap)?;

        Ok(Self {
            symbol,
            company_name: company_name.into(),
            industry: industry.into(),
            market_cap,
            description: description.into(),
        })
    }
}

/// Daily OHLCV bar keyed by calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if volume < 0 {
            return Err(ValidationError::NegativeValue { field: "volume" });
        }

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
