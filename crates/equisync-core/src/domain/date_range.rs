use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

use crate::ValidationError;

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input, format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: input.to_owned(),
        }
    })
}

/// Inclusive calendar-date window used to restrict a daily time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Window covering the trailing `days` days up to today (UTC).
    pub fn trailing_days(days: i64) -> Self {
        let end = OffsetDateTime::now_utc().date();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub const fn start(self) -> Date {
        self.start
    }

    pub const fn end(self) -> Date {
        self.end
    }

    pub fn contains(self, date: Date) -> bool {
        date >= self.start && date <= self.end
    }
}
