//! Domain types for the sync pipeline.
//!
//! All values are validated at construction time: symbols normalize to
//! uppercase, bars enforce `high >= low` and non-negative fields, and date
//! ranges are inclusive with `start <= end`.

mod date_range;
mod models;
mod symbol;

pub use date_range::{parse_date, DateRange};
pub use models::{PriceBar, StockProfile};
pub use symbol::Symbol;
