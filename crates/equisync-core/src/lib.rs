//! Core domain types and the Alpha Vantage market-data client.
//!
//! The crate is deliberately storage-free: it models symbols, price bars,
//! and company profiles, and fetches them over an injectable HTTP
//! transport. Persistence lives in `equisync-store`.

pub mod alphavantage;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod retry;

pub use alphavantage::{AlphaVantageClient, ApiError};
pub use domain::{parse_date, DateRange, PriceBar, StockProfile, Symbol};
pub use error::ValidationError;
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use retry::{RetryPolicy, RATE_LIMIT_DELAY};
