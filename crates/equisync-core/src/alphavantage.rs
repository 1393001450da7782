//! Alpha Vantage client: company overview and daily time series.
//!
//! Two read-only GET endpoints. An HTTP 429 triggers a fixed-delay retry of
//! the identical call, bounded by [`RetryPolicy::max_retries`]; any other
//! non-success status, transport failure, or missing payload key is fatal
//! for the call.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use time::macros::format_description;
use time::Date;

use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;
use crate::{DateRange, PriceBar, StockProfile, Symbol};

const BASE_URL: &str = "https://www.alphavantage.co/query";

// Full-size daily series payloads can run to several megabytes.
const REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Errors surfaced by the market-data client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {status}")]
    Http { status: u16 },

    #[error("rate limit persisted after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("no company information found for {symbol}")]
    MissingOverview { symbol: String },

    #[error("no price data found for {symbol}")]
    MissingSeries { symbol: String },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Client for the two Alpha Vantage endpoints used by the sync job.
///
/// The transport and retry policy are injected so tests can script
/// responses and collapse the rate-limit delay.
#[derive(Clone)]
pub struct AlphaVantageClient {
    http: Arc<dyn HttpClient>,
    api_key: String,
    retry: RetryPolicy,
}

impl AlphaVantageClient {
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch company metadata from the overview endpoint.
    ///
    /// Missing optional fields fall back the same way the seed data always
    /// has: name to the ticker, industry to "Unknown", market cap to zero,
    /// description to a placeholder. A payload without a `Symbol` key means
    /// the ticker is unknown upstream.
    pub async fn company_overview(&self, symbol: &Symbol) -> Result<StockProfile, ApiError> {
        let url = format!(
            "{BASE_URL}?function=OVERVIEW&symbol={}&apikey={}",
            urlencoding::encode(symbol.as_str()),
            self.api_key
        );
        let response = self.execute_with_retry(url).await?;

        let payload: OverviewPayload = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Malformed(format!("overview response: {e}")))?;

        if payload.symbol.is_none() {
            return Err(ApiError::MissingOverview {
                symbol: symbol.to_string(),
            });
        }

        let market_cap = match payload.market_capitalization.as_deref() {
            Some(raw) => raw.parse::<f64>().map_err(|_| {
                ApiError::Malformed(format!("invalid market capitalization '{raw}'"))
            })?,
            None => 0.0,
        };

        StockProfile::new(
            symbol.clone(),
            payload.name.unwrap_or_else(|| symbol.to_string()),
            payload.industry.unwrap_or_else(|| String::from("Unknown")),
            market_cap,
            payload
                .description
                .unwrap_or_else(|| String::from("No description available")),
        )
        .map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// Fetch the full daily series, restrict it to `window`, and return the
    /// surviving bars sorted descending by date.
    pub async fn daily_series(
        &self,
        symbol: &Symbol,
        window: &DateRange,
    ) -> Result<Vec<PriceBar>, ApiError> {
        let url = format!(
            "{BASE_URL}?function=TIME_SERIES_DAILY&symbol={}&outputsize=full&apikey={}",
            urlencoding::encode(symbol.as_str()),
            self.api_key
        );
        let response = self.execute_with_retry(url).await?;

        let payload: SeriesPayload = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Malformed(format!("time series response: {e}")))?;

        let Some(series) = payload.series else {
            if let Some(note) = payload.note {
                log::error!("api message: {note}");
            }
            return Err(ApiError::MissingSeries {
                symbol: symbol.to_string(),
            });
        };

        let mut bars = Vec::new();
        for (date_str, raw) in &series {
            let date = Date::parse(date_str, format_description!("[year]-[month]-[day]"))
                .map_err(|_| ApiError::Malformed(format!("invalid series date '{date_str}'")))?;
            if !window.contains(date) {
                continue;
            }
            bars.push(raw.coerce(date)?);
        }

        // BTreeMap iteration is oldest-first; flip to newest-first.
        bars.reverse();
        Ok(bars)
    }

    async fn execute_with_retry(&self, url: String) -> Result<HttpResponse, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            let request = HttpRequest::get(url.clone()).with_timeout_ms(REQUEST_TIMEOUT_MS);
            let response = self
                .http
                .execute(request)
                .await
                .map_err(|e| ApiError::Transport(e.message().to_owned()))?;

            if response.is_success() {
                return Ok(response);
            }

            if self.retry.should_retry_status(response.status) {
                if attempt < self.retry.max_retries {
                    attempt += 1;
                    log::warn!(
                        "rate limit hit; waiting {}s before retry {attempt}/{}",
                        self.retry.delay.as_secs(),
                        self.retry.max_retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    continue;
                }
                return Err(ApiError::RateLimited {
                    attempts: self.retry.attempts(),
                });
            }

            return Err(ApiError::Http {
                status: response.status,
            });
        }
    }
}

#[derive(Debug, Deserialize)]
struct OverviewPayload {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesPayload {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, RawDailyBar>>,
    #[serde(rename = "Note")]
    note: Option<String>,
}

/// One raw series entry; every numeric field arrives as a string.
#[derive(Debug, Deserialize)]
struct RawDailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl RawDailyBar {
    fn coerce(&self, date: Date) -> Result<PriceBar, ApiError> {
        let open = parse_price("open", &self.open)?;
        let high = parse_price("high", &self.high)?;
        let low = parse_price("low", &self.low)?;
        let close = parse_price("close", &self.close)?;
        let volume = self
            .volume
            .parse::<i64>()
            .map_err(|_| ApiError::Malformed(format!("invalid volume '{}'", self.volume)))?;

        PriceBar::new(date, open, high, low, close, volume)
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

fn parse_price(field: &str, value: &str) -> Result<f64, ApiError> {
    value
        .parse::<f64>()
        .map_err(|_| ApiError::Malformed(format!("invalid {field} value '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    use time::macros::date;

    use crate::http_client::HttpError;

    use super::*;

    struct ScriptedHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .iter()
                .map(|request| request.url.clone())
                .collect()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self
                .responses
                .lock()
                .expect("response queue should not be poisoned")
                .pop_front()
                .expect("scripted client ran out of responses");
            Box::pin(async move { response })
        }
    }

    fn overview_body() -> String {
        String::from(
            r#"{
                "Symbol": "AAPL",
                "Name": "Apple Inc.",
                "Industry": "Consumer Electronics",
                "MarketCapitalization": "2850000000000",
                "Description": "Designs and sells smartphones."
            }"#,
        )
    }

    fn series_body() -> String {
        String::from(
            r#"{
                "Time Series (Daily)": {
                    "2026-08-19": {
                        "1. open": "101.0", "2. high": "103.5", "3. low": "100.2",
                        "4. close": "102.8", "5. volume": "51000"
                    },
                    "2026-08-20": {
                        "1. open": "102.8", "2. high": "104.0", "3. low": "101.9",
                        "4. close": "103.1", "5. volume": "47000"
                    },
                    "2026-07-01": {
                        "1. open": "90.0", "2. high": "91.0", "3. low": "89.5",
                        "4. close": "90.4", "5. volume": "38000"
                    }
                }
            }"#,
        )
    }

    fn client_with(
        responses: Vec<Result<HttpResponse, HttpError>>,
    ) -> (Arc<ScriptedHttpClient>, AlphaVantageClient) {
        let http = Arc::new(ScriptedHttpClient::new(responses));
        let client = AlphaVantageClient::new(Arc::clone(&http) as Arc<dyn HttpClient>, "demo-key")
            .with_retry(RetryPolicy::no_retry());
        (http, client)
    }

    #[tokio::test]
    async fn overview_parses_profile_and_appends_api_key() {
        let (http, client) = client_with(vec![Ok(HttpResponse::ok_json(overview_body()))]);
        let symbol = Symbol::parse("AAPL").expect("valid symbol");

        let profile = client
            .company_overview(&symbol)
            .await
            .expect("overview should succeed");

        assert_eq!(profile.company_name, "Apple Inc.");
        assert_eq!(profile.industry, "Consumer Electronics");
        assert_eq!(profile.market_cap, 2_850_000_000_000.0);

        let urls = http.recorded_urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("function=OVERVIEW"));
        assert!(urls[0].contains("symbol=AAPL"));
        assert!(urls[0].contains("apikey=demo-key"));

        let requests = http
            .requests
            .lock()
            .expect("request store should not be poisoned");
        assert_eq!(requests[0].timeout_ms, REQUEST_TIMEOUT_MS);
    }

    #[tokio::test]
    async fn overview_defaults_missing_fields() {
        let (_, client) = client_with(vec![Ok(HttpResponse::ok_json(r#"{"Symbol": "XYZ"}"#))]);
        let symbol = Symbol::parse("XYZ").expect("valid symbol");

        let profile = client
            .company_overview(&symbol)
            .await
            .expect("overview should succeed");

        assert_eq!(profile.company_name, "XYZ");
        assert_eq!(profile.industry, "Unknown");
        assert_eq!(profile.market_cap, 0.0);
        assert_eq!(profile.description, "No description available");
    }

    #[tokio::test]
    async fn overview_without_symbol_key_is_fatal() {
        let (_, client) = client_with(vec![Ok(HttpResponse::ok_json("{}"))]);
        let symbol = Symbol::parse("NOPE").expect("valid symbol");

        let err = client
            .company_overview(&symbol)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ApiError::MissingOverview { .. }));
    }

    #[tokio::test]
    async fn daily_series_filters_window_and_sorts_descending() {
        let (http, client) = client_with(vec![Ok(HttpResponse::ok_json(series_body()))]);
        let symbol = Symbol::parse("AAPL").expect("valid symbol");
        let window =
            DateRange::new(date!(2026 - 08 - 01), date!(2026 - 08 - 31)).expect("valid range");

        let bars = client
            .daily_series(&symbol, &window)
            .await
            .expect("series should succeed");

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date!(2026 - 08 - 20));
        assert_eq!(bars[1].date, date!(2026 - 08 - 19));
        assert_eq!(bars[0].close, 103.1);
        assert_eq!(bars[1].volume, 51_000);

        let urls = http.recorded_urls();
        assert!(urls[0].contains("function=TIME_SERIES_DAILY"));
        assert!(urls[0].contains("outputsize=full"));
    }

    #[tokio::test]
    async fn daily_series_missing_payload_key_is_fatal() {
        let body = r#"{"Note": "API call frequency exceeded"}"#;
        let (_, client) = client_with(vec![Ok(HttpResponse::ok_json(body))]);
        let symbol = Symbol::parse("AAPL").expect("valid symbol");
        let window =
            DateRange::new(date!(2026 - 08 - 01), date!(2026 - 08 - 31)).expect("valid range");

        let err = client
            .daily_series(&symbol, &window)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ApiError::MissingSeries { .. }));
    }

    #[tokio::test]
    async fn daily_series_rejects_non_numeric_fields() {
        let body = r#"{
            "Time Series (Daily)": {
                "2026-08-20": {
                    "1. open": "not-a-number", "2. high": "104.0", "3. low": "101.9",
                    "4. close": "103.1", "5. volume": "47000"
                }
            }
        }"#;
        let (_, client) = client_with(vec![Ok(HttpResponse::ok_json(body))]);
        let symbol = Symbol::parse("AAPL").expect("valid symbol");
        let window =
            DateRange::new(date!(2026 - 08 - 01), date!(2026 - 08 - 31)).expect("valid range");

        let err = client
            .daily_series(&symbol, &window)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[tokio::test]
    async fn rate_limit_then_success_matches_immediate_success() {
        let http = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::status_only(429)),
            Ok(HttpResponse::ok_json(overview_body())),
        ]));
        let client = AlphaVantageClient::new(Arc::clone(&http) as Arc<dyn HttpClient>, "demo-key")
            .with_retry(RetryPolicy::fixed(Duration::ZERO, 1));
        let symbol = Symbol::parse("AAPL").expect("valid symbol");

        let profile = client
            .company_overview(&symbol)
            .await
            .expect("retry should succeed");
        assert_eq!(profile.company_name, "Apple Inc.");
        assert_eq!(http.recorded_urls().len(), 2);
    }

    #[tokio::test]
    async fn sustained_rate_limit_exhausts_attempt_budget() {
        let responses = vec![
            Ok(HttpResponse::status_only(429)),
            Ok(HttpResponse::status_only(429)),
            Ok(HttpResponse::status_only(429)),
        ];
        let http = Arc::new(ScriptedHttpClient::new(responses));
        let client = AlphaVantageClient::new(Arc::clone(&http) as Arc<dyn HttpClient>, "demo-key")
            .with_retry(RetryPolicy::fixed(Duration::ZERO, 2));
        let symbol = Symbol::parse("AAPL").expect("valid symbol");

        let err = client
            .company_overview(&symbol)
            .await
            .expect_err("must fail");
        assert_eq!(err, ApiError::RateLimited { attempts: 3 });
        assert_eq!(http.recorded_urls().len(), 3);
    }

    #[tokio::test]
    async fn non_rate_limit_status_is_fatal_without_retry() {
        let (http, client) = client_with(vec![Ok(HttpResponse::status_only(500))]);
        let symbol = Symbol::parse("AAPL").expect("valid symbol");

        let err = client
            .company_overview(&symbol)
            .await
            .expect_err("must fail");
        assert_eq!(err, ApiError::Http { status: 500 });
        assert_eq!(http.recorded_urls().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_fatal() {
        let (_, client) = client_with(vec![Err(HttpError::new("connection refused"))]);
        let symbol = Symbol::parse("AAPL").expect("valid symbol");

        let err = client
            .company_overview(&symbol)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
