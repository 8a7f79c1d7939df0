//! Clients for the external data sources and the shared plumbing they use
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datatypes::date_time_helper::DateTimeError;
use crate::datatypes::{HistoricalPrice, MarketDataHandler, ParseEnumError};

pub mod doviz;
pub mod evds;
pub mod fred;
pub mod tcmb;
pub mod tefas;
pub mod tuik;
pub mod yahoo;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected server response {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("no data found for '{0}'")]
    NotFound(String),
    #[error("{0} is required but not configured")]
    MissingApiKey(&'static str),
    #[error("invalid date in response: {0}")]
    DateTime(#[from] DateTimeError),
    #[error("storing fetched data failed: {0}")]
    StoringFailed(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

impl ProviderError {
    /// Whether trying again later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Parse(_) => true,
            _ => false,
        }
    }
}

/// All external data sources
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Yahoo,
    Tcmb,
    Evds,
    Fred,
    Tefas,
    Tuik,
    Doviz,
}

impl FromStr for DataSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" | "yahoo-finance" => Ok(Self::Yahoo),
            "tcmb" => Ok(Self::Tcmb),
            "evds" | "tcmb-evds" => Ok(Self::Evds),
            "fred" => Ok(Self::Fred),
            "tefas" => Ok(Self::Tefas),
            "tuik" | "tüik" => Ok(Self::Tuik),
            "doviz" | "doviz.com" => Ok(Self::Doviz),
            _ => Err(ParseEnumError::new("data source", s)),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yahoo => write!(f, "yahoo-finance"),
            Self::Tcmb => write!(f, "TCMB"),
            Self::Evds => write!(f, "TCMB EVDS"),
            Self::Fred => write!(f, "FRED"),
            Self::Tefas => write!(f, "TEFAS"),
            Self::Tuik => write!(f, "TÜİK"),
            Self::Doviz => write!(f, "doviz.com"),
        }
    }
}

/// Build the HTTP client shared by all providers
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Fail with `UnexpectedStatus` unless the response is a success
pub(crate) fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ProviderError::UnexpectedStatus {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

/// Run `operation` up to `max_retries` times. After the i-th failed attempt
/// (counting from zero) wait `delay * (i + 1)`. Errors which are not transient are
/// returned immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    delay: Duration,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = max_retries.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= attempts || !err.is_transient() {
                    return Err(err);
                }
                warn!("attempt {}/{} failed: {}, retrying", attempt, attempts, err);
                tokio::time::sleep(delay * attempt).await;
            }
        }
    }
}

/// Parse numbers in Turkish notation (`1.234,56`). Characters other than digits,
/// `.`, `,` and `-` are dropped. If a comma is present, dots are thousands
/// separators and the comma is the decimal point.
pub fn parse_turkish_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    normalized.parse().ok()
}

/// Period of historic quotes to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    Max,
    Days(u32),
}

impl HistoryRange {
    /// Parse the period notation used by the API (`1d`, `1m`, `1y`, `90d`, ...).
    /// Unknown periods fall back to one year.
    pub fn parse(period: &str) -> HistoryRange {
        match period.trim() {
            "1d" => Self::OneDay,
            "5d" => Self::FiveDays,
            "1m" | "1mo" => Self::OneMonth,
            "3m" | "3mo" => Self::ThreeMonths,
            "6m" | "6mo" => Self::SixMonths,
            "1y" => Self::OneYear,
            "2y" => Self::TwoYears,
            "5y" => Self::FiveYears,
            "max" => Self::Max,
            other => other
                .strip_suffix('d')
                .and_then(|days| days.parse::<u32>().ok())
                .filter(|days| *days > 0)
                .map(Self::Days)
                .unwrap_or(Self::OneYear),
        }
    }

    /// Range parameter in Yahoo notation
    pub fn yahoo_range(&self) -> String {
        match self {
            Self::OneDay => "1d".to_string(),
            Self::FiveDays => "5d".to_string(),
            Self::OneMonth => "1mo".to_string(),
            Self::ThreeMonths => "3mo".to_string(),
            Self::SixMonths => "6mo".to_string(),
            Self::OneYear => "1y".to_string(),
            Self::TwoYears => "2y".to_string(),
            Self::FiveYears => "5y".to_string(),
            Self::Max => "max".to_string(),
            Self::Days(days) => format!("{}d", days),
        }
    }

    /// Intraday bars for very short ranges, daily bars otherwise
    pub fn interval(&self) -> &'static str {
        match self {
            Self::OneDay | Self::FiveDays => "1h",
            _ => "1d",
        }
    }
}

/// Latest quote of a symbol including the change against the previous close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub currency: String,
    pub day_high: f64,
    pub day_low: f64,
    pub timestamp: DateTime<Utc>,
}

impl QuoteSnapshot {
    /// Derive change figures from price and previous close
    pub fn change_from(price: f64, previous_close: f64) -> (f64, f64) {
        let change = price - previous_close;
        let change_percent = if previous_close > 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };
        (change, change_percent)
    }
}

/// A single OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

/// General interface for market data quotes provider
#[async_trait]
pub trait MarketQuoteProvider: Send + Sync {
    /// Fetch latest quote
    async fn fetch_latest_quote(&self, symbol: &str) -> Result<QuoteSnapshot, ProviderError>;
    /// Fetch bars covering the given range, oldest first
    async fn fetch_bars(&self, symbol: &str, range: HistoryRange) -> Result<Vec<Bar>, ProviderError>;

    /// Fetch closing prices as daily history rows
    async fn fetch_quote_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<HistoricalPrice>, ProviderError> {
        let bars = self.fetch_bars(symbol, range).await?;
        Ok(daily_closes(symbol, bars))
    }
}

/// Collapse bars (oldest first) into one row per date. Intraday bars of a date keep
/// the last close and add up their volumes.
pub fn daily_closes(symbol: &str, bars: Vec<Bar>) -> Vec<HistoricalPrice> {
    let mut rows: Vec<HistoricalPrice> = Vec::with_capacity(bars.len());
    for bar in bars {
        let volume = bar.volume.unwrap_or(0.0);
        match rows.last_mut() {
            Some(last) if last.data_date == bar.date => {
                last.price = bar.close;
                last.volume += volume;
            }
            _ => rows.push(HistoricalPrice {
                symbol: symbol.to_string(),
                data_date: bar.date,
                price: bar.close,
                volume,
            }),
        }
    }
    rows
}

/// Fetch history of a symbol and store it, returns the stored rows
pub async fn update_quote_history<D: MarketDataHandler + ?Sized>(
    provider: &dyn MarketQuoteProvider,
    symbol: &str,
    range: HistoryRange,
    db: &D,
) -> Result<Vec<HistoricalPrice>, ProviderError> {
    let prices = provider.fetch_quote_history(symbol, range).await?;
    db.upsert_historical_prices(&prices)
        .await
        .map_err(|e| ProviderError::StoringFailed(e.to_string()))?;
    Ok(prices)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory_handler::InMemoryDB;
    use chrono::Duration as ChronoDuration;
    use rand::Rng;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider returning a random walk for every symbol, or a fixed series if one was given
    pub struct DummyProvider {
        pub fixed: HashMap<String, Vec<f64>>,
        pub failing: Vec<String>,
    }

    impl DummyProvider {
        pub fn new() -> Self {
            DummyProvider {
                fixed: HashMap::new(),
                failing: Vec::new(),
            }
        }

        pub fn with_series(mut self, symbol: &str, closes: Vec<f64>) -> Self {
            self.fixed.insert(symbol.to_string(), closes);
            self
        }

        pub fn failing_for(mut self, symbol: &str) -> Self {
            self.failing.push(symbol.to_string());
            self
        }

        fn closes(&self, symbol: &str, count: usize) -> Vec<f64> {
            if let Some(closes) = self.fixed.get(symbol) {
                return closes.clone();
            }
            let mut rng = rand::rng();
            let mut price = 100.0;
            (0..count)
                .map(|_| {
                    let current = price;
                    price *= (0.02 * (rng.random::<f64>() - 0.5)).exp();
                    current
                })
                .collect()
        }
    }

    pub fn test_bars(closes: &[f64], last_date: NaiveDate) -> Vec<Bar> {
        let n = closes.len() as i64;
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let date = last_date - ChronoDuration::days(n - 1 - i as i64);
                Bar {
                    timestamp: date.and_hms_opt(16, 0, 0).unwrap().and_utc(),
                    date,
                    open: Some(*close),
                    high: Some(*close * 1.01),
                    low: Some(*close * 0.99),
                    close: *close,
                    volume: Some(1000.0 + i as f64),
                }
            })
            .collect()
    }

    /// Seven hourly bars per trading day, the last day being `last_date`
    pub fn hourly_bars(closes: &[f64], last_date: NaiveDate) -> Vec<Bar> {
        let days = (closes.len() / 7) as i64;
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let date = last_date - ChronoDuration::days(days - 1 - (i / 7) as i64);
                Bar {
                    timestamp: date.and_hms_opt(7 + (i % 7) as u32, 0, 0).unwrap().and_utc(),
                    date,
                    open: Some(*close),
                    high: Some(*close),
                    low: Some(*close),
                    close: *close,
                    volume: Some(100.0),
                }
            })
            .collect()
    }

    #[async_trait]
    impl MarketQuoteProvider for DummyProvider {
        async fn fetch_latest_quote(&self, symbol: &str) -> Result<QuoteSnapshot, ProviderError> {
            if self.failing.iter().any(|s| s == symbol) {
                return Err(ProviderError::NotFound(symbol.to_string()));
            }
            let closes = self.closes(symbol, 2);
            let price = closes[closes.len() - 1];
            let previous_close = if closes.len() > 1 {
                closes[closes.len() - 2]
            } else {
                price
            };
            let (change, change_percent) = QuoteSnapshot::change_from(price, previous_close);
            Ok(QuoteSnapshot {
                symbol: symbol.to_string(),
                price,
                previous_close,
                change,
                change_percent,
                volume: Some(1000.0),
                market_cap: None,
                currency: "USD".to_string(),
                day_high: price,
                day_low: price,
                timestamp: Utc::now(),
            })
        }

        async fn fetch_bars(&self, symbol: &str, range: HistoryRange) -> Result<Vec<Bar>, ProviderError> {
            if self.failing.iter().any(|s| s == symbol) {
                return Err(ProviderError::NotFound(symbol.to_string()));
            }
            let today = Utc::now().date_naive();
            let count = match range {
                HistoryRange::Days(days) => days as usize,
                HistoryRange::OneMonth => 22,
                HistoryRange::OneDay | HistoryRange::FiveDays => {
                    let days = if range == HistoryRange::OneDay { 1 } else { 5 };
                    return Ok(hourly_bars(&self.closes(symbol, days * 7), today));
                }
                _ => 250,
            };
            Ok(test_bars(&self.closes(symbol, count), today))
        }
    }

    #[tokio::test]
    async fn test_update_quote_history() {
        let db = InMemoryDB::new();
        let provider = DummyProvider::new();
        let prices = update_quote_history(&provider, "XU100.IS", HistoryRange::OneMonth, &db)
            .await
            .unwrap();
        assert_eq!(prices.len(), 22);
        let stored = db.get_historical_prices("XU100.IS", None, None).await.unwrap();
        assert_eq!(stored.len(), 22);
        assert_eq!(stored[0].price, 100.0);
    }

    #[test]
    fn test_daily_closes() {
        let closes: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        let last = NaiveDate::from_ymd_opt(2025, 10, 17).unwrap();
        let rows = daily_closes("XU100.IS", hourly_bars(&closes, last));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data_date, NaiveDate::from_ymd_opt(2025, 10, 16).unwrap());
        assert_eq!(rows[0].price, 106.0);
        assert_eq!(rows[1].price, 113.0);
        assert_fuzzy_eq!(rows[1].volume, 700.0, 1e-9);

        let daily = daily_closes("XU100.IS", test_bars(&[1.0, 2.0, 3.0], last));
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[2].volume, 1002.0);
    }

    #[test]
    fn test_history_range_parse() {
        assert_eq!(HistoryRange::parse("1m").yahoo_range(), "1mo");
        assert_eq!(HistoryRange::parse("5y").yahoo_range(), "5y");
        assert_eq!(HistoryRange::parse("90d"), HistoryRange::Days(90));
        assert_eq!(HistoryRange::parse("weird"), HistoryRange::OneYear);
        assert_eq!(HistoryRange::parse("0d"), HistoryRange::OneYear);
        assert_eq!(HistoryRange::parse("5d").interval(), "1h");
        assert_eq!(HistoryRange::parse("3m").interval(), "1d");
    }

    #[test]
    fn test_parse_turkish_number() {
        assert_eq!(parse_turkish_number("41,8799"), Some(41.8799));
        assert_eq!(parse_turkish_number("10.245,67 TL"), Some(10245.67));
        assert_eq!(parse_turkish_number("%-1,25"), Some(-1.25));
        assert_eq!(parse_turkish_number("4212.5"), Some(4212.5));
        assert_eq!(parse_turkish_number("n/a"), None);
    }

    #[test]
    fn test_change_from() {
        let (change, pct) = QuoteSnapshot::change_from(110.0, 100.0);
        assert_fuzzy_eq!(change, 10.0, 1e-12);
        assert_fuzzy_eq!(pct, 10.0, 1e-12);
        let (_, pct) = QuoteSnapshot::change_from(110.0, 0.0);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn test_data_source_names() {
        assert_eq!(DataSource::from_str("TCMB").unwrap(), DataSource::Tcmb);
        assert_eq!(DataSource::Yahoo.to_string(), "yahoo-finance");
        assert_eq!(DataSource::from_str("evds").unwrap().to_string(), "TCMB EVDS");
        assert!(DataSource::from_str("bloomberg").is_err());
    }

    #[tokio::test]
    async fn test_retry_with_backoff() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, Duration::from_millis(1), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::Parse("short body".to_string()))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(3, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::MissingApiKey("FRED_API_KEY"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
