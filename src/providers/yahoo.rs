//! Quotes from the Yahoo Finance chart endpoint
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde::Deserialize;

use super::{check_status, Bar, HistoryRange, MarketQuoteProvider, ProviderError, QuoteSnapshot};
use crate::config::DEFAULT_YAHOO_URL;
use crate::datatypes::date_time_helper::unix_to_date_time;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_volume: Option<f64>,
    market_cap: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn at(values: &[Option<f64>], idx: usize) -> Option<f64> {
    values.get(idx).copied().flatten()
}

pub struct Yahoo {
    client: reqwest::Client,
    base_url: String,
}

impl Yahoo {
    pub fn new(client: reqwest::Client) -> Yahoo {
        Yahoo::with_base_url(client, DEFAULT_YAHOO_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Yahoo {
        Yahoo {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        range: Option<HistoryRange>,
    ) -> Result<ChartResult, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let mut request = self.client.get(&url);
        if let Some(range) = range {
            request = request.query(&[
                ("range", range.yahoo_range().as_str()),
                ("interval", range.interval()),
            ]);
        }
        debug!("fetching yahoo chart for {}", symbol);
        let resp = request.send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }
        let body: ChartResponse = check_status(resp)?.json().await?;
        if let Some(err) = body.chart.error {
            return Err(ProviderError::Parse(format!("{}: {}", err.code, err.description)));
        }
        body.chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }
}

#[async_trait]
impl MarketQuoteProvider for Yahoo {
    async fn fetch_latest_quote(&self, symbol: &str) -> Result<QuoteSnapshot, ProviderError> {
        let chart = self.fetch_chart(symbol, None).await?;
        let meta = chart.meta;
        let price = meta
            .regular_market_price
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;
        let previous_close = meta
            .previous_close
            .or(meta.chart_previous_close)
            .unwrap_or(price);
        let (change, change_percent) = QuoteSnapshot::change_from(price, previous_close);
        let timestamp = match meta.regular_market_time {
            Some(time) => unix_to_date_time(time)?,
            None => Utc::now(),
        };
        Ok(QuoteSnapshot {
            symbol: symbol.to_string(),
            price,
            previous_close,
            change,
            change_percent,
            volume: meta.regular_market_volume,
            market_cap: meta.market_cap,
            currency: meta.currency.unwrap_or_else(|| "USD".to_string()),
            day_high: meta.regular_market_day_high.unwrap_or(price),
            day_low: meta.regular_market_day_low.unwrap_or(price),
            timestamp,
        })
    }

    async fn fetch_bars(&self, symbol: &str, range: HistoryRange) -> Result<Vec<Bar>, ProviderError> {
        let chart = self.fetch_chart(symbol, Some(range)).await?;
        let quote = chart.indicators.quote.into_iter().next().unwrap_or_default();
        let mut bars = Vec::with_capacity(chart.timestamp.len());
        for (idx, ts) in chart.timestamp.iter().enumerate() {
            // null closes mark missing trading data
            let close = match at(&quote.close, idx) {
                Some(close) if close > 0.0 => close,
                _ => continue,
            };
            let timestamp = unix_to_date_time(*ts)?;
            bars.push(Bar {
                timestamp,
                date: timestamp.date_naive(),
                open: at(&quote.open, idx),
                high: at(&quote.high, idx),
                low: at(&quote.low, idx),
                close,
                volume: at(&quote.volume, idx),
            });
        }
        Ok(bars)
    }
}
