//! Runs the analyses on fetched or stored market data and keeps their results
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use super::{
    analyze_sentiment, assess_risk, correlation_matrix, detect_anomalies, predict, AnalysisError,
    AnomalyReport, CorrelationMatrix, Prediction, RiskReport, SentimentReport,
};
use crate::datatypes::date_time_helper::today_in_istanbul;
use crate::datatypes::{AnalysisKind, AnalysisRecord, DataError, DataHandler};
use crate::providers::{update_quote_history, Bar, HistoryRange, MarketQuoteProvider, ProviderError};

pub const DEFAULT_CORRELATION_SYMBOLS: [&str; 6] =
    ["XU100.IS", "USDTRY=X", "GC=F", "^GSPC", "BTC-USD", "CL=F"];
pub const DEFAULT_CORRELATION_DAYS: u32 = 90;
/// Stored history is used if it has more points than this within the window
const MIN_STORED_POINTS: usize = 20;

#[derive(Error, Debug)]
pub enum AnalysisServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("storing analysis failed: {0}")]
    Data(#[from] DataError),
    #[error("serializing analysis failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct AnalysisService {
    db: Arc<dyn DataHandler>,
    provider: Arc<dyn MarketQuoteProvider>,
}

/// Textual representation of a serialized enum like `VERY_HIGH`
fn label_of<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
}

impl AnalysisService {
    pub fn new(db: Arc<dyn DataHandler>, provider: Arc<dyn MarketQuoteProvider>) -> Self {
        AnalysisService { db, provider }
    }

    async fn store<T: Serialize>(
        &self,
        kind: AnalysisKind,
        symbol: &str,
        score: Option<f64>,
        label: Option<String>,
        result: &T,
    ) -> Result<(), AnalysisServiceError> {
        let record = AnalysisRecord {
            id: None,
            kind,
            symbol: symbol.to_string(),
            score,
            label,
            payload: serde_json::to_value(result)?,
            created_at: Utc::now(),
        };
        let id = self.db.insert_analysis(&record).await?;
        info!("stored {} analysis #{} for {}", kind, id, symbol);
        Ok(())
    }

    async fn bars(&self, symbol: &str, range: HistoryRange) -> Result<Vec<Bar>, AnalysisServiceError> {
        Ok(self.provider.fetch_bars(symbol, range).await?)
    }

    /// Price series of a symbol within the window starting at `start`
    async fn price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, AnalysisServiceError> {
        let stored = self.db.get_historical_prices(symbol, Some(start), None).await?;
        let prices = if stored.len() > MIN_STORED_POINTS {
            stored
        } else {
            update_quote_history(self.provider.as_ref(), symbol, HistoryRange::OneYear, self.db.as_ref())
                .await?
                .into_iter()
                .filter(|p| p.data_date >= start)
                .collect()
        };
        Ok(prices.into_iter().map(|p| (p.data_date, p.price)).collect())
    }

    /// Correlation matrix of the symbols (or a default selection) over the last `period_days` days.
    /// Symbols whose prices can't be loaded end up with an empty series.
    pub async fn correlations(
        &self,
        symbols: Option<Vec<String>>,
        period_days: Option<u32>,
    ) -> Result<CorrelationMatrix, AnalysisServiceError> {
        let symbols = symbols
            .filter(|symbols| !symbols.is_empty())
            .unwrap_or_else(|| DEFAULT_CORRELATION_SYMBOLS.iter().map(|s| s.to_string()).collect());
        let period_days = period_days.unwrap_or(DEFAULT_CORRELATION_DAYS);
        let start = today_in_istanbul() - Duration::days(period_days as i64);

        let series = join_all(symbols.iter().map(|symbol| async move {
            let points = match self.price_series(symbol, start).await {
                Ok(points) => points,
                Err(err) => {
                    warn!("no prices for {}: {}", symbol, err);
                    Vec::new()
                }
            };
            (symbol.clone(), points)
        }))
        .await;

        let matrix = correlation_matrix(&series)?;
        self.store(AnalysisKind::Correlation, &symbols.join(","), None, None, &matrix)
            .await?;
        Ok(matrix)
    }

    pub async fn risk(&self, symbol: &str) -> Result<RiskReport, AnalysisServiceError> {
        let bars = self.bars(symbol, HistoryRange::OneYear).await?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let report = assess_risk(symbol, &closes)?;
        self.store(
            AnalysisKind::Risk,
            symbol,
            Some(report.risk_score),
            label_of(&report.risk_category),
            &report,
        )
        .await?;
        Ok(report)
    }

    pub async fn sentiment(&self, symbol: &str) -> Result<SentimentReport, AnalysisServiceError> {
        let bars = self.bars(symbol, HistoryRange::Days(30)).await?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().filter_map(|b| b.volume).collect();
        let report = analyze_sentiment(symbol, &closes, &volumes)?;
        self.store(
            AnalysisKind::Sentiment,
            symbol,
            Some(report.sentiment_score),
            label_of(&report.sentiment_category),
            &report,
        )
        .await?;
        Ok(report)
    }

    pub async fn anomalies(
        &self,
        symbol: &str,
        sensitivity: f64,
    ) -> Result<AnomalyReport, AnalysisServiceError> {
        let bars = self.bars(symbol, HistoryRange::Days(90)).await?;
        let report = detect_anomalies(symbol, &bars, sensitivity)?;
        self.store(
            AnalysisKind::Anomaly,
            symbol,
            Some(report.anomaly_score),
            label_of(&report.anomaly_level),
            &report,
        )
        .await?;
        Ok(report)
    }

    pub async fn prediction(&self, symbol: &str, days: u32) -> Result<Prediction, AnalysisServiceError> {
        let bars = self.bars(symbol, HistoryRange::Days(90)).await?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let last_date = bars.last().map(|b| b.date).unwrap_or_else(today_in_istanbul);
        let prediction = predict(symbol, &closes, days, last_date)?;
        let predicted = prediction.predictions.last().map(|p| p.predicted_price);
        self.store(
            AnalysisKind::Prediction,
            symbol,
            predicted,
            label_of(&prediction.trend_direction),
            &prediction,
        )
        .await?;
        Ok(prediction)
    }
}
