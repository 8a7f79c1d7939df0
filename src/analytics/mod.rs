//! Statistical analysis of price series and portfolios
use thiserror::Error;

pub mod anomaly;
pub mod correlation;
pub mod portfolio;
pub mod prediction;
pub mod risk;
pub mod sentiment;
pub mod service;
pub mod stats;

pub use anomaly::{detect_anomalies, AnomalyReport};
pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use portfolio::{analyze_portfolio, summarize, PortfolioAnalysis, PortfolioSummary};
pub use prediction::{predict, Prediction};
pub use risk::{assess_risk, RiskReport};
pub use sentiment::{analyze_sentiment, SentimentReport};
pub use service::AnalysisService;

#[derive(Error, Debug, PartialEq)]
pub enum AnalysisError {
    #[error("insufficient data: {needed} data points required, {available} available")]
    InsufficientData { needed: usize, available: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Fail with `InsufficientData` unless at least `needed` values are given
pub(crate) fn require(available: usize, needed: usize) -> Result<(), AnalysisError> {
    if available < needed {
        Err(AnalysisError::InsufficientData { needed, available })
    } else {
        Ok(())
    }
}
