//! Market sentiment derived from price momentum, RSI, volume and volatility
use serde::Serialize;

use super::stats::{mean, moving_average, rms_volatility, rsi, simple_returns};
use super::{require, AnalysisError};

pub const MIN_CLOSES: usize = 2;
pub const RSI_PERIOD: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentCategory {
    VeryBearish,
    Bearish,
    Neutral,
    Bullish,
    VeryBullish,
}

impl SentimentCategory {
    pub fn from_score(score: f64) -> SentimentCategory {
        if score >= 70.0 {
            Self::VeryBullish
        } else if score >= 60.0 {
            Self::Bullish
        } else if score >= 40.0 {
            Self::Neutral
        } else if score >= 30.0 {
            Self::Bearish
        } else {
            Self::VeryBearish
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryBearish => "Strong sell",
            Self::Bearish => "Sell",
            Self::Neutral => "Neutral",
            Self::Bullish => "Buy",
            Self::VeryBullish => "Strong buy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub symbol: String,
    pub sentiment_score: f64,
    pub sentiment_category: SentimentCategory,
    pub sentiment_label: String,
    pub fear_greed_index: i64,
    pub confidence: f64,
    pub rsi_value: f64,
    pub volatility_percent: f64,
    pub volume_ratio: f64,
    pub price_change_percent: f64,
    pub data_points: usize,
}

/// Mean of the last five volumes relative to the mean of all volumes.
/// Without any volume information the ratio is neutral (1).
fn volume_ratio(volumes: &[f64]) -> f64 {
    let avg_volume = mean(volumes);
    if avg_volume <= 0.0 {
        1.0
    } else {
        moving_average(volumes, 5) / avg_volume
    }
}

pub fn analyze_sentiment(
    symbol: &str,
    closes: &[f64],
    volumes: &[f64],
) -> Result<SentimentReport, AnalysisError> {
    require(closes.len(), MIN_CLOSES)?;
    let last = closes[closes.len() - 1];
    let previous = closes[closes.len() - 2];
    let price_change = if previous != 0.0 {
        (last - previous) / previous * 100.0
    } else {
        0.0
    };
    let volume_ratio = volume_ratio(volumes);
    let returns = simple_returns(closes);
    let volatility = rms_volatility(&returns);
    let rsi = rsi(&returns, RSI_PERIOD);

    let mut score: f64 = 50.0;
    if price_change > 5.0 {
        score += 20.0;
    } else if price_change > 2.0 {
        score += 10.0;
    } else if price_change < -5.0 {
        score -= 20.0;
    } else if price_change < -2.0 {
        score -= 10.0;
    }

    // overbought / oversold
    if rsi > 70.0 {
        score -= 10.0;
    } else if rsi < 30.0 {
        score += 10.0;
    }

    if volume_ratio > 1.5 {
        score += 10.0;
    } else if volume_ratio < 0.5 {
        score -= 5.0;
    }

    if volatility > 50.0 {
        score -= 10.0;
    } else if volatility < 20.0 {
        score += 5.0;
    }
    let score = score.clamp(0.0, 100.0);
    let category = SentimentCategory::from_score(score);

    Ok(SentimentReport {
        symbol: symbol.to_string(),
        sentiment_score: score,
        sentiment_category: category,
        sentiment_label: category.label().to_string(),
        fear_greed_index: score.round() as i64,
        confidence: (score - 50.0).abs() * 2.0,
        rsi_value: rsi,
        volatility_percent: volatility,
        volume_ratio,
        price_change_percent: price_change,
        data_points: closes.len(),
    })
}
