//! Risk assessment of a single asset based on its closing prices
use serde::Serialize;

use super::stats::{
    annualized_volatility, historical_var, max_drawdown_percent, mean, population_std_dev,
    simple_returns, TRADING_DAYS,
};
use super::{require, AnalysisError};

pub const MIN_CLOSES: usize = 30;
/// Annual risk free rate used for the Sharpe ratio
pub const RISK_FREE_RATE: f64 = 0.05;
/// Assumed annual volatility of the market in percent
const MARKET_VOLATILITY: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskCategory {
    pub fn from_score(score: f64) -> RiskCategory {
        if score >= 70.0 {
            Self::VeryHigh
        } else if score >= 55.0 {
            Self::High
        } else if score >= 35.0 {
            Self::Medium
        } else if score >= 20.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLow => "Very low risk",
            Self::Low => "Low risk",
            Self::Medium => "Medium risk",
            Self::High => "High risk",
            Self::VeryHigh => "Very high risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub symbol: String,
    pub risk_score: f64,
    pub risk_category: RiskCategory,
    pub risk_label: String,
    pub volatility_percent: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_percent: f64,
    /// One day value at risk (95%) of one unit at the last price
    pub value_at_risk: f64,
    pub beta: f64,
    pub annualized_return_percent: f64,
    pub data_points: usize,
    pub recommendations: Vec<String>,
}

fn risk_score(volatility: f64, sharpe: f64, drawdown: f64) -> f64 {
    let mut score: f64 = 50.0;
    if volatility > 50.0 {
        score += 20.0;
    } else if volatility > 30.0 {
        score += 10.0;
    } else if volatility < 15.0 {
        score -= 10.0;
    }

    if sharpe < 0.0 {
        score += 15.0;
    } else if sharpe < 1.0 {
        score += 5.0;
    } else if sharpe > 2.0 {
        score -= 10.0;
    }

    if drawdown > 30.0 {
        score += 15.0;
    } else if drawdown > 20.0 {
        score += 10.0;
    } else if drawdown < 10.0 {
        score -= 5.0;
    }
    score.clamp(0.0, 100.0)
}

pub fn assess_risk(symbol: &str, closes: &[f64]) -> Result<RiskReport, AnalysisError> {
    require(closes.len(), MIN_CLOSES)?;
    let returns = simple_returns(closes);
    let avg_return = mean(&returns);
    let volatility = annualized_volatility(population_std_dev(&returns));
    let annualized_return = avg_return * TRADING_DAYS;
    let sharpe_ratio = if volatility > 0.0 {
        (annualized_return - RISK_FREE_RATE) / (volatility / 100.0)
    } else {
        0.0
    };
    let max_drawdown = max_drawdown_percent(closes);
    let last_price = closes[closes.len() - 1];
    let value_at_risk = historical_var(&returns, 0.05) * last_price;
    let beta = volatility / MARKET_VOLATILITY;

    let risk_score = risk_score(volatility, sharpe_ratio, max_drawdown);
    let risk_category = RiskCategory::from_score(risk_score);

    let mut recommendations = Vec::new();
    if volatility > 40.0 {
        recommendations.push("High volatility detected, consider reducing the position size.".to_string());
    }
    if sharpe_ratio < 0.0 {
        recommendations.push("Negative Sharpe ratio, returns are below the risk free rate.".to_string());
    }
    if max_drawdown > 25.0 {
        recommendations.push("Large drawdowns in the past, review stop-loss levels.".to_string());
    }
    if risk_score > 60.0 {
        recommendations.push("Overall risk is high, diversifying the portfolio is recommended.".to_string());
    }
    if beta > 1.5 {
        recommendations.push("Volatile compared to the market, be careful.".to_string());
    }

    Ok(RiskReport {
        symbol: symbol.to_string(),
        risk_score,
        risk_category,
        risk_label: risk_category.label().to_string(),
        volatility_percent: volatility,
        sharpe_ratio,
        max_drawdown_percent: max_drawdown,
        value_at_risk,
        beta,
        annualized_return_percent: annualized_return * 100.0,
        data_points: closes.len(),
        recommendations,
    })
}
