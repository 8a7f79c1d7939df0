//! Summary and diversification figures of a user's holdings
use std::collections::BTreeMap;

use serde::Serialize;

use super::stats::{mean, population_std_dev, round_to};
use crate::datatypes::Holding;

/// Annual risk free return in percent used for the portfolio Sharpe ratio
const RISK_FREE_PERCENT: f64 = 2.0;
const TOP_HOLDINGS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub holdings_count: usize,
    pub top_holdings: Vec<Holding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRiskMetrics {
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diversification {
    pub score: f64,
    pub concentration_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAnalysis {
    pub total_value: f64,
    /// Share of the total value per asset type in percent
    pub asset_type_distribution: BTreeMap<String, f64>,
    pub risk_metrics: PortfolioRiskMetrics,
    pub diversification: Diversification,
    pub recommendations: Vec<String>,
}

/// Asset type of a holding derived from its symbol
pub fn classify_symbol(symbol: &str) -> &'static str {
    let symbol = symbol.to_uppercase();
    if symbol.contains("BTC") || symbol.contains("ETH") {
        "crypto"
    } else if symbol.contains("USD") || symbol.contains("EUR") {
        "currency"
    } else if ["XAU", "XAG", "GC=F", "SI=F"]
        .iter()
        .any(|metal| symbol.contains(metal))
    {
        "metal"
    } else if symbol.ends_with(".IS") {
        "bist"
    } else {
        "fund"
    }
}

/// Total value at cost and the largest positions
pub fn summarize(holdings: &[Holding]) -> PortfolioSummary {
    let mut top_holdings = holdings.to_vec();
    top_holdings.sort_by(|a, b| b.cost().total_cmp(&a.cost()));
    top_holdings.truncate(TOP_HOLDINGS);
    PortfolioSummary {
        total_value: holdings.iter().map(Holding::cost).sum(),
        holdings_count: holdings.len(),
        top_holdings,
    }
}

/// Distribution, risk and diversification of the holdings, `None` if there are none
pub fn analyze_portfolio(holdings: &[Holding]) -> Option<PortfolioAnalysis> {
    if holdings.is_empty() {
        return None;
    }
    let mut values_by_type: BTreeMap<String, f64> = BTreeMap::new();
    let mut total_value = 0.0;
    for holding in holdings {
        let value = holding.value();
        total_value += value;
        *values_by_type
            .entry(classify_symbol(&holding.symbol).to_string())
            .or_default() += value;
    }

    let asset_type_distribution: BTreeMap<String, f64> = values_by_type
        .into_iter()
        .map(|(asset_type, value)| {
            let share = if total_value > 0.0 {
                value / total_value * 100.0
            } else {
                0.0
            };
            (asset_type, share)
        })
        .collect();

    let gains: Vec<f64> = holdings
        .iter()
        .map(|h| h.gain_loss_percent.unwrap_or_default())
        .collect();
    let volatility = population_std_dev(&gains);
    let sharpe_ratio = if volatility != 0.0 {
        (mean(&gains) - RISK_FREE_PERCENT) / volatility
    } else {
        0.0
    };
    let max_drawdown = gains.iter().copied().fold(f64::INFINITY, f64::min);

    let concentration: f64 = asset_type_distribution
        .values()
        .map(|pct| (pct / 100.0) * (pct / 100.0))
        .sum();
    let diversification_score = (1.0 - concentration) * 100.0;

    let mut recommendations = Vec::new();
    if diversification_score < 50.0 {
        recommendations.push(
            "The portfolio is not diversified enough, add other asset types.".to_string(),
        );
    }
    for (asset_type, share) in &asset_type_distribution {
        if *share > 50.0 {
            recommendations.push(format!(
                "{} makes up {:.1}% of the portfolio, consider reducing it.",
                asset_type, share
            ));
        }
    }

    Some(PortfolioAnalysis {
        total_value,
        asset_type_distribution,
        risk_metrics: PortfolioRiskMetrics {
            volatility: round_to(volatility, 2),
            sharpe_ratio: round_to(sharpe_ratio, 2),
            max_drawdown: round_to(max_drawdown, 2),
        },
        diversification: Diversification {
            score: round_to(diversification_score, 2),
            concentration_score: round_to(concentration, 2),
        },
        recommendations,
    })
}
