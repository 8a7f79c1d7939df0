//! Detection of unusual price, volume and volatility behaviour
use chrono::NaiveDate;
use serde::Serialize;

use super::stats::{mean, population_std_dev, rms_volatility, simple_returns};
use super::{require, AnalysisError};
use crate::providers::Bar;

pub const MIN_CLOSES: usize = 20;
pub const DEFAULT_SENSITIVITY: f64 = 2.5;
/// Daily moves larger than this (in percent) count as gaps
const GAP_PERCENT: f64 = 5.0;
/// Number of most recent returns used for the recent volatility
const RECENT_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    PriceAnomaly,
    VolumeAnomaly,
    VolatilitySpike,
    PriceGap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyLevel {
    Normal,
    Low,
    Medium,
    High,
}

impl AnomalyLevel {
    pub fn from_score(score: f64) -> AnomalyLevel {
        if score > 50.0 {
            Self::High
        } else if score > 25.0 {
            Self::Medium
        } else if score > 10.0 {
            Self::Low
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceGap {
    pub date: NaiveDate,
    pub gap_percent: f64,
    pub direction: GapDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<PriceGap>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub symbol: String,
    pub anomaly_score: f64,
    pub anomaly_level: AnomalyLevel,
    pub price_z_score: f64,
    pub volume_z_score: f64,
    pub volatility_ratio: f64,
    pub recent_volatility: f64,
    pub historical_volatility: f64,
    pub current_price: f64,
    pub anomalies: Vec<Anomaly>,
    pub gaps_found: usize,
    pub recommendations: Vec<String>,
}

fn z_score(value: f64, values: &[f64]) -> f64 {
    let std_dev = population_std_dev(values);
    if std_dev > 0.0 {
        (value - mean(values)) / std_dev
    } else {
        0.0
    }
}

fn severity(high: bool, otherwise: Severity) -> Severity {
    if high {
        Severity::High
    } else {
        otherwise
    }
}

pub fn detect_anomalies(
    symbol: &str,
    bars: &[Bar],
    sensitivity: f64,
) -> Result<AnomalyReport, AnalysisError> {
    require(bars.len(), MIN_CLOSES)?;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().filter_map(|b| b.volume).collect();
    let returns = simple_returns(&closes);

    let price_z = returns
        .last()
        .map(|last| z_score(*last, &returns))
        .unwrap_or_default();
    let volume_z = volumes
        .last()
        .map(|last| z_score(*last, &volumes))
        .unwrap_or_default();

    let recent_volatility = rms_volatility(&returns[returns.len().saturating_sub(RECENT_WINDOW)..]);
    let historical_volatility = rms_volatility(&returns);
    let volatility_ratio = if historical_volatility > 0.0 {
        recent_volatility / historical_volatility
    } else {
        1.0
    };

    let gaps: Vec<PriceGap> = bars
        .windows(2)
        .filter(|w| w[0].close != 0.0)
        .filter_map(|w| {
            let gap_percent = ((w[1].close - w[0].close) / w[0].close).abs() * 100.0;
            if gap_percent > GAP_PERCENT {
                Some(PriceGap {
                    date: w[1].date,
                    gap_percent,
                    direction: if w[1].close > w[0].close {
                        GapDirection::Up
                    } else {
                        GapDirection::Down
                    },
                })
            } else {
                None
            }
        })
        .collect();

    let mut anomalies = Vec::new();
    let mut score = 0.0;
    if price_z.abs() > sensitivity {
        anomalies.push(Anomaly {
            anomaly_type: AnomalyType::PriceAnomaly,
            severity: severity(price_z.abs() > 3.0, Severity::Medium),
            description: format!("Unusual price move (z-score {:.2})", price_z),
            gaps: Vec::new(),
        });
        score += price_z.abs() * 10.0;
    }
    if volume_z.abs() > sensitivity {
        anomalies.push(Anomaly {
            anomaly_type: AnomalyType::VolumeAnomaly,
            severity: severity(volume_z.abs() > 3.0, Severity::Medium),
            description: format!("Unusual volume (z-score {:.2})", volume_z),
            gaps: Vec::new(),
        });
        score += volume_z.abs() * 8.0;
    }
    if volatility_ratio > 1.5 {
        anomalies.push(Anomaly {
            anomaly_type: AnomalyType::VolatilitySpike,
            severity: severity(volatility_ratio > 2.0, Severity::Medium),
            description: format!(
                "Volatility up {:.1}% ({:.2}% vs. {:.2}%)",
                volatility_ratio * 100.0 - 100.0,
                recent_volatility,
                historical_volatility
            ),
            gaps: Vec::new(),
        });
        score += (volatility_ratio - 1.0) * 20.0;
    }
    let recent_gaps = gaps[gaps.len().saturating_sub(3)..].to_vec();
    if !recent_gaps.is_empty() {
        anomalies.push(Anomaly {
            anomaly_type: AnomalyType::PriceGap,
            severity: severity(
                recent_gaps.iter().any(|g| g.gap_percent > 10.0),
                Severity::Low,
            ),
            description: format!("{} large daily price jumps", recent_gaps.len()),
            gaps: recent_gaps.clone(),
        });
        score += recent_gaps.len() as f64 * 5.0;
    }
    let score = f64::min(score, 100.0);

    let mut recommendations = Vec::new();
    if price_z.abs() > 3.0 {
        recommendations.push("Very unusual price move, review your position.".to_string());
    }
    if volume_z.abs() > 3.0 {
        recommendations.push("Abnormal volume, there may be important news.".to_string());
    }
    if volatility_ratio > 2.0 {
        recommendations.push("Volatility spike, update your risk management.".to_string());
    }
    if anomalies.is_empty() {
        recommendations.push("Normal market behaviour, no anomalies detected.".to_string());
    }

    Ok(AnomalyReport {
        symbol: symbol.to_string(),
        anomaly_score: score,
        anomaly_level: AnomalyLevel::from_score(score),
        price_z_score: price_z,
        volume_z_score: volume_z,
        volatility_ratio,
        recent_volatility,
        historical_volatility,
        current_price: closes[closes.len() - 1],
        gaps_found: gaps.len(),
        anomalies,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::test_bars;

    fn last_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
    }

    #[test]
    fn test_requires_20_bars() {
        let bars = test_bars(&[100.0; 19], last_date());
        assert!(detect_anomalies("X", &bars, DEFAULT_SENSITIVITY).is_err());
    }

    #[test]
    fn test_calm_market() {
        let closes: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let mut bars = test_bars(&closes, last_date());
        for bar in bars.iter_mut() {
            bar.volume = Some(1000.0);
        }
        let report = detect_anomalies("CALM", &bars, DEFAULT_SENSITIVITY).unwrap();
        assert!(report.anomalies.is_empty());
        assert_eq!(report.volume_z_score, 0.0);
        assert_eq!(report.anomaly_level, AnomalyLevel::Normal);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_crash_on_high_volume() {
        let mut closes = vec![100.0; 29];
        closes.push(80.0);
        let mut bars = test_bars(&closes, last_date());
        for bar in bars.iter_mut() {
            bar.volume = Some(1000.0);
        }
        bars[29].volume = Some(10_000.0);
        let report = detect_anomalies("CRASH", &bars, DEFAULT_SENSITIVITY).unwrap();
        let types: Vec<AnomalyType> = report.anomalies.iter().map(|a| a.anomaly_type).collect();
        assert_eq!(
            types,
            vec![
                AnomalyType::PriceAnomaly,
                AnomalyType::VolumeAnomaly,
                AnomalyType::VolatilitySpike,
                AnomalyType::PriceGap
            ]
        );
        assert!(report.price_z_score < -3.0);
        assert_eq!(report.gaps_found, 1);
        let gap = &report.anomalies[3];
        assert_eq!(gap.severity, Severity::High);
        assert_eq!(gap.gaps[0].direction, GapDirection::Down);
        assert_eq!(gap.gaps[0].date, last_date());
        assert_eq!(report.anomaly_score, 100.0);
        assert_eq!(report.anomaly_level, AnomalyLevel::High);
    }
}
