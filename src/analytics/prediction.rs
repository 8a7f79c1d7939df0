//! Short term price projection from a linear trend blended with the 10 day average
use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::stats::{linear_regression, moving_average, rms_volatility, simple_returns};
use super::{require, AnalysisError};

pub const MIN_CLOSES: usize = 10;
pub const DEFAULT_DAYS: u32 = 10;
/// Weight of the 10 day moving average in the predicted price
const MA_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    Sideways,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedDay {
    pub day: u32,
    pub date: NaiveDate,
    pub predicted_price: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverages {
    pub ma10: f64,
    pub ma20: f64,
    pub ma50: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub symbol: String,
    pub current_price: f64,
    pub prediction_days: u32,
    pub predictions: Vec<PredictedDay>,
    pub trend_direction: TrendDirection,
    pub trend_strength: f64,
    pub moving_averages: MovingAverages,
    pub volatility_percent: f64,
    pub slope: f64,
    pub intercept: f64,
    pub data_points: usize,
}

/// Project `days` days beyond `last_date`, the date of the last close
pub fn predict(
    symbol: &str,
    closes: &[f64],
    days: u32,
    last_date: NaiveDate,
) -> Result<Prediction, AnalysisError> {
    require(closes.len(), MIN_CLOSES)?;
    if days == 0 {
        return Err(AnalysisError::InvalidInput("at least one day must be predicted".to_string()));
    }
    let n = closes.len();
    let current_price = closes[n - 1];
    let (slope, intercept) = linear_regression(closes);
    let moving_averages = MovingAverages {
        ma10: moving_average(closes, 10),
        ma20: moving_average(closes, 20),
        ma50: moving_average(closes, 50),
    };
    let volatility = rms_volatility(&simple_returns(closes));
    let confidence = f64::max(0.0, 100.0 - 2.0 * volatility);

    let predictions = (1..=days)
        .map(|day| {
            let trend = slope * (n - 1 + day as usize) as f64 + intercept;
            let predicted = trend * (1.0 - MA_WEIGHT) + moving_averages.ma10 * MA_WEIGHT;
            PredictedDay {
                day,
                date: last_date + Duration::days(day as i64),
                predicted_price: predicted.max(0.0),
                upper_bound: (trend * (1.0 + volatility / 200.0)).max(0.0),
                lower_bound: (trend * (1.0 - volatility / 200.0)).max(0.0),
                confidence,
            }
        })
        .collect();

    let trend_direction = if slope > 0.0 {
        TrendDirection::Uptrend
    } else if slope < 0.0 {
        TrendDirection::Downtrend
    } else {
        TrendDirection::Sideways
    };
    let trend_strength = if current_price != 0.0 {
        slope.abs() / current_price * 100.0 * days as f64
    } else {
        0.0
    };

    Ok(Prediction {
        symbol: symbol.to_string(),
        current_price,
        prediction_days: days,
        predictions,
        trend_direction,
        trend_strength,
        moving_averages,
        volatility_percent: volatility,
        slope,
        intercept,
        data_points: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
    }

    #[test]
    fn test_requires_10_closes() {
        assert!(predict("X", &[1.0; 9], 5, today()).is_err());
        assert!(predict("X", &[1.0; 10], 0, today()).is_err());
    }

    #[test]
    fn test_linear_uptrend() {
        // 100, 101, ..., 119
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let prediction = predict("UP", &closes, 3, today()).unwrap();
        assert_eq!(prediction.trend_direction, TrendDirection::Uptrend);
        assert_fuzzy_eq!(prediction.slope, 1.0, 1e-9);
        assert_fuzzy_eq!(prediction.intercept, 100.0, 1e-9);
        assert_fuzzy_eq!(prediction.moving_averages.ma10, 114.5, 1e-9);
        assert_fuzzy_eq!(prediction.moving_averages.ma50, 109.5, 1e-9);
        assert_eq!(prediction.predictions.len(), 3);

        let first = &prediction.predictions[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 10, 18).unwrap());
        // trend 120, blended with ma10
        assert_fuzzy_eq!(first.predicted_price, 0.7 * 120.0 + 0.3 * 114.5, 1e-9);
        assert!(first.lower_bound < 120.0 && first.upper_bound > 120.0);
        assert_fuzzy_eq!(prediction.trend_strength, 1.0 / 119.0 * 100.0 * 3.0, 1e-9);
    }

    #[test]
    fn test_flat_prices() {
        let prediction = predict("FLAT", &[50.0; 12], DEFAULT_DAYS, today()).unwrap();
        assert_eq!(prediction.trend_direction, TrendDirection::Sideways);
        assert_eq!(prediction.predictions.len(), 10);
        for day in &prediction.predictions {
            assert_fuzzy_eq!(day.predicted_price, 50.0, 1e-9);
            assert_eq!(day.confidence, 100.0);
        }
    }

    #[test]
    fn test_prices_never_negative() {
        let closes: Vec<f64> = (0..10).map(|i| 10.0 - i as f64).collect();
        let prediction = predict("CRASH", &closes, 20, today()).unwrap();
        assert_eq!(prediction.trend_direction, TrendDirection::Downtrend);
        let last = prediction.predictions.last().unwrap();
        assert_eq!(last.predicted_price, 0.0);
        assert_eq!(last.upper_bound, 0.0);
        assert_eq!(last.confidence, 0.0);
    }
}
