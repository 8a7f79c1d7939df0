//! Basic statistics on slices of `f64`

/// Trading days per year used to annualize daily figures
pub const TRADING_DAYS: f64 = 252.0;

/// Arithmetic mean, 0 for empty input
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation, 0 for empty input
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Relative changes between consecutive values. Steps starting at a zero value are skipped.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Pearson correlation coefficient. Returns 0 if the inputs differ in length,
/// are empty or one of them is constant.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n == 0 || n != y.len() {
        return 0.0;
    }
    let n = n as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();
    if denominator == 0.0 || denominator.is_nan() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Ordinary least squares fit of `values` against their index `0..n`,
/// returns `(slope, intercept)`
pub fn linear_regression(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..n).map(|i| (i * i) as f64).sum();

    let denominator = n_f * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return (0.0, sum_y / n_f);
    }
    let slope = (n_f * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n_f;
    (slope, intercept)
}

/// Mean of the last `window` values (or all, if there are fewer)
pub fn moving_average(values: &[f64], window: usize) -> f64 {
    let window = window.min(values.len());
    mean(&values[values.len() - window..])
}

/// Relative strength index over the last `period` returns
pub fn rsi(returns: &[f64], period: usize) -> f64 {
    let period = period.min(returns.len());
    if period == 0 {
        return 50.0;
    }
    let recent = &returns[returns.len() - period..];
    let avg_gain = recent.iter().map(|r| r.max(0.0)).sum::<f64>() / period as f64;
    let avg_loss = recent.iter().map(|r| (-r).max(0.0)).sum::<f64>() / period as f64;
    let rs = if avg_loss == 0.0 {
        100.0
    } else {
        avg_gain / avg_loss
    };
    100.0 - 100.0 / (1.0 + rs)
}

/// Largest drop from a running peak in percent (a positive number)
pub fn max_drawdown_percent(prices: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_drawdown = 0.0_f64;
    for price in prices {
        if *price > peak {
            peak = *price;
        }
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - price) / peak * 100.0);
        }
    }
    max_drawdown
}

/// Historical value at risk of the given confidence tail (e.g. 0.05), as a positive return
pub fn historical_var(returns: &[f64], tail: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() as f64 * tail).floor() as usize).min(sorted.len() - 1);
    sorted[idx].abs()
}

/// Annualized volatility in percent from the standard deviation of daily returns
pub fn annualized_volatility(daily_std_dev: f64) -> f64 {
    daily_std_dev * TRADING_DAYS.sqrt() * 100.0
}

/// Annualized volatility in percent based on the root mean square of daily returns
pub fn rms_volatility(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean_square = returns.iter().map(|r| r * r).sum::<f64>() / returns.len() as f64;
    mean_square.sqrt() * TRADING_DAYS.sqrt() * 100.0
}

/// Round to the given number of decimal digits
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_fuzzy_eq!(mean(&values), 5.0, 1e-12);
        assert_fuzzy_eq!(population_std_dev(&values), 2.0, 1e-12);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_simple_returns() {
        let returns = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert_fuzzy_eq!(returns[0], 0.1, 1e-12);
        assert_fuzzy_eq!(returns[1], -0.1, 1e-12);
        assert!(simple_returns(&[100.0]).is_empty());
    }

    #[test]
    fn test_pearson_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let z = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert_fuzzy_eq!(pearson_correlation(&x, &y), 1.0, 1e-12);
        assert_fuzzy_eq!(pearson_correlation(&x, &z), -1.0, 1e-12);
        assert_eq!(pearson_correlation(&x, &[1.0, 1.0, 1.0, 1.0, 1.0]), 0.0);
        assert_eq!(pearson_correlation(&x, &y[..3]), 0.0);
        assert_eq!(pearson_correlation(&[], &[]), 0.0);
    }

    #[test]
    fn test_linear_regression() {
        let (slope, intercept) = linear_regression(&[1.0, 3.0, 5.0, 7.0]);
        assert_fuzzy_eq!(slope, 2.0, 1e-12);
        assert_fuzzy_eq!(intercept, 1.0, 1e-12);
        let (slope, intercept) = linear_regression(&[4.0]);
        assert_eq!(slope, 0.0);
        assert_eq!(intercept, 4.0);
    }

    #[test]
    fn test_moving_average() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_fuzzy_eq!(moving_average(&values, 2), 4.5, 1e-12);
        assert_fuzzy_eq!(moving_average(&values, 50), 3.0, 1e-12);
    }

    #[test]
    fn test_rsi() {
        assert_fuzzy_eq!(rsi(&[0.01, 0.02, 0.03], 14), 100.0 - 100.0 / 101.0, 1e-12);
        assert_fuzzy_eq!(rsi(&[0.01, -0.01], 14), 50.0, 1e-12);
        assert_fuzzy_eq!(rsi(&[-0.01, -0.02], 14), 0.0, 1e-12);
        // only the last `period` returns count
        assert_fuzzy_eq!(rsi(&[-0.5, 0.01, -0.01], 2), 50.0, 1e-12);
    }

    #[test]
    fn test_max_drawdown() {
        assert_fuzzy_eq!(max_drawdown_percent(&[100.0, 120.0, 90.0, 130.0, 117.0]), 25.0, 1e-12);
        assert_eq!(max_drawdown_percent(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_historical_var() {
        let returns: Vec<f64> = (0..100).map(|i| (i as f64 - 50.0) / 1000.0).collect();
        // sorted[5] = -0.045
        assert_fuzzy_eq!(historical_var(&returns, 0.05), 0.045, 1e-12);
        assert_eq!(historical_var(&[], 0.05), 0.0);
    }

    #[test]
    fn test_volatility() {
        assert_fuzzy_eq!(annualized_volatility(0.01), 15.874507866, 1e-8);
        assert_fuzzy_eq!(rms_volatility(&[0.01, -0.01]), 15.874507866, 1e-8);
        assert_eq!(rms_volatility(&[]), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 2), 0.12);
        assert_eq!(round_to(41.87996, 4), 41.88);
    }
}
