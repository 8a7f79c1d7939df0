//! Evaluation of user alerts against current market data
use crate::analytics::stats::{mean, moving_average, population_std_dev};
use crate::datatypes::{Alert, AlertCondition, AlertType};

pub mod checker;
pub mod notifier;

pub use checker::{AlertCheckReport, AlertChecker, TriggeredAlert};
pub use notifier::{LogNotifier, Notification, Notifier, NotifyError, WebhookNotifier};

/// Number of recent bars volume and volatility alerts look at
pub const RECENT_BARS: usize = 5;

/// Market data an alert is evaluated on
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMarketData {
    pub price: f64,
    pub previous_close: f64,
    /// Recent daily closes, oldest first
    pub closes: Vec<f64>,
    /// Recent daily volumes, oldest first
    pub volumes: Vec<f64>,
}

fn passes(condition: AlertCondition, value: f64, threshold: f64) -> bool {
    match condition {
        AlertCondition::Above => value >= threshold,
        AlertCondition::Below => value <= threshold,
    }
}

/// Returns the value that triggers the alert, or `None` if it doesn't fire
pub fn evaluate(alert: &Alert, market: &AlertMarketData) -> Option<f64> {
    match alert.alert_type {
        AlertType::PriceTarget => {
            Some(market.price).filter(|price| passes(alert.condition, *price, alert.threshold))
        }
        AlertType::PercentageChange => {
            if market.previous_close <= 0.0 {
                return None;
            }
            let change = (market.price - market.previous_close) / market.previous_close * 100.0;
            Some(change).filter(|change| passes(alert.condition, *change, alert.threshold))
        }
        AlertType::VolumeSpike => {
            let volume = *market.volumes.last()?;
            let avg_volume = moving_average(&market.volumes, RECENT_BARS);
            if avg_volume > 0.0 && volume > avg_volume * alert.threshold / 100.0 {
                Some(volume)
            } else {
                None
            }
        }
        AlertType::Volatility => {
            if market.closes.len() < RECENT_BARS {
                return None;
            }
            let recent = &market.closes[market.closes.len() - RECENT_BARS..];
            let avg = mean(recent);
            if avg <= 0.0 {
                return None;
            }
            let volatility = population_std_dev(recent) / avg * 100.0;
            Some(volatility).filter(|v| *v >= alert.threshold)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn alert(alert_type: AlertType, condition: AlertCondition, threshold: f64) -> Alert {
        Alert {
            id: Some(1),
            user_id: "u1".to_string(),
            symbol: "THYAO.IS".to_string(),
            alert_type,
            condition,
            threshold,
            is_active: true,
            notification_methods: vec!["push".to_string()],
            created_at: Utc::now(),
            triggered_at: None,
        }
    }

    fn market() -> AlertMarketData {
        AlertMarketData {
            price: 110.0,
            previous_close: 100.0,
            closes: vec![100.0, 102.0, 98.0, 100.0, 110.0],
            volumes: vec![1000.0, 1000.0, 1000.0, 1000.0, 3000.0],
        }
    }

    #[test]
    fn test_price_target() {
        let above = alert(AlertType::PriceTarget, AlertCondition::Above, 110.0);
        assert_eq!(evaluate(&above, &market()), Some(110.0));
        let below = alert(AlertType::PriceTarget, AlertCondition::Below, 105.0);
        assert_eq!(evaluate(&below, &market()), None);
    }

    #[test]
    fn test_percentage_change() {
        let above = alert(AlertType::PercentageChange, AlertCondition::Above, 5.0);
        assert_fuzzy_eq!(evaluate(&above, &market()).unwrap(), 10.0, 1e-9);
        let below = alert(AlertType::PercentageChange, AlertCondition::Below, -5.0);
        assert_eq!(evaluate(&below, &market()), None);
        let mut no_previous = market();
        no_previous.previous_close = 0.0;
        assert_eq!(evaluate(&above, &no_previous), None);
    }

    #[test]
    fn test_volume_spike() {
        // average of the last five volumes is 1400
        let spike = alert(AlertType::VolumeSpike, AlertCondition::Above, 200.0);
        assert_eq!(evaluate(&spike, &market()), Some(3000.0));
        let high = alert(AlertType::VolumeSpike, AlertCondition::Above, 250.0);
        assert_eq!(evaluate(&high, &market()), None);
        let mut no_volume = market();
        no_volume.volumes.clear();
        assert_eq!(evaluate(&spike, &no_volume), None);
    }

    #[test]
    fn test_volatility() {
        let volatility = alert(AlertType::Volatility, AlertCondition::Above, 3.0);
        // variance of the last five closes is 17.6 around a mean of 102
        let value = evaluate(&volatility, &market()).unwrap();
        assert_fuzzy_eq!(value, 17.6_f64.sqrt() / 102.0 * 100.0, 1e-9);
        let mut short = market();
        short.closes.remove(0);
        assert_eq!(evaluate(&volatility, &short), None);
    }
}
