use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use super::notifier::{Notification, Notifier};
use super::{evaluate, AlertMarketData};
use crate::datatypes::{Alert, AlertTrigger, DataError, DataHandler};
use crate::providers::{HistoryRange, MarketQuoteProvider, ProviderError};

/// Alerts that fired within this many minutes are not triggered again
pub const COOLDOWN_MINUTES: i64 = 5;
/// Notification channel used if an alert names none
const DEFAULT_METHOD: &str = "push";

#[derive(Debug, Clone, Serialize)]
pub struct TriggeredAlert {
    pub alert: Alert,
    pub trigger: AlertTrigger,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertCheckReport {
    pub checked: usize,
    pub triggered: usize,
    pub alerts: Vec<TriggeredAlert>,
}

pub struct AlertChecker {
    db: Arc<dyn DataHandler>,
    provider: Arc<dyn MarketQuoteProvider>,
    notifier: Arc<dyn Notifier>,
}

impl AlertChecker {
    pub fn new(
        db: Arc<dyn DataHandler>,
        provider: Arc<dyn MarketQuoteProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        AlertChecker {
            db,
            provider,
            notifier,
        }
    }

    async fn market_data(&self, symbol: &str) -> Result<AlertMarketData, ProviderError> {
        let quote = self.provider.fetch_latest_quote(symbol).await?;
        let bars = self.provider.fetch_bars(symbol, HistoryRange::Days(5)).await?;
        Ok(AlertMarketData {
            price: quote.price,
            previous_close: quote.previous_close,
            closes: bars.iter().map(|b| b.close).collect(),
            volumes: bars.iter().filter_map(|b| b.volume).collect(),
        })
    }

    async fn in_cooldown(&self, alert_id: i32) -> Result<bool, DataError> {
        let last = self.db.get_last_trigger(alert_id).await?;
        let cutoff = Utc::now() - Duration::minutes(COOLDOWN_MINUTES);
        Ok(last.is_some_and(|trigger| trigger.triggered_at >= cutoff))
    }

    /// Check a single alert, returning the trigger if it fired
    async fn check(&self, alert: &Alert) -> Result<Option<AlertTrigger>, String> {
        let alert_id = match alert.id {
            Some(id) => id,
            None => return Ok(None),
        };
        let market = self
            .market_data(&alert.symbol)
            .await
            .map_err(|e| e.to_string())?;
        let trigger_value = match evaluate(alert, &market) {
            Some(value) => value,
            None => return Ok(None),
        };
        if self.in_cooldown(alert_id).await.map_err(|e| e.to_string())? {
            debug!("alert {} fired recently, skipping", alert_id);
            return Ok(None);
        }

        let trigger = AlertTrigger {
            alert_id,
            user_id: alert.user_id.clone(),
            symbol: alert.symbol.clone(),
            trigger_value,
            current_price: market.price,
            triggered_at: Utc::now(),
        };
        self.db
            .insert_alert_trigger(&trigger)
            .await
            .map_err(|e| e.to_string())?;

        let default_methods = [DEFAULT_METHOD.to_string()];
        let methods = if alert.notification_methods.is_empty() {
            &default_methods[..]
        } else {
            &alert.notification_methods[..]
        };
        for method in methods {
            let notification = Notification::new(method, alert.alert_type, &trigger);
            if let Err(err) = self.notifier.notify(&notification).await {
                warn!("could not send {} notification for alert {}: {}", method, alert_id, err);
            }
        }
        Ok(Some(trigger))
    }

    /// Evaluate all active alerts. Failures of single alerts are logged and skipped.
    pub async fn check_all(&self) -> Result<AlertCheckReport, DataError> {
        let alerts = self.db.get_active_alerts().await?;
        let mut report = AlertCheckReport {
            checked: alerts.len(),
            ..Default::default()
        };
        for alert in alerts {
            match self.check(&alert).await {
                Ok(Some(trigger)) => report.alerts.push(TriggeredAlert { alert, trigger }),
                Ok(None) => {}
                Err(err) => warn!("checking alert on {} failed: {}", alert.symbol, err),
            }
        }
        report.triggered = report.alerts.len();
        info!(
            "checked {} alerts, {} triggered",
            report.checked, report.triggered
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::tests::alert;
    use crate::datatypes::{AlertCondition, AlertType, UserDataHandler};
    use crate::memory_handler::InMemoryDB;
    use crate::providers::tests::DummyProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::alerts::notifier::NotifyError;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_check_all() {
        let db = Arc::new(InMemoryDB::new());
        let provider = DummyProvider::new()
            .with_series("THYAO.IS", vec![100.0, 101.0, 99.0, 100.0, 110.0])
            .failing_for("GONE");
        let notifier = Arc::new(RecordingNotifier::default());

        let mut firing = alert(AlertType::PriceTarget, AlertCondition::Above, 105.0);
        firing.id = None;
        firing.notification_methods = vec!["push".to_string(), "email".to_string()];
        let firing = db.insert_alert(&firing).await.unwrap();
        let mut quiet = alert(AlertType::PriceTarget, AlertCondition::Below, 50.0);
        quiet.id = None;
        db.insert_alert(&quiet).await.unwrap();
        let mut broken = alert(AlertType::PriceTarget, AlertCondition::Above, 1.0);
        broken.id = None;
        broken.symbol = "GONE".to_string();
        db.insert_alert(&broken).await.unwrap();

        let checker = AlertChecker::new(db.clone(), Arc::new(provider), notifier.clone());
        let report = checker.check_all().await.unwrap();
        assert_eq!(report.checked, 3);
        assert_eq!(report.triggered, 1);
        assert_eq!(report.alerts[0].trigger.trigger_value, 110.0);
        assert_eq!(report.alerts[0].alert.id, firing.id);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);

        let last = db.get_last_trigger(firing.id.unwrap()).await.unwrap();
        assert_eq!(last.unwrap().current_price, 110.0);

        // within the cooldown nothing fires again
        let report = checker.check_all().await.unwrap();
        assert_eq!(report.triggered, 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }
}
