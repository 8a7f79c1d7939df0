use async_trait::async_trait;

use super::{next_id, InMemoryDB};
use crate::datatypes::{Alert, AlertTrigger, DataError, Holding, UserDataHandler};

#[async_trait]
impl UserDataHandler for InMemoryDB {
    async fn insert_holding(&self, holding: &Holding) -> Result<i32, DataError> {
        let mut tables = self.write()?;
        let id = next_id(&mut tables.next_holding_id);
        let mut holding = holding.clone();
        holding.id = Some(id);
        tables.holdings.insert(id, holding);
        Ok(id)
    }

    async fn get_holdings(&self, user_id: &str) -> Result<Vec<Holding>, DataError> {
        let tables = self.read()?;
        Ok(tables
            .holdings
            .values()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_holding(&self, id: i32) -> Result<(), DataError> {
        let mut tables = self.write()?;
        match tables.holdings.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DataError::NotFound(format!("holding {}", id))),
        }
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<Alert, DataError> {
        let mut tables = self.write()?;
        let id = next_id(&mut tables.next_alert_id);
        let mut alert = alert.clone();
        alert.id = Some(id);
        tables.alerts.insert(id, alert.clone());
        Ok(alert)
    }

    async fn get_alerts(&self, user_id: &str) -> Result<Vec<Alert>, DataError> {
        let tables = self.read()?;
        Ok(tables
            .alerts
            .values()
            .filter(|a| a.user_id == user_id && a.is_active && a.triggered_at.is_none())
            .cloned()
            .collect())
    }

    async fn get_active_alerts(&self) -> Result<Vec<Alert>, DataError> {
        let tables = self.read()?;
        Ok(tables
            .alerts
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn insert_alert_trigger(&self, trigger: &AlertTrigger) -> Result<(), DataError> {
        let mut tables = self.write()?;
        let newer = tables
            .last_triggers
            .get(&trigger.alert_id)
            .map_or(true, |last| last.triggered_at <= trigger.triggered_at);
        if newer {
            tables.last_triggers.insert(trigger.alert_id, trigger.clone());
        }
        Ok(())
    }

    async fn get_last_trigger(&self, alert_id: i32) -> Result<Option<AlertTrigger>, DataError> {
        Ok(self.read()?.last_triggers.get(&alert_id).cloned())
    }
}
