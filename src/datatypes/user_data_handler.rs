use async_trait::async_trait;
///! Data handler trait for user owned data, i.e. portfolio holdings and alerts

use super::{Alert, AlertTrigger, DataError, Holding};

#[async_trait]
pub trait UserDataHandler: Send + Sync {
    async fn insert_holding(&self, holding: &Holding) -> Result<i32, DataError>;
    async fn get_holdings(&self, user_id: &str) -> Result<Vec<Holding>, DataError>;
    async fn delete_holding(&self, id: i32) -> Result<(), DataError>;

    /// Store a new alert and return it with its id set
    async fn insert_alert(&self, alert: &Alert) -> Result<Alert, DataError>;
    /// Active alerts of a user that have not been triggered yet
    async fn get_alerts(&self, user_id: &str) -> Result<Vec<Alert>, DataError>;
    /// All active alerts of all users
    async fn get_active_alerts(&self) -> Result<Vec<Alert>, DataError>;

    async fn insert_alert_trigger(&self, trigger: &AlertTrigger) -> Result<(), DataError>;
    async fn get_last_trigger(&self, alert_id: i32) -> Result<Option<AlertTrigger>, DataError>;
}
