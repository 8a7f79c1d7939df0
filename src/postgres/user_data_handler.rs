///! PostgreSQL implementation of the handler for holdings and alerts
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{invalid, read_failed, PostgresDB};
use crate::datatypes::{
    Alert, AlertCondition, AlertTrigger, AlertType, DataError, Holding, UserDataHandler,
};

fn holding_from_row(row: &PgRow) -> Result<Holding, sqlx::Error> {
    Ok(Holding {
        id: Some(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        portfolio_id: row.try_get("portfolio_id")?,
        symbol: row.try_get("symbol")?,
        asset_type: row.try_get("asset_type")?,
        quantity: row.try_get("quantity")?,
        average_price: row.try_get("average_price")?,
        current_price: row.try_get("current_price")?,
        current_value: row.try_get("current_value")?,
        gain_loss_percent: row.try_get("gain_loss_percent")?,
    })
}

fn alert_from_row(row: &PgRow) -> Result<Alert, sqlx::Error> {
    let alert_type: String = row.try_get("alert_type")?;
    let condition: String = row.try_get("condition")?;
    Ok(Alert {
        id: Some(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        alert_type: AlertType::from_str(&alert_type).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        condition: AlertCondition::from_str(&condition)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        threshold: row.try_get("threshold")?,
        is_active: row.try_get("is_active")?,
        notification_methods: row.try_get("notification_methods")?,
        created_at: row.try_get("created_at")?,
        triggered_at: row.try_get("triggered_at")?,
    })
}

#[async_trait]
impl UserDataHandler for PostgresDB {
    async fn insert_holding(&self, holding: &Holding) -> Result<i32, DataError> {
        let row = sqlx::query(
            "INSERT INTO portfolio_holdings (user_id, portfolio_id, symbol, asset_type, quantity,
                average_price, current_price, current_value, gain_loss_percent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&holding.user_id)
        .bind(&holding.portfolio_id)
        .bind(&holding.symbol)
        .bind(&holding.asset_type)
        .bind(holding.quantity)
        .bind(holding.average_price)
        .bind(holding.current_price)
        .bind(holding.current_value)
        .bind(holding.gain_loss_percent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        row.try_get("id").map_err(invalid)
    }

    async fn get_holdings(&self, user_id: &str) -> Result<Vec<Holding>, DataError> {
        let rows = sqlx::query("SELECT * FROM portfolio_holdings WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(read_failed)?;
        rows.iter()
            .map(holding_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)
    }

    async fn delete_holding(&self, id: i32) -> Result<(), DataError> {
        let result = sqlx::query("DELETE FROM portfolio_holdings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::DeleteFailed(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("holding {}", id)));
        }
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<Alert, DataError> {
        let row = sqlx::query(
            "INSERT INTO user_alerts (user_id, symbol, alert_type, condition, threshold, is_active,
                notification_methods, created_at, triggered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&alert.user_id)
        .bind(&alert.symbol)
        .bind(alert.alert_type.as_str())
        .bind(alert.condition.as_str())
        .bind(alert.threshold)
        .bind(alert.is_active)
        .bind(&alert.notification_methods)
        .bind(alert.created_at)
        .bind(alert.triggered_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        let mut alert = alert.clone();
        alert.id = Some(row.try_get("id").map_err(invalid)?);
        Ok(alert)
    }

    async fn get_alerts(&self, user_id: &str) -> Result<Vec<Alert>, DataError> {
        let rows = sqlx::query(
            "SELECT * FROM user_alerts
            WHERE user_id = $1 AND is_active AND triggered_at IS NULL
            ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        rows.iter()
            .map(alert_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)
    }

    async fn get_active_alerts(&self) -> Result<Vec<Alert>, DataError> {
        let rows = sqlx::query("SELECT * FROM user_alerts WHERE is_active ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(read_failed)?;
        rows.iter()
            .map(alert_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)
    }

    async fn insert_alert_trigger(&self, trigger: &AlertTrigger) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO alert_triggers (alert_id, user_id, symbol, trigger_value, current_price,
                triggered_at)
            VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(trigger.alert_id)
        .bind(&trigger.user_id)
        .bind(&trigger.symbol)
        .bind(trigger.trigger_value)
        .bind(trigger.current_price)
        .bind(trigger.triggered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_last_trigger(&self, alert_id: i32) -> Result<Option<AlertTrigger>, DataError> {
        let row = sqlx::query(
            "SELECT alert_id, user_id, symbol, trigger_value, current_price, triggered_at
            FROM alert_triggers WHERE alert_id = $1
            ORDER BY triggered_at DESC LIMIT 1",
        )
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_failed)?;
        match row {
            Some(row) => Ok(Some(AlertTrigger {
                alert_id: row.try_get("alert_id").map_err(invalid)?,
                user_id: row.try_get("user_id").map_err(invalid)?,
                symbol: row.try_get("symbol").map_err(invalid)?,
                trigger_value: row.try_get("trigger_value").map_err(invalid)?,
                current_price: row.try_get("current_price").map_err(invalid)?,
                triggered_at: row.try_get("triggered_at").map_err(invalid)?,
            })),
            None => Ok(None),
        }
    }
}
