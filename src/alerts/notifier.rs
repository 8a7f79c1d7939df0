use async_trait::async_trait;
use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::datatypes::{AlertTrigger, AlertType};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("sending notification failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("notification endpoint responded with {0}")]
    Rejected(u16),
}

/// Message sent to a user when one of their alerts fires
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Channel requested by the user, e.g. `push` or `email`
    pub method: String,
    pub user_id: String,
    pub alert_id: i32,
    pub title: String,
    pub message: String,
    pub trigger: AlertTrigger,
}

impl Notification {
    pub fn new(method: &str, alert_type: AlertType, trigger: &AlertTrigger) -> Notification {
        let message = match alert_type {
            AlertType::PriceTarget => format!("Price: {:.2}", trigger.current_price),
            _ => format!("{}: {:.2}", alert_type, trigger.trigger_value),
        };
        Notification {
            method: method.to_string(),
            user_id: trigger.user_id.clone(),
            alert_id: trigger.alert_id,
            title: format!("{} alert triggered", trigger.symbol),
            message,
            trigger: trigger.clone(),
        }
    }
}

/// Delivery of alert notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Only writes notifications to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            "[{}] to {}: {} - {}",
            notification.method, notification.user_id, notification.title, notification.message
        );
        Ok(())
    }
}

/// Posts notifications as JSON to a fixed URL
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: &str) -> WebhookNotifier {
        WebhookNotifier {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.url).json(notification).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(resp.status().as_u16()))
        }
    }
}
