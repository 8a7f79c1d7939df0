use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceTarget,
    PercentageChange,
    VolumeSpike,
    Volatility,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceTarget => "price_target",
            Self::PercentageChange => "percentage_change",
            Self::VolumeSpike => "volume_spike",
            Self::Volatility => "volatility",
        }
    }
}

impl FromStr for AlertType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_target" => Ok(Self::PriceTarget),
            "percentage_change" => Ok(Self::PercentageChange),
            "volume_spike" => Ok(Self::VolumeSpike),
            "volatility" => Ok(Self::Volatility),
            _ => Err(ParseEnumError::new("alert type", s)),
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

impl FromStr for AlertCondition {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            _ => Err(ParseEnumError::new("alert condition", s)),
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User defined alert on a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Option<i32>,
    pub user_id: String,
    pub symbol: String,
    pub alert_type: AlertType,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub is_active: bool,
    /// e.g. `email`, `push` or `webhook`
    pub notification_methods: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Record of an alert that fired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTrigger {
    pub alert_id: i32,
    pub user_id: String,
    pub symbol: String,
    pub trigger_value: f64,
    pub current_price: f64,
    pub triggered_at: DateTime<Utc>,
}
