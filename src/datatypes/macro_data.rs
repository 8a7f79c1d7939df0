use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Macroeconomic time series value, unique by country, indicator and date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroObservation {
    pub country: String,
    pub indicator: String,
    pub value: f64,
    pub unit: String,
    pub date: NaiveDate,
    pub source: String,
    pub metadata: serde_json::Value,
}

/// Filter used for querying macro observations, all fields are optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MacroFilter {
    pub country: Option<String>,
    pub indicator: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl MacroFilter {
    pub fn matches(&self, obs: &MacroObservation) -> bool {
        self.country.as_ref().map_or(true, |c| *c == obs.country)
            && self.indicator.as_ref().map_or(true, |i| *i == obs.indicator)
            && self.start_date.map_or(true, |d| obs.date >= d)
            && self.end_date.map_or(true, |d| obs.date <= d)
    }
}

/// Headline indicator shown on the Turkish economy dashboard, unique by code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicIndicator {
    pub indicator_code: String,
    pub indicator_name: String,
    pub category: String,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    pub change_percent: Option<f64>,
    pub period_date: NaiveDate,
    pub unit: String,
    pub source: String,
    pub last_updated: DateTime<Utc>,
}

/// Historic value of an economic indicator, unique by code and period date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicValue {
    pub indicator_code: String,
    pub period_date: NaiveDate,
    pub value: f64,
    pub source: String,
}
