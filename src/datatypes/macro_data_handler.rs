use async_trait::async_trait;
///! Data handler trait for macroeconomic data
use chrono::NaiveDate;

use super::{DataError, EconomicIndicator, EconomicValue, MacroFilter, MacroObservation};

#[async_trait]
pub trait MacroDataHandler: Send + Sync {
    /// Insert or replace observation keyed by country, indicator and date
    async fn upsert_macro_observation(&self, obs: &MacroObservation) -> Result<(), DataError>;
    /// Observations matching the filter, newest first
    async fn get_macro_observations(&self, filter: &MacroFilter) -> Result<Vec<MacroObservation>, DataError>;

    /// Insert or replace the dashboard indicator with the same code
    async fn upsert_indicator(&self, indicator: &EconomicIndicator) -> Result<(), DataError>;
    async fn get_indicator(&self, code: &str) -> Result<Option<EconomicIndicator>, DataError>;
    async fn get_indicators(&self, category: Option<&str>) -> Result<Vec<EconomicIndicator>, DataError>;

    async fn upsert_economic_value(&self, value: &EconomicValue) -> Result<(), DataError>;
    /// Latest value of the indicator with period date on or before `date`
    async fn get_economic_value_on_or_before(
        &self,
        code: &str,
        date: NaiveDate,
    ) -> Result<Option<EconomicValue>, DataError>;
}
