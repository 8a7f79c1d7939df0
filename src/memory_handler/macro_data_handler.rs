use async_trait::async_trait;
use chrono::NaiveDate;

use super::InMemoryDB;
use crate::datatypes::{
    DataError, EconomicIndicator, EconomicValue, MacroDataHandler, MacroFilter, MacroObservation,
};

#[async_trait]
impl MacroDataHandler for InMemoryDB {
    async fn upsert_macro_observation(&self, obs: &MacroObservation) -> Result<(), DataError> {
        let mut tables = self.write()?;
        tables.macro_observations.insert(
            (obs.country.clone(), obs.indicator.clone(), obs.date),
            obs.clone(),
        );
        Ok(())
    }

    async fn get_macro_observations(
        &self,
        filter: &MacroFilter,
    ) -> Result<Vec<MacroObservation>, DataError> {
        let tables = self.read()?;
        let mut observations: Vec<MacroObservation> = tables
            .macro_observations
            .values()
            .filter(|obs| filter.matches(obs))
            .cloned()
            .collect();
        observations.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(observations)
    }

    async fn upsert_indicator(&self, indicator: &EconomicIndicator) -> Result<(), DataError> {
        let mut tables = self.write()?;
        tables
            .indicators
            .insert(indicator.indicator_code.clone(), indicator.clone());
        Ok(())
    }

    async fn get_indicator(&self, code: &str) -> Result<Option<EconomicIndicator>, DataError> {
        Ok(self.read()?.indicators.get(code).cloned())
    }

    async fn get_indicators(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EconomicIndicator>, DataError> {
        let tables = self.read()?;
        Ok(tables
            .indicators
            .values()
            .filter(|i| category.map_or(true, |c| i.category == c))
            .cloned()
            .collect())
    }

    async fn upsert_economic_value(&self, value: &EconomicValue) -> Result<(), DataError> {
        let mut tables = self.write()?;
        tables.economic_values.insert(
            (value.indicator_code.clone(), value.period_date),
            value.clone(),
        );
        Ok(())
    }

    async fn get_economic_value_on_or_before(
        &self,
        code: &str,
        date: NaiveDate,
    ) -> Result<Option<EconomicValue>, DataError> {
        let tables = self.read()?;
        Ok(tables
            .economic_values
            .range((code.to_string(), NaiveDate::MIN)..=(code.to_string(), date))
            .next_back()
            .map(|(_, value)| value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(code: &str, date: NaiveDate, value: f64) -> EconomicValue {
        EconomicValue {
            indicator_code: code.to_string(),
            period_date: date,
            value,
            source: "TCMB".to_string(),
        }
    }

    #[tokio::test]
    async fn test_economic_value_lookup_on_or_before() {
        let db = InMemoryDB::new();
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        db.upsert_economic_value(&value("USD_TRY", day(2024, 10, 10), 34.2))
            .await
            .unwrap();
        db.upsert_economic_value(&value("USD_TRY", day(2024, 10, 20), 34.3))
            .await
            .unwrap();
        db.upsert_economic_value(&value("EUR_TRY", day(2024, 10, 15), 37.0))
            .await
            .unwrap();

        let found = db
            .get_economic_value_on_or_before("USD_TRY", day(2024, 10, 17))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.value, 34.2);
        assert!(db
            .get_economic_value_on_or_before("USD_TRY", day(2024, 10, 1))
            .await
            .unwrap()
            .is_none());
        assert!(db
            .get_economic_value_on_or_before("GBP_TRY", day(2025, 1, 1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_macro_observation_upsert_replaces_value() {
        let db = InMemoryDB::new();
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let mut obs = MacroObservation {
            country: "US".to_string(),
            indicator: "FEDFUNDS".to_string(),
            value: 4.33,
            unit: "Percent".to_string(),
            date,
            source: "FRED".to_string(),
            metadata: serde_json::json!({"series_id": "FEDFUNDS"}),
        };
        db.upsert_macro_observation(&obs).await.unwrap();
        obs.value = 4.22;
        db.upsert_macro_observation(&obs).await.unwrap();
        let all = db
            .get_macro_observations(&MacroFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, 4.22);
    }
}
