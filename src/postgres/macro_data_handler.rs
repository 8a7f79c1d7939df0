///! PostgreSQL implementation of the macro data handler
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{invalid, read_failed, PostgresDB};
use crate::datatypes::{
    DataError, EconomicIndicator, EconomicValue, MacroDataHandler, MacroFilter, MacroObservation,
};

fn indicator_from_row(row: &PgRow) -> Result<EconomicIndicator, sqlx::Error> {
    Ok(EconomicIndicator {
        indicator_code: row.try_get("indicator_code")?,
        indicator_name: row.try_get("indicator_name")?,
        category: row.try_get("category")?,
        current_value: row.try_get("current_value")?,
        previous_value: row.try_get("previous_value")?,
        change_percent: row.try_get("change_percent")?,
        period_date: row.try_get("period_date")?,
        unit: row.try_get("unit")?,
        source: row.try_get("source")?,
        last_updated: row.try_get("last_updated")?,
    })
}

#[async_trait]
impl MacroDataHandler for PostgresDB {
    async fn upsert_macro_observation(&self, obs: &MacroObservation) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO macro_data (country, indicator, value, unit, date, source, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (country, indicator, date) DO UPDATE SET
                value = EXCLUDED.value,
                unit = EXCLUDED.unit,
                source = EXCLUDED.source,
                metadata = EXCLUDED.metadata",
        )
        .bind(&obs.country)
        .bind(&obs.indicator)
        .bind(obs.value)
        .bind(&obs.unit)
        .bind(obs.date)
        .bind(&obs.source)
        .bind(&obs.metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_macro_observations(
        &self,
        filter: &MacroFilter,
    ) -> Result<Vec<MacroObservation>, DataError> {
        let rows = sqlx::query(
            "SELECT country, indicator, value, unit, date, source, metadata FROM macro_data
            WHERE ($1::TEXT IS NULL OR country = $1)
                AND ($2::TEXT IS NULL OR indicator = $2)
                AND ($3::DATE IS NULL OR date >= $3)
                AND ($4::DATE IS NULL OR date <= $4)
            ORDER BY date DESC",
        )
        .bind(filter.country.as_deref())
        .bind(filter.indicator.as_deref())
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        let mut observations = Vec::new();
        for row in rows {
            observations.push(MacroObservation {
                country: row.try_get("country").map_err(invalid)?,
                indicator: row.try_get("indicator").map_err(invalid)?,
                value: row.try_get("value").map_err(invalid)?,
                unit: row.try_get("unit").map_err(invalid)?,
                date: row.try_get("date").map_err(invalid)?,
                source: row.try_get("source").map_err(invalid)?,
                metadata: row.try_get("metadata").map_err(invalid)?,
            });
        }
        Ok(observations)
    }

    async fn upsert_indicator(&self, indicator: &EconomicIndicator) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO turkey_economics (indicator_code, indicator_name, category, current_value,
                previous_value, change_percent, period_date, unit, source, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (indicator_code) DO UPDATE SET
                indicator_name = EXCLUDED.indicator_name,
                category = EXCLUDED.category,
                current_value = EXCLUDED.current_value,
                previous_value = EXCLUDED.previous_value,
                change_percent = EXCLUDED.change_percent,
                period_date = EXCLUDED.period_date,
                unit = EXCLUDED.unit,
                source = EXCLUDED.source,
                last_updated = EXCLUDED.last_updated",
        )
        .bind(&indicator.indicator_code)
        .bind(&indicator.indicator_name)
        .bind(&indicator.category)
        .bind(indicator.current_value)
        .bind(indicator.previous_value)
        .bind(indicator.change_percent)
        .bind(indicator.period_date)
        .bind(&indicator.unit)
        .bind(&indicator.source)
        .bind(indicator.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_indicator(&self, code: &str) -> Result<Option<EconomicIndicator>, DataError> {
        let row = sqlx::query("SELECT * FROM turkey_economics WHERE indicator_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_failed)?;
        row.map(|row| indicator_from_row(&row))
            .transpose()
            .map_err(invalid)
    }

    async fn get_indicators(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EconomicIndicator>, DataError> {
        let rows = sqlx::query(
            "SELECT * FROM turkey_economics
            WHERE ($1::TEXT IS NULL OR category = $1)
            ORDER BY indicator_code",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        rows.iter()
            .map(indicator_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)
    }

    async fn upsert_economic_value(&self, value: &EconomicValue) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO economic_data (indicator_code, period_date, value, source)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (indicator_code, period_date) DO UPDATE SET
                value = EXCLUDED.value,
                source = EXCLUDED.source",
        )
        .bind(&value.indicator_code)
        .bind(value.period_date)
        .bind(value.value)
        .bind(&value.source)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_economic_value_on_or_before(
        &self,
        code: &str,
        date: NaiveDate,
    ) -> Result<Option<EconomicValue>, DataError> {
        let row = sqlx::query(
            "SELECT indicator_code, period_date, value, source FROM economic_data
            WHERE indicator_code = $1 AND period_date <= $2
            ORDER BY period_date DESC LIMIT 1",
        )
        .bind(code)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_failed)?;
        match row {
            Some(row) => Ok(Some(EconomicValue {
                indicator_code: row.try_get("indicator_code").map_err(invalid)?,
                period_date: row.try_get("period_date").map_err(invalid)?,
                value: row.try_get("value").map_err(invalid)?,
                source: row.try_get("source").map_err(invalid)?,
            })),
            None => Ok(None),
        }
    }
}
