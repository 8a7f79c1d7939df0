use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;

use super::{invalid, read_failed, PostgresDB};
use crate::datatypes::{AnalysisHandler, AnalysisKind, AnalysisRecord, DataError};

#[async_trait]
impl AnalysisHandler for PostgresDB {
    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<i32, DataError> {
        let row = sqlx::query(
            "INSERT INTO analysis_results (kind, symbol, score, label, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(record.kind.as_str())
        .bind(&record.symbol)
        .bind(record.score)
        .bind(&record.label)
        .bind(&record.payload)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        row.try_get("id").map_err(invalid)
    }

    async fn get_analyses(
        &self,
        kind: AnalysisKind,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, DataError> {
        let rows = sqlx::query(
            "SELECT id, kind, symbol, score, label, payload, created_at FROM analysis_results
            WHERE kind = $1 AND symbol = $2
            ORDER BY created_at DESC, id DESC LIMIT $3",
        )
        .bind(kind.as_str())
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        let mut records = Vec::new();
        for row in rows {
            let kind: String = row.try_get("kind").map_err(invalid)?;
            records.push(AnalysisRecord {
                id: Some(row.try_get("id").map_err(invalid)?),
                kind: AnalysisKind::from_str(&kind).map_err(invalid)?,
                symbol: row.try_get("symbol").map_err(invalid)?,
                score: row.try_get("score").map_err(invalid)?,
                label: row.try_get("label").map_err(invalid)?,
                payload: row.try_get("payload").map_err(invalid)?,
                created_at: row.try_get("created_at").map_err(invalid)?,
            });
        }
        Ok(records)
    }
}
