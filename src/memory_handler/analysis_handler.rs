use async_trait::async_trait;

use super::{next_id, InMemoryDB};
use crate::datatypes::{AnalysisHandler, AnalysisKind, AnalysisRecord, DataError};

#[async_trait]
impl AnalysisHandler for InMemoryDB {
    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<i32, DataError> {
        let mut tables = self.write()?;
        let id = next_id(&mut tables.next_analysis_id);
        let mut record = record.clone();
        record.id = Some(id);
        tables.analyses.insert(id, record);
        Ok(id)
    }

    async fn get_analyses(
        &self,
        kind: AnalysisKind,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, DataError> {
        let tables = self.read()?;
        let mut records: Vec<AnalysisRecord> = tables
            .analyses
            .values()
            .filter(|r| r.kind == kind && r.symbol == symbol)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }
}
