use async_trait::async_trait;

use super::{AnalysisKind, AnalysisRecord, DataError};

/// Storage for results of analysis runs
#[async_trait]
pub trait AnalysisHandler: Send + Sync {
    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<i32, DataError>;
    /// Most recent records of a kind for a symbol, newest first
    async fn get_analyses(
        &self,
        kind: AnalysisKind,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, DataError>;
}
