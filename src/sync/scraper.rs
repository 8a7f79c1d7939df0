//! Stores the doviz.com front page figures as board snapshots
use std::sync::Arc;

use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

use super::SyncError;
use crate::datatypes::date_time_helper::today_in_istanbul;
use crate::datatypes::{DataHandler, MarketSnapshot};
use crate::providers::doviz::{Doviz, DovizQuote};
use crate::providers::DataSource;

#[derive(Debug, Clone, Serialize)]
pub struct ScraperReport {
    pub date: NaiveDate,
    pub stored: usize,
    pub quotes: Vec<DovizQuote>,
    /// Targets missing on the page or not stored
    pub failed: Vec<String>,
}

pub struct ScraperSync {
    db: Arc<dyn DataHandler>,
    doviz: Arc<Doviz>,
}

impl ScraperSync {
    pub fn new(db: Arc<dyn DataHandler>, doviz: Arc<Doviz>) -> Self {
        ScraperSync { db, doviz }
    }

    pub async fn run(&self) -> Result<ScraperReport, SyncError> {
        let snapshot = self.doviz.fetch_snapshot().await?;
        let date = today_in_istanbul();
        let mut failed = snapshot.failed;
        let mut stored = 0;
        for quote in &snapshot.quotes {
            let row = MarketSnapshot {
                board: quote.board,
                symbol: quote.code.clone(),
                name: quote.name.clone(),
                close_price: quote.value,
                change_value: None,
                change_percent: None,
                day_high: None,
                day_low: None,
                volume: None,
                data_date: date,
                source: DataSource::Doviz.to_string(),
            };
            match self.db.upsert_market_snapshot(&row).await {
                Ok(()) => stored += 1,
                Err(err) => {
                    warn!("storing {} failed: {}", quote.code, err);
                    failed.push(quote.code.clone());
                }
            }
        }
        info!("scraped {} values from doviz.com, {} failed", stored, failed.len());
        Ok(ScraperReport {
            date,
            stored,
            quotes: snapshot.quotes,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Board, MarketDataHandler};
    use crate::memory_handler::InMemoryDB;
    use crate::providers::doviz::tests::PAGE;

    #[tokio::test]
    async fn test_run() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;
        let db = Arc::new(InMemoryDB::new());
        let doviz = Doviz::with_url(reqwest::Client::new(), &server.url());
        let sync = ScraperSync::new(db.clone(), Arc::new(doviz));

        let report = sync.run().await.unwrap();
        assert_eq!(report.stored, 5);
        assert_eq!(report.failed, vec!["bitcoin".to_string()]);
        let indices = db.get_market_snapshots(Board::Indices).await.unwrap();
        let usd = indices.iter().find(|s| s.symbol == "USD/TRY").unwrap();
        assert_eq!(usd.close_price, 41.8512);
        assert_eq!(usd.source, "doviz.com");

        sync.run().await.unwrap();
        assert_eq!(db.get_market_snapshots(Board::Commodities).await.unwrap().len(), 2);
    }
}
