//! Ingest jobs: fetch data from the external sources and store it
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::datatypes::{DataError, DataHandler};
use crate::providers::doviz::Doviz;
use crate::providers::evds::Evds;
use crate::providers::fred::Fred;
use crate::providers::tcmb::Tcmb;
use crate::providers::tefas::Tefas;
use crate::providers::tuik::Tuik;
use crate::providers::{MarketQuoteProvider, ProviderError};

pub mod funds;
pub mod macro_data;
pub mod market;
pub mod scraper;

pub use funds::{FundSync, FundSyncReport};
pub use macro_data::{
    EvdsReport, EvdsSeriesResult, FredBatchReport, FredSeriesReport, MacroSync, RateEntry, TcmbReport,
};
pub use market::{AssetFetchReport, DashboardCounts, DashboardReport, MarketSync};
pub use scraper::{ScraperReport, ScraperSync};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("database operation failed: {0}")]
    Data(#[from] DataError),
    #[error("writing csv failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export failed: {0}")]
    Export(String),
    #[error("no {0} release found")]
    NoRelease(&'static str),
}

/// Result of one job within a combined run
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobOutcome {
    fn from_result<T: Serialize>(job: &str, result: Result<T, SyncError>) -> JobOutcome {
        let result = result.and_then(|data| {
            serde_json::to_value(data).map_err(|e| SyncError::Export(e.to_string()))
        });
        match result {
            Ok(data) => {
                info!("{} sync finished", job);
                JobOutcome {
                    success: true,
                    data: Some(data),
                    error: None,
                }
            }
            Err(err) => {
                warn!("{} sync failed: {}", job, err);
                JobOutcome {
                    success: false,
                    data: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncAllReport {
    pub tcmb: JobOutcome,
    pub fred: JobOutcome,
    pub market: JobOutcome,
    pub scraper: JobOutcome,
}

/// All ingest jobs wired to the same store
pub struct SyncJobs {
    pub market: MarketSync,
    pub macro_data: MacroSync,
    pub funds: FundSync,
    pub scraper: ScraperSync,
}

impl SyncJobs {
    pub fn new(
        config: &Config,
        db: Arc<dyn DataHandler>,
        yahoo: Arc<dyn MarketQuoteProvider>,
        client: reqwest::Client,
    ) -> SyncJobs {
        let urls = &config.providers;
        let tcmb = Arc::new(
            Tcmb::with_url(client.clone(), &urls.tcmb)
                .with_retries(config.http.max_retries, config.http.retry_delay),
        );
        let evds = Arc::new(Evds::with_base_url(
            client.clone(),
            &urls.evds,
            config.evds_api_key.clone(),
        ));
        let fred = Arc::new(Fred::with_base_url(
            client.clone(),
            &urls.fred,
            config.fred_api_key.clone(),
        ));
        let tuik = Arc::new(Tuik::with_base_url(client.clone(), &urls.tuik));
        let tefas = Arc::new(Tefas::with_base_url(client.clone(), &urls.tefas));
        let doviz = Arc::new(Doviz::with_url(client, &urls.doviz));
        SyncJobs {
            market: MarketSync::new(db.clone(), yahoo, tcmb.clone()),
            macro_data: MacroSync::new(db.clone(), tcmb, evds, fred, tuik),
            funds: FundSync::new(db.clone(), tefas),
            scraper: ScraperSync::new(db, doviz),
        }
    }

    /// Run the TCMB, FRED, dashboard and doviz.com jobs concurrently
    pub async fn sync_all(&self) -> SyncAllReport {
        info!("starting full sync");
        let (tcmb, fred, market, scraper) = futures::join!(
            self.macro_data.sync_tcmb(),
            self.macro_data.sync_fred_all(),
            self.market.fetch_dashboard(),
            self.scraper.run(),
        );
        SyncAllReport {
            tcmb: JobOutcome::from_result("TCMB", tcmb),
            fred: JobOutcome::from_result("FRED", fred),
            market: JobOutcome::from_result("market", market),
            scraper: JobOutcome::from_result("scraper", scraper),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Board, MarketDataHandler};
    use crate::memory_handler::InMemoryDB;
    use crate::providers::tests::DummyProvider;
    use crate::providers::{doviz, tcmb};

    #[tokio::test]
    async fn test_sync_all() {
        let mut server = mockito::Server::new_async().await;
        let _tcmb = server
            .mock("GET", "/kurlar/today.xml")
            .with_status(200)
            .with_body(tcmb::tests::BULLETIN)
            .create_async()
            .await;
        let _doviz = server
            .mock("GET", "/doviz")
            .with_status(200)
            .with_body(doviz::tests::PAGE)
            .create_async()
            .await;

        let mut config = Config::default();
        config.providers.tcmb = format!("{}/kurlar/today.xml", server.url());
        config.providers.doviz = format!("{}/doviz", server.url());
        let db = Arc::new(InMemoryDB::new());
        let jobs = SyncJobs::new(
            &config,
            db.clone(),
            Arc::new(DummyProvider::new()),
            reqwest::Client::new(),
        );

        let report = jobs.sync_all().await;
        assert!(report.tcmb.success);
        assert!(report.market.success);
        assert!(report.scraper.success);
        // no FRED key configured
        assert!(!report.fred.success);
        assert!(report.fred.error.unwrap().contains("FRED_API_KEY"));

        assert_eq!(db.get_market_snapshots(Board::TechStocks).await.unwrap().len(), 7);
        let commodities = db.get_market_snapshots(Board::Commodities).await.unwrap();
        assert!(commodities.iter().any(|s| s.symbol == "GRAM_ALTIN"));
    }
}
