//! Daily fund prices from TEFAS
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use serde::Serialize;

use super::SyncError;
use crate::datatypes::date_time_helper::today_in_istanbul;
use crate::datatypes::{Asset, AssetType, DataHandler, FundPrice, FundType};
use crate::providers::tefas::Tefas;

#[derive(Debug, Clone, Serialize)]
pub struct FundSyncReport {
    pub date: NaiveDate,
    pub fund_type: FundType,
    pub count: usize,
    /// Number of funds also stored as assets
    pub assets: usize,
}

fn fund_asset(fund: &FundPrice) -> Asset {
    Asset {
        symbol: fund.fund_code.clone(),
        name: fund.fund_name.clone(),
        asset_type: AssetType::Fund,
        exchange: "TEFAS".to_string(),
        currency: "TRY".to_string(),
        price: fund.price,
        previous_close: None,
        change_value: None,
        change_percent: None,
        volume: None,
        market_cap: fund.portfolio_size,
        day_high: None,
        day_low: None,
        last_updated: Utc::now(),
    }
}

pub struct FundSync {
    db: Arc<dyn DataHandler>,
    tefas: Arc<Tefas>,
}

impl FundSync {
    pub fn new(db: Arc<dyn DataHandler>, tefas: Arc<Tefas>) -> Self {
        FundSync { db, tefas }
    }

    /// Store the prices of all funds of a type at `date` (default today)
    /// and mirror every fund as an asset
    pub async fn sync_tefas(
        &self,
        date: Option<NaiveDate>,
        fund_type: FundType,
    ) -> Result<FundSyncReport, SyncError> {
        let date = date.unwrap_or_else(today_in_istanbul);
        let funds = self
            .tefas
            .fetch_fund_prices(date, date, fund_type, None)
            .await?;
        let count = self.db.upsert_fund_prices(&funds).await?;

        let mut assets = 0;
        for fund in &funds {
            match self.db.upsert_asset(&fund_asset(fund)).await {
                Ok(()) => assets += 1,
                Err(err) => warn!("storing fund {} as asset failed: {}", fund.fund_code, err),
            }
        }
        info!("stored {} {} fund prices of {}", count, fund_type, date);
        Ok(FundSyncReport {
            date,
            fund_type,
            count,
            assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::MarketDataHandler;
    use crate::memory_handler::InMemoryDB;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_sync_tefas() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/DB/BindHistoryInfo")
            .match_body(Matcher::UrlEncoded("fontip".into(), "EMK".into()))
            .with_status(200)
            .with_body(
                r#"{"data":[
                {"TARIH":1729123200000,"FONKODU":"AEA","FONUNVAN":"ANADOLU HAYAT EMEKLİLİK ALTIN FONU","FIYAT":"0,0456","PORTFOYBUYUKLUK":1250000.5},
                {"TARIH":1729123200000,"FONKODU":"AEH","FONUNVAN":"ANADOLU HAYAT EMEKLİLİK HİSSE SENEDİ FONU","FIYAT":0.0871}]}"#,
            )
            .create_async()
            .await;
        let db = Arc::new(InMemoryDB::new());
        let tefas = Tefas::with_base_url(reqwest::Client::new(), &server.url());
        let sync = FundSync::new(db.clone(), Arc::new(tefas));
        let day = NaiveDate::from_ymd_opt(2024, 10, 17).unwrap();

        let report = sync.sync_tefas(Some(day), FundType::Pension).await.unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(report.assets, 2);

        let prices = db.get_fund_prices(Some(day)).await.unwrap();
        let gold = prices.iter().find(|f| f.fund_code == "AEA").unwrap();
        assert_eq!(gold.price, 0.0456);
        assert_eq!(gold.category, "precious_metal");
        let asset = db.get_asset("AEH").await.unwrap().unwrap();
        assert_eq!(asset.asset_type, AssetType::Fund);
        assert_eq!(asset.exchange, "TEFAS");

        // same day again
        sync.sync_tefas(Some(day), FundType::Pension).await.unwrap();
        assert_eq!(db.get_fund_prices(Some(day)).await.unwrap().len(), 2);
    }
}
