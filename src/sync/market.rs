//! Quotes of stocks, indices, commodities, currencies and crypto assets
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;

use super::SyncError;
use crate::datatypes::date_time_helper::today_in_istanbul;
use crate::datatypes::{Asset, AssetType, Board, DataHandler, MarketSnapshot, PriceTick};
use crate::providers::tcmb::Tcmb;
use crate::providers::{
    update_quote_history, DataSource, HistoryRange, MarketQuoteProvider, ProviderError, QuoteSnapshot,
};

pub const BIST_STOCKS: [&str; 5] = ["THYAO.IS", "GARAN.IS", "AKBNK.IS", "EREGL.IS", "TCELL.IS"];
pub const CRYPTO_ASSETS: [&str; 3] = ["BTC-USD", "ETH-USD", "BNB-USD"];
pub const BIST_INDICES: [&str; 5] = ["XU100.IS", "XU030.IS", "XU050.IS", "XUSIN.IS", "XUBANK.IS"];

pub const DASHBOARD_INDICES: [&str; 5] = ["XU100.IS", "XU030.IS", "^GSPC", "^DJI", "^IXIC"];
pub const TECH_STOCKS: [&str; 7] = ["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "TSLA", "META"];
pub const COMMODITIES: [&str; 4] = ["GC=F", "SI=F", "CL=F", "NG=F"];
/// Symbols whose last month of history is loaded with the dashboard
pub const INITIAL_HISTORY: [&str; 3] = ["XU100.IS", "^GSPC", "GC=F"];

/// Currencies served as assets, quoted in TRY by TCMB
const FX_ASSETS: [(&str, &str); 3] = [
    ("USD", "Amerikan Doları"),
    ("EUR", "Euro"),
    ("GBP", "İngiliz Sterlini"),
];

fn commodity_name(symbol: &str) -> Option<&'static str> {
    match symbol {
        "GC=F" => Some("Altın"),
        "SI=F" => Some("Gümüş"),
        "CL=F" => Some("Ham Petrol"),
        "NG=F" => Some("Doğal Gaz"),
        _ => None,
    }
}

/// Symbol without exchange suffix or index marker, e.g. `XU100` for `XU100.IS`
fn short_name(symbol: &str) -> String {
    symbol.trim_end_matches(".IS").trim_start_matches('^').to_string()
}

fn board_name(board: Board, symbol: &str) -> String {
    match board {
        Board::Indices => short_name(symbol),
        Board::TechStocks => symbol.to_string(),
        Board::Commodities => commodity_name(symbol)
            .map(str::to_string)
            .unwrap_or_else(|| symbol.to_string()),
    }
}

fn default_symbols(asset_type: AssetType) -> Vec<String> {
    let symbols: &[&str] = match asset_type {
        AssetType::Bist => &BIST_STOCKS,
        AssetType::Crypto => &CRYPTO_ASSETS,
        AssetType::Metal => &["GC=F", "SI=F"],
        AssetType::Index => &BIST_INDICES,
        _ => &[],
    };
    symbols.iter().map(|s| s.to_string()).collect()
}

fn asset_from_quote(quote: &QuoteSnapshot, asset_type: AssetType) -> Asset {
    let (name, exchange) = match asset_type {
        AssetType::Bist => (short_name(&quote.symbol), "BIST"),
        AssetType::Index if quote.symbol.ends_with(".IS") => (short_name(&quote.symbol), "BIST"),
        AssetType::Crypto => (quote.symbol.clone(), "Crypto"),
        AssetType::Metal => (
            commodity_name(&quote.symbol)
                .map(str::to_string)
                .unwrap_or_else(|| quote.symbol.clone()),
            "Commodity",
        ),
        _ => (quote.symbol.clone(), "Global"),
    };
    Asset {
        symbol: quote.symbol.clone(),
        name,
        asset_type,
        exchange: exchange.to_string(),
        currency: quote.currency.clone(),
        price: quote.price,
        previous_close: Some(quote.previous_close),
        change_value: Some(quote.change),
        change_percent: Some(quote.change_percent),
        volume: quote.volume,
        market_cap: quote.market_cap,
        day_high: Some(quote.day_high),
        day_low: Some(quote.day_low),
        last_updated: quote.timestamp,
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetFetchReport {
    pub count: usize,
    pub assets: Vec<Asset>,
    /// Symbols that could not be fetched or stored
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardCounts {
    pub indices: usize,
    pub tech_stocks: usize,
    pub commodities: usize,
    pub historical: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub date: NaiveDate,
    pub counts: DashboardCounts,
}

pub struct MarketSync {
    db: Arc<dyn DataHandler>,
    yahoo: Arc<dyn MarketQuoteProvider>,
    tcmb: Arc<Tcmb>,
}

impl MarketSync {
    pub fn new(db: Arc<dyn DataHandler>, yahoo: Arc<dyn MarketQuoteProvider>, tcmb: Arc<Tcmb>) -> Self {
        MarketSync { db, yahoo, tcmb }
    }

    /// Latest quotes of all symbols, failures are logged and left out
    async fn quotes(&self, symbols: &[String]) -> (Vec<QuoteSnapshot>, Vec<String>) {
        let results = join_all(symbols.iter().map(|s| self.yahoo.fetch_latest_quote(s))).await;
        let mut quotes = Vec::new();
        let mut failed = Vec::new();
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(err) => {
                    warn!("fetching quote of {} failed: {}", symbol, err);
                    failed.push(symbol.clone());
                }
            }
        }
        (quotes, failed)
    }

    async fn store_asset(&self, asset: &Asset) -> Result<(), SyncError> {
        self.db.upsert_asset(asset).await?;
        self.db
            .insert_price_tick(&PriceTick {
                symbol: asset.symbol.clone(),
                price: asset.price,
                volume: asset.volume,
                timestamp: asset.last_updated,
                source: DataSource::Yahoo.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn fetch_currencies(&self) -> Result<AssetFetchReport, SyncError> {
        let bulletin = self.tcmb.fetch_bulletin().await?;
        let mut report = AssetFetchReport::default();
        for (code, name) in FX_ASSETS {
            let price = match bulletin.selling_rate(code) {
                Some(price) => price,
                None => {
                    warn!("TCMB bulletin has no rate for {}", code);
                    report.failed.push(code.to_string());
                    continue;
                }
            };
            let asset = Asset {
                symbol: format!("{}/TRY", code),
                name: name.to_string(),
                asset_type: AssetType::Currency,
                exchange: "TCMB".to_string(),
                currency: "TRY".to_string(),
                price,
                previous_close: None,
                change_value: None,
                change_percent: None,
                volume: None,
                market_cap: None,
                day_high: None,
                day_low: None,
                last_updated: Utc::now(),
            };
            match self.db.upsert_asset(&asset).await {
                Ok(()) => report.assets.push(asset),
                Err(err) => {
                    warn!("storing {} failed: {}", asset.symbol, err);
                    report.failed.push(asset.symbol);
                }
            }
        }
        report.count = report.assets.len();
        Ok(report)
    }

    /// Fetch and store the latest quotes of an asset class. Without symbols a default
    /// selection is used; currencies always come from the TCMB bulletin.
    pub async fn fetch_assets(
        &self,
        asset_type: AssetType,
        symbols: Option<Vec<String>>,
    ) -> Result<AssetFetchReport, SyncError> {
        if asset_type == AssetType::Currency {
            return self.fetch_currencies().await;
        }
        let symbols = symbols
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_symbols(asset_type));
        if symbols.is_empty() {
            debug!("no symbols to fetch for {}", asset_type);
            return Ok(AssetFetchReport::default());
        }

        let (quotes, mut failed) = self.quotes(&symbols).await;
        let mut assets = Vec::with_capacity(quotes.len());
        for quote in &quotes {
            let asset = asset_from_quote(quote, asset_type);
            match self.store_asset(&asset).await {
                Ok(()) => assets.push(asset),
                Err(err) => {
                    warn!("storing {} failed: {}", asset.symbol, err);
                    failed.push(asset.symbol);
                }
            }
        }
        info!("fetched {} {} assets", assets.len(), asset_type);
        Ok(AssetFetchReport {
            count: assets.len(),
            assets,
            failed,
        })
    }

    /// Store the latest quotes of `symbols` as snapshots of `board`, returns the number stored
    async fn update_board(&self, board: Board, symbols: &[&str], date: NaiveDate) -> usize {
        let symbols: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
        let (quotes, _) = self.quotes(&symbols).await;
        let mut count = 0;
        for quote in quotes {
            let snapshot = MarketSnapshot {
                board,
                name: board_name(board, &quote.symbol),
                symbol: quote.symbol,
                close_price: quote.price,
                change_value: Some(quote.change),
                change_percent: Some(quote.change_percent),
                day_high: Some(quote.day_high),
                day_low: Some(quote.day_low),
                volume: quote.volume,
                data_date: date,
                source: DataSource::Yahoo.to_string(),
            };
            match self.db.upsert_market_snapshot(&snapshot).await {
                Ok(()) => count += 1,
                Err(err) => warn!("storing {} snapshot of {} failed: {}", board, snapshot.symbol, err),
            }
        }
        count
    }

    /// Refresh the index, tech stock and commodity boards and load a month of
    /// history for the main symbols
    pub async fn fetch_dashboard(&self) -> Result<DashboardReport, SyncError> {
        let date = today_in_istanbul();
        let (indices, tech_stocks, commodities) = futures::join!(
            self.update_board(Board::Indices, &DASHBOARD_INDICES, date),
            self.update_board(Board::TechStocks, &TECH_STOCKS, date),
            self.update_board(Board::Commodities, &COMMODITIES, date),
        );
        let mut historical = 0;
        for symbol in INITIAL_HISTORY {
            match self.fetch_history(symbol, HistoryRange::OneMonth).await {
                Ok(_) => historical += 1,
                Err(err) => warn!("initial history of {} failed: {}", symbol, err),
            }
        }
        let counts = DashboardCounts {
            indices,
            tech_stocks,
            commodities,
            historical,
        };
        info!("dashboard updated: {:?}", counts);
        Ok(DashboardReport { date, counts })
    }

    /// Fetch daily history of a symbol and store it, returns the number of rows
    pub async fn fetch_history(&self, symbol: &str, range: HistoryRange) -> Result<usize, SyncError> {
        let prices = update_quote_history(self.yahoo.as_ref(), symbol, range, self.db.as_ref()).await?;
        if prices.is_empty() {
            return Err(ProviderError::NotFound(symbol.to_string()).into());
        }
        Ok(prices.len())
    }

    /// Quotes of the BIST indices, stored as assets and on the index board
    pub async fn fetch_bist_indices(
        &self,
        symbols: Option<Vec<String>>,
    ) -> Result<AssetFetchReport, SyncError> {
        let report = self.fetch_assets(AssetType::Index, symbols).await?;
        let date = today_in_istanbul();
        for asset in &report.assets {
            let snapshot = MarketSnapshot {
                board: Board::Indices,
                symbol: asset.symbol.clone(),
                name: short_name(&asset.symbol),
                close_price: asset.price,
                change_value: asset.change_value,
                change_percent: asset.change_percent,
                day_high: asset.day_high,
                day_low: asset.day_low,
                volume: asset.volume,
                data_date: date,
                source: DataSource::Yahoo.to_string(),
            };
            if let Err(err) = self.db.upsert_market_snapshot(&snapshot).await {
                warn!("storing index snapshot of {} failed: {}", asset.symbol, err);
            }
        }
        Ok(report)
    }

    /// Stored daily history of a symbol as CSV with a header line
    pub async fn history_csv(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<String, SyncError> {
        let prices = self.db.get_historical_prices(symbol, start, end).await?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["symbol", "date", "price", "volume"])?;
        for price in &prices {
            writer.write_record([
                price.symbol.clone(),
                price.data_date.to_string(),
                price.price.to_string(),
                price.volume.to_string(),
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| SyncError::Export(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| SyncError::Export(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{HistoricalPrice, MarketDataHandler};
    use crate::memory_handler::InMemoryDB;
    use crate::providers::tcmb::tests::BULLETIN;
    use crate::providers::tests::DummyProvider;

    fn market_sync(provider: DummyProvider, tcmb_url: &str) -> (Arc<InMemoryDB>, MarketSync) {
        let db = Arc::new(InMemoryDB::new());
        let tcmb = Tcmb::with_url(reqwest::Client::new(), tcmb_url)
            .with_retries(1, std::time::Duration::from_millis(1));
        let sync = MarketSync::new(db.clone(), Arc::new(provider), Arc::new(tcmb));
        (db, sync)
    }

    #[test]
    fn test_names() {
        assert_eq!(short_name("XU100.IS"), "XU100");
        assert_eq!(short_name("^GSPC"), "GSPC");
        assert_eq!(board_name(Board::Commodities, "NG=F"), "Doğal Gaz");
        assert_eq!(board_name(Board::TechStocks, "NVDA"), "NVDA");
    }

    #[tokio::test]
    async fn test_fetch_bist_assets() {
        let provider = DummyProvider::new()
            .with_series("THYAO.IS", vec![300.0, 312.5])
            .failing_for("EREGL.IS");
        let (db, sync) = market_sync(provider, "http://127.0.0.1:1/unused");
        let report = sync.fetch_assets(AssetType::Bist, None).await.unwrap();
        assert_eq!(report.count, 4);
        assert_eq!(report.failed, vec!["EREGL.IS".to_string()]);

        let thy = db.get_asset("THYAO.IS").await.unwrap().unwrap();
        assert_eq!(thy.name, "THYAO");
        assert_eq!(thy.exchange, "BIST");
        assert_eq!(thy.price, 312.5);
        assert_fuzzy_eq!(thy.change_percent.unwrap(), 12.5 / 3.0, 1e-9);
        let ticks = db.get_price_ticks("THYAO.IS", 10).await.unwrap();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].source, "yahoo-finance");

        // a second fetch replaces the asset but appends another tick
        sync.fetch_assets(AssetType::Bist, Some(vec!["THYAO.IS".to_string()]))
            .await
            .unwrap();
        assert_eq!(db.get_assets(Some(AssetType::Bist)).await.unwrap().len(), 4);
        assert_eq!(db.get_price_ticks("THYAO.IS", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_currencies() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/today.xml")
            .with_status(200)
            .with_body(BULLETIN)
            .create_async()
            .await;
        let (db, sync) = market_sync(DummyProvider::new(), &format!("{}/today.xml", server.url()));
        let report = sync.fetch_assets(AssetType::Currency, None).await.unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(report.failed, vec!["GBP".to_string()]);
        let usd = db.get_asset("USD/TRY").await.unwrap().unwrap();
        assert_eq!(usd.price, 41.8799);
        assert_eq!(usd.exchange, "TCMB");
    }

    #[tokio::test]
    async fn test_fetch_dashboard() {
        let provider = DummyProvider::new().failing_for("^DJI");
        let (db, sync) = market_sync(provider, "http://127.0.0.1:1/unused");
        let report = sync.fetch_dashboard().await.unwrap();
        assert_eq!(
            report.counts,
            DashboardCounts {
                indices: 4,
                tech_stocks: 7,
                commodities: 4,
                historical: 3,
            }
        );
        let indices = db.get_market_snapshots(Board::Indices).await.unwrap();
        assert!(indices.iter().any(|s| s.symbol == "^GSPC" && s.name == "GSPC"));
        let history = db.get_historical_prices("GC=F", None, None).await.unwrap();
        assert_eq!(history.len(), 22);

        // same day again does not duplicate snapshots
        sync.fetch_dashboard().await.unwrap();
        assert_eq!(db.get_market_snapshots(Board::Indices).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_bist_indices() {
        let (db, sync) = market_sync(DummyProvider::new(), "http://127.0.0.1:1/unused");
        let report = sync.fetch_bist_indices(None).await.unwrap();
        assert_eq!(report.count, 5);
        let asset = db.get_asset("XUBANK.IS").await.unwrap().unwrap();
        assert_eq!(asset.asset_type, AssetType::Index);
        assert_eq!(asset.name, "XUBANK");
        assert_eq!(db.get_market_snapshots(Board::Indices).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_history_csv() {
        let (db, sync) = market_sync(DummyProvider::new(), "http://127.0.0.1:1/unused");
        let day = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap();
        let prices: Vec<HistoricalPrice> = (0..3)
            .map(|i| HistoricalPrice {
                symbol: "GC=F".to_string(),
                data_date: day + chrono::Duration::days(i),
                price: 4200.5 + i as f64,
                volume: 10.0,
            })
            .collect();
        db.upsert_historical_prices(&prices).await.unwrap();
        let csv = sync
            .history_csv("GC=F", Some(day + chrono::Duration::days(1)), None)
            .await
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "symbol,date,price,volume");
        assert_eq!(lines[1], "GC=F,2025-10-17,4201.5,10");

        assert_eq!(sync.fetch_history("NEW", HistoryRange::Days(30)).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_fetch_history_of_intraday_range() {
        let closes: Vec<f64> = (0..35).map(|i| 50.0 + i as f64).collect();
        let provider = DummyProvider::new().with_series("ASELS.IS", closes);
        let (db, sync) = market_sync(provider, "http://127.0.0.1:1/today.xml");
        let count = sync
            .fetch_history("ASELS.IS", HistoryRange::FiveDays)
            .await
            .unwrap();
        assert_eq!(count, 5);
        let stored = db.get_historical_prices("ASELS.IS", None, None).await.unwrap();
        assert_eq!(stored.len(), 5);
        assert!(stored.iter().any(|row| row.price == 84.0));
        assert!(stored.iter().all(|row| row.volume == 700.0));
    }
}
