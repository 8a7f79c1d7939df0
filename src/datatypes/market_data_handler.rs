use async_trait::async_trait;
///! Data handler trait for assets, prices and dashboard boards
use chrono::NaiveDate;

use super::{Asset, AssetType, Board, DataError, FundPrice, HistoricalPrice, MarketSnapshot, PriceTick};

/// Handler for market quotes and fund prices
#[async_trait]
pub trait MarketDataHandler: Send + Sync {
    /// Insert asset or replace the existing asset with the same symbol
    async fn upsert_asset(&self, asset: &Asset) -> Result<(), DataError>;
    async fn get_asset(&self, symbol: &str) -> Result<Option<Asset>, DataError>;
    /// Get all assets, optionally restricted to one asset type, ordered by symbol
    async fn get_assets(&self, asset_type: Option<AssetType>) -> Result<Vec<Asset>, DataError>;

    async fn insert_price_tick(&self, tick: &PriceTick) -> Result<(), DataError>;
    /// Get price ticks of a symbol, newest first
    async fn get_price_ticks(&self, symbol: &str, limit: usize) -> Result<Vec<PriceTick>, DataError>;

    /// Insert or replace daily prices keyed by symbol and date, returns number of rows written
    async fn upsert_historical_prices(&self, prices: &[HistoricalPrice]) -> Result<usize, DataError>;
    /// Daily prices of a symbol within the optional date range, ordered by date
    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPrice>, DataError>;

    async fn upsert_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), DataError>;
    /// Snapshots of a board, latest date first and then by symbol
    async fn get_market_snapshots(&self, board: Board) -> Result<Vec<MarketSnapshot>, DataError>;

    async fn upsert_fund_prices(&self, funds: &[FundPrice]) -> Result<usize, DataError>;
    /// Fund prices of the given date, or of the most recent date available
    async fn get_fund_prices(&self, date: Option<NaiveDate>) -> Result<Vec<FundPrice>, DataError>;
}
