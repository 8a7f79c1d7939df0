use async_trait::async_trait;
use chrono::NaiveDate;

use super::InMemoryDB;
use crate::datatypes::{
    Asset, AssetType, Board, DataError, FundPrice, HistoricalPrice, MarketDataHandler,
    MarketSnapshot, PriceTick,
};

#[async_trait]
impl MarketDataHandler for InMemoryDB {
    async fn upsert_asset(&self, asset: &Asset) -> Result<(), DataError> {
        let mut tables = self.write()?;
        tables.assets.insert(asset.symbol.clone(), asset.clone());
        Ok(())
    }

    async fn get_asset(&self, symbol: &str) -> Result<Option<Asset>, DataError> {
        Ok(self.read()?.assets.get(symbol).cloned())
    }

    async fn get_assets(&self, asset_type: Option<AssetType>) -> Result<Vec<Asset>, DataError> {
        let tables = self.read()?;
        Ok(tables
            .assets
            .values()
            .filter(|a| asset_type.map_or(true, |t| a.asset_type == t))
            .cloned()
            .collect())
    }

    async fn insert_price_tick(&self, tick: &PriceTick) -> Result<(), DataError> {
        self.write()?.price_ticks.push(tick.clone());
        Ok(())
    }

    async fn get_price_ticks(&self, symbol: &str, limit: usize) -> Result<Vec<PriceTick>, DataError> {
        let tables = self.read()?;
        let mut ticks: Vec<PriceTick> = tables
            .price_ticks
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect();
        ticks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        ticks.truncate(limit);
        Ok(ticks)
    }

    async fn upsert_historical_prices(&self, prices: &[HistoricalPrice]) -> Result<usize, DataError> {
        let mut tables = self.write()?;
        for price in prices {
            tables
                .historical_prices
                .insert((price.symbol.clone(), price.data_date), price.clone());
        }
        Ok(prices.len())
    }

    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPrice>, DataError> {
        let tables = self.read()?;
        Ok(tables
            .historical_prices
            .values()
            .filter(|p| p.symbol == symbol)
            .filter(|p| start.map_or(true, |d| p.data_date >= d))
            .filter(|p| end.map_or(true, |d| p.data_date <= d))
            .cloned()
            .collect())
    }

    async fn upsert_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), DataError> {
        let mut tables = self.write()?;
        tables.snapshots.insert(
            (snapshot.board, snapshot.symbol.clone(), snapshot.data_date),
            snapshot.clone(),
        );
        Ok(())
    }

    async fn get_market_snapshots(&self, board: Board) -> Result<Vec<MarketSnapshot>, DataError> {
        let tables = self.read()?;
        let mut snapshots: Vec<MarketSnapshot> = tables
            .snapshots
            .values()
            .filter(|s| s.board == board)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| {
            b.data_date
                .cmp(&a.data_date)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        Ok(snapshots)
    }

    async fn upsert_fund_prices(&self, funds: &[FundPrice]) -> Result<usize, DataError> {
        let mut tables = self.write()?;
        for fund in funds {
            tables
                .fund_prices
                .insert((fund.fund_code.clone(), fund.data_date), fund.clone());
        }
        Ok(funds.len())
    }

    async fn get_fund_prices(&self, date: Option<NaiveDate>) -> Result<Vec<FundPrice>, DataError> {
        let tables = self.read()?;
        let date = match date {
            Some(date) => date,
            None => match tables.fund_prices.values().map(|f| f.data_date).max() {
                Some(latest) => latest,
                None => return Ok(Vec::new()),
            },
        };
        Ok(tables
            .fund_prices
            .values()
            .filter(|f| f.data_date == date)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn asset(symbol: &str, price: f64) -> Asset {
        Asset {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            asset_type: AssetType::Bist,
            exchange: "BIST".to_string(),
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
        }
    }

    #[tokio::test]
    async fn test_upsert_asset_does_not_duplicate() {
        let db = InMemoryDB::new();
        db.upsert_asset(&asset("THYAO.IS", 300.0)).await.unwrap();
        db.upsert_asset(&asset("THYAO.IS", 310.0)).await.unwrap();
        db.upsert_asset(&asset("GARAN.IS", 120.0)).await.unwrap();
        let assets = db.get_assets(None).await.unwrap();
        assert_eq!(assets.len(), 2);
        let thy = db.get_asset("THYAO.IS").await.unwrap().unwrap();
        assert_eq!(thy.price, 310.0);
        assert!(db.get_asset("AKBNK.IS").await.unwrap().is_none());
        assert_eq!(db.get_assets(Some(AssetType::Crypto)).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_historical_prices_keyed_by_symbol_and_date() {
        let db = InMemoryDB::new();
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        let rows: Vec<HistoricalPrice> = (1..=5)
            .map(|d| HistoricalPrice {
                symbol: "GC=F".to_string(),
                data_date: day(d),
                price: 2000.0 + d as f64,
                volume: 0.0,
            })
            .collect();
        db.upsert_historical_prices(&rows).await.unwrap();
        db.upsert_historical_prices(&rows[..2]).await.unwrap();
        let all = db.get_historical_prices("GC=F", None, None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].data_date, day(1));
        let window = db
            .get_historical_prices("GC=F", Some(day(2)), Some(day(4)))
            .await
            .unwrap();
        assert_eq!(window.len(), 3);
    }

    #[tokio::test]
    async fn test_snapshots_latest_first() {
        let db = InMemoryDB::new();
        for (symbol, d) in [("XU100", 1), ("XU030", 2), ("XU100", 2)] {
            db.upsert_market_snapshot(&MarketSnapshot {
                board: Board::Indices,
                symbol: symbol.to_string(),
                name: symbol.to_string(),
                close_price: 100.0,
                change_value: None,
                change_percent: None,
                day_high: None,
                day_low: None,
                volume: None,
                data_date: NaiveDate::from_ymd_opt(2025, 3, d).unwrap(),
                source: "test".to_string(),
            })
            .await
            .unwrap();
        }
        let snapshots = db.get_market_snapshots(Board::Indices).await.unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].symbol, "XU030");
        assert_eq!(snapshots[2].symbol, "XU100");
        assert!(db
            .get_market_snapshots(Board::Commodities)
            .await
            .unwrap()
            .is_empty());
    }
}
