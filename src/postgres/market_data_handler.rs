///! PostgreSQL implementation of the market data handler
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{invalid, read_failed, PostgresDB};
use crate::datatypes::{
    Asset, AssetType, Board, DataError, FundPrice, FundType, HistoricalPrice, MarketDataHandler,
    MarketSnapshot, PriceTick,
};

fn asset_from_row(row: &PgRow) -> Result<Asset, sqlx::Error> {
    let asset_type: String = row.try_get("asset_type")?;
    Ok(Asset {
        symbol: row.try_get("symbol")?,
        name: row.try_get("name")?,
        asset_type: AssetType::from_str(&asset_type).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        exchange: row.try_get("exchange")?,
        currency: row.try_get("currency")?,
        price: row.try_get("price")?,
        previous_close: row.try_get("previous_close")?,
        change_value: row.try_get("change_value")?,
        change_percent: row.try_get("change_percent")?,
        volume: row.try_get("volume")?,
        market_cap: row.try_get("market_cap")?,
        day_high: row.try_get("day_high")?,
        day_low: row.try_get("day_low")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn snapshot_from_row(row: &PgRow) -> Result<MarketSnapshot, sqlx::Error> {
    let board: String = row.try_get("board")?;
    Ok(MarketSnapshot {
        board: Board::from_str(&board).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        symbol: row.try_get("symbol")?,
        name: row.try_get("name")?,
        close_price: row.try_get("close_price")?,
        change_value: row.try_get("change_value")?,
        change_percent: row.try_get("change_percent")?,
        day_high: row.try_get("day_high")?,
        day_low: row.try_get("day_low")?,
        volume: row.try_get("volume")?,
        data_date: row.try_get("data_date")?,
        source: row.try_get("source")?,
    })
}

fn fund_from_row(row: &PgRow) -> Result<FundPrice, sqlx::Error> {
    let fund_type: String = row.try_get("fund_type")?;
    Ok(FundPrice {
        fund_code: row.try_get("fund_code")?,
        fund_name: row.try_get("fund_name")?,
        fund_type: FundType::from_str(&fund_type).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        category: row.try_get("category")?,
        data_date: row.try_get("data_date")?,
        price: row.try_get("price")?,
        share_count: row.try_get("share_count")?,
        investor_count: row.try_get("investor_count")?,
        portfolio_size: row.try_get("portfolio_size")?,
    })
}

#[async_trait]
impl MarketDataHandler for PostgresDB {
    async fn upsert_asset(&self, asset: &Asset) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO assets (symbol, name, asset_type, exchange, currency, price, previous_close,
                change_value, change_percent, volume, market_cap, day_high, day_low, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (symbol) DO UPDATE SET
                name = EXCLUDED.name,
                asset_type = EXCLUDED.asset_type,
                exchange = EXCLUDED.exchange,
                currency = EXCLUDED.currency,
                price = EXCLUDED.price,
                previous_close = EXCLUDED.previous_close,
                change_value = EXCLUDED.change_value,
                change_percent = EXCLUDED.change_percent,
                volume = EXCLUDED.volume,
                market_cap = EXCLUDED.market_cap,
                day_high = EXCLUDED.day_high,
                day_low = EXCLUDED.day_low,
                last_updated = EXCLUDED.last_updated",
        )
        .bind(&asset.symbol)
        .bind(&asset.name)
        .bind(asset.asset_type.as_str())
        .bind(&asset.exchange)
        .bind(&asset.currency)
        .bind(asset.price)
        .bind(asset.previous_close)
        .bind(asset.change_value)
        .bind(asset.change_percent)
        .bind(asset.volume)
        .bind(asset.market_cap)
        .bind(asset.day_high)
        .bind(asset.day_low)
        .bind(asset.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_asset(&self, symbol: &str) -> Result<Option<Asset>, DataError> {
        let row = sqlx::query("SELECT * FROM assets WHERE symbol = $1")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_failed)?;
        row.map(|row| asset_from_row(&row)).transpose().map_err(invalid)
    }

    async fn get_assets(&self, asset_type: Option<AssetType>) -> Result<Vec<Asset>, DataError> {
        let rows = sqlx::query(
            "SELECT * FROM assets WHERE ($1::TEXT IS NULL OR asset_type = $1) ORDER BY symbol",
        )
        .bind(asset_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        rows.iter()
            .map(asset_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)
    }

    async fn insert_price_tick(&self, tick: &PriceTick) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO price_history (symbol, price, volume, timestamp, source)
            VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&tick.symbol)
        .bind(tick.price)
        .bind(tick.volume)
        .bind(tick.timestamp)
        .bind(&tick.source)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_price_ticks(&self, symbol: &str, limit: usize) -> Result<Vec<PriceTick>, DataError> {
        let rows = sqlx::query(
            "SELECT symbol, price, volume, timestamp, source FROM price_history
            WHERE symbol = $1 ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        let mut ticks = Vec::new();
        for row in rows {
            ticks.push(PriceTick {
                symbol: row.try_get("symbol").map_err(invalid)?,
                price: row.try_get("price").map_err(invalid)?,
                volume: row.try_get("volume").map_err(invalid)?,
                timestamp: row.try_get("timestamp").map_err(invalid)?,
                source: row.try_get("source").map_err(invalid)?,
            });
        }
        Ok(ticks)
    }

    async fn upsert_historical_prices(&self, prices: &[HistoricalPrice]) -> Result<usize, DataError> {
        let mut tx = self.pool.begin().await.map_err(read_failed)?;
        for price in prices {
            sqlx::query(
                "INSERT INTO historical_data (symbol, data_date, price, volume)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (symbol, data_date) DO UPDATE SET
                    price = EXCLUDED.price,
                    volume = EXCLUDED.volume",
            )
            .bind(&price.symbol)
            .bind(price.data_date)
            .bind(price.price)
            .bind(price.volume)
            .execute(&mut *tx)
            .await
            .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(prices.len())
    }

    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPrice>, DataError> {
        let rows = sqlx::query(
            "SELECT symbol, data_date, price, volume FROM historical_data
            WHERE symbol = $1
                AND ($2::DATE IS NULL OR data_date >= $2)
                AND ($3::DATE IS NULL OR data_date <= $3)
            ORDER BY data_date",
        )
        .bind(symbol)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        let mut prices = Vec::new();
        for row in rows {
            prices.push(HistoricalPrice {
                symbol: row.try_get("symbol").map_err(invalid)?,
                data_date: row.try_get("data_date").map_err(invalid)?,
                price: row.try_get("price").map_err(invalid)?,
                volume: row.try_get("volume").map_err(invalid)?,
            });
        }
        Ok(prices)
    }

    async fn upsert_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO market_snapshots (board, symbol, name, close_price, change_value,
                change_percent, day_high, day_low, volume, data_date, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (board, symbol, data_date) DO UPDATE SET
                name = EXCLUDED.name,
                close_price = EXCLUDED.close_price,
                change_value = EXCLUDED.change_value,
                change_percent = EXCLUDED.change_percent,
                day_high = EXCLUDED.day_high,
                day_low = EXCLUDED.day_low,
                volume = EXCLUDED.volume,
                source = EXCLUDED.source",
        )
        .bind(snapshot.board.as_str())
        .bind(&snapshot.symbol)
        .bind(&snapshot.name)
        .bind(snapshot.close_price)
        .bind(snapshot.change_value)
        .bind(snapshot.change_percent)
        .bind(snapshot.day_high)
        .bind(snapshot.day_low)
        .bind(snapshot.volume)
        .bind(snapshot.data_date)
        .bind(&snapshot.source)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_market_snapshots(&self, board: Board) -> Result<Vec<MarketSnapshot>, DataError> {
        let rows = sqlx::query(
            "SELECT * FROM market_snapshots WHERE board = $1 ORDER BY data_date DESC, symbol",
        )
        .bind(board.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        rows.iter()
            .map(snapshot_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)
    }

    async fn upsert_fund_prices(&self, funds: &[FundPrice]) -> Result<usize, DataError> {
        let mut tx = self.pool.begin().await.map_err(read_failed)?;
        for fund in funds {
            sqlx::query(
                "INSERT INTO fund_prices (fund_code, fund_name, fund_type, category, data_date,
                    price, share_count, investor_count, portfolio_size)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (fund_code, data_date) DO UPDATE SET
                    fund_name = EXCLUDED.fund_name,
                    fund_type = EXCLUDED.fund_type,
                    category = EXCLUDED.category,
                    price = EXCLUDED.price,
                    share_count = EXCLUDED.share_count,
                    investor_count = EXCLUDED.investor_count,
                    portfolio_size = EXCLUDED.portfolio_size",
            )
            .bind(&fund.fund_code)
            .bind(&fund.fund_name)
            .bind(fund.fund_type.code())
            .bind(&fund.category)
            .bind(fund.data_date)
            .bind(fund.price)
            .bind(fund.share_count)
            .bind(fund.investor_count)
            .bind(fund.portfolio_size)
            .execute(&mut *tx)
            .await
            .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| DataError::InsertFailed(e.to_string()))?;
        Ok(funds.len())
    }

    async fn get_fund_prices(&self, date: Option<NaiveDate>) -> Result<Vec<FundPrice>, DataError> {
        let rows = sqlx::query(
            "SELECT * FROM fund_prices
            WHERE data_date = COALESCE($1::DATE, (SELECT MAX(data_date) FROM fund_prices))
            ORDER BY fund_code",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(read_failed)?;
        rows.iter()
            .map(fund_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)
    }
}
