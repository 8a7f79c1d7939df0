use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ParseEnumError;

/// Broad classes of tradable assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Stock,
    Bist,
    Crypto,
    Currency,
    Metal,
    Fund,
    Index,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Bist => "bist",
            Self::Crypto => "crypto",
            Self::Currency => "currency",
            Self::Metal => "metal",
            Self::Fund => "fund",
            Self::Index => "index",
        }
    }
}

impl FromStr for AssetType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stock" => Ok(Self::Stock),
            "bist" => Ok(Self::Bist),
            "crypto" => Ok(Self::Crypto),
            "currency" => Ok(Self::Currency),
            "metal" => Ok(Self::Metal),
            "fund" | "tefas" => Ok(Self::Fund),
            "index" => Ok(Self::Index),
            _ => Err(ParseEnumError::new("asset type", s)),
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latest known state of an asset, unique by symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub name: String,
    pub asset_type: AssetType,
    pub exchange: String,
    pub currency: String,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub change_value: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// A single observed price, stored append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
    pub volume: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Daily closing price, unique by symbol and date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPrice {
    pub symbol: String,
    pub data_date: NaiveDate,
    pub price: f64,
    pub volume: f64,
}

/// Dashboard boards market snapshots are grouped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Board {
    Indices,
    TechStocks,
    Commodities,
}

impl Board {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indices => "indices",
            Self::TechStocks => "tech_stocks",
            Self::Commodities => "commodities",
        }
    }
}

impl FromStr for Board {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indices" | "market_indices" => Ok(Self::Indices),
            "tech_stocks" | "tech" => Ok(Self::TechStocks),
            "commodities" => Ok(Self::Commodities),
            _ => Err(ParseEnumError::new("board", s)),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Daily quote of an index, stock or commodity shown on one of the dashboard boards.
/// Unique by board, symbol and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub board: Board,
    pub symbol: String,
    pub name: String,
    pub close_price: f64,
    pub change_value: Option<f64>,
    pub change_percent: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub volume: Option<f64>,
    pub data_date: NaiveDate,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_from_str() {
        assert_eq!(AssetType::from_str("BIST").unwrap(), AssetType::Bist);
        assert_eq!(AssetType::from_str("tefas").unwrap(), AssetType::Fund);
        assert!(AssetType::from_str("bond").is_err());
        assert_eq!(AssetType::Metal.to_string(), "metal");
    }

    #[test]
    fn test_board_serializes_snake_case() {
        let json = serde_json::to_string(&Board::TechStocks).unwrap();
        assert_eq!(json, "\"tech_stocks\"");
        assert_eq!(Board::from_str("market_indices").unwrap(), Board::Indices);
    }
}
