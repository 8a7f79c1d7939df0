///! Data types shared by all modules and the data handler traits to persist them
use thiserror::Error;

pub mod alert;
pub mod analysis;
pub mod analysis_handler;
pub mod asset;
pub mod date_time_helper;
pub mod fund;
pub mod macro_data;
pub mod macro_data_handler;
pub mod market_data_handler;
pub mod portfolio;
pub mod user_data_handler;

pub use alert::{Alert, AlertCondition, AlertTrigger, AlertType};
pub use analysis::{AnalysisKind, AnalysisRecord};
pub use analysis_handler::AnalysisHandler;
pub use asset::{Asset, AssetType, Board, HistoricalPrice, MarketSnapshot, PriceTick};
pub use fund::{FundPrice, FundType};
pub use macro_data::{EconomicIndicator, EconomicValue, MacroFilter, MacroObservation};
pub use macro_data_handler::MacroDataHandler;
pub use market_data_handler::MarketDataHandler;
pub use portfolio::Holding;
pub use user_data_handler::UserDataHandler;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("connection to database failed: {0}")]
    DataAccessFailure(String),
    #[error("could not find requested object in database: {0}")]
    NotFound(String),
    #[error("update of object in database failed: {0}")]
    UpdateFailed(String),
    #[error("removing object from database failed: {0}")]
    DeleteFailed(String),
    #[error("inserting object to database failed: {0}")]
    InsertFailed(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Everything a storage backend needs to offer to run the service
pub trait DataHandler:
    MarketDataHandler + MacroDataHandler + UserDataHandler + AnalysisHandler
{
}

impl<T> DataHandler for T where
    T: MarketDataHandler + MacroDataHandler + UserDataHandler + AnalysisHandler
{
}

/// Error raised if a textual enum representation is not known
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        ParseEnumError {
            kind,
            value: value.to_string(),
        }
    }
}
