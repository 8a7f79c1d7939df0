///! Implementation of in-memory data handler
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use crate::datatypes::{
    Alert, AlertTrigger, AnalysisRecord, Asset, Board, DataError, EconomicIndicator, EconomicValue,
    FundPrice, HistoricalPrice, Holding, MacroObservation, MarketSnapshot, PriceTick,
};

pub mod analysis_handler;
pub mod macro_data_handler;
pub mod market_data_handler;
pub mod user_data_handler;

/// All tables, keyed by their unique keys so that an insert with an existing key replaces the row
#[derive(Default)]
struct Tables {
    assets: BTreeMap<String, Asset>,
    price_ticks: Vec<PriceTick>,
    historical_prices: BTreeMap<(String, NaiveDate), HistoricalPrice>,
    snapshots: BTreeMap<(Board, String, NaiveDate), MarketSnapshot>,
    fund_prices: BTreeMap<(String, NaiveDate), FundPrice>,
    macro_observations: BTreeMap<(String, String, NaiveDate), MacroObservation>,
    indicators: BTreeMap<String, EconomicIndicator>,
    economic_values: BTreeMap<(String, NaiveDate), EconomicValue>,
    holdings: BTreeMap<i32, Holding>,
    next_holding_id: i32,
    alerts: BTreeMap<i32, Alert>,
    next_alert_id: i32,
    /// Newest trigger per alert id
    last_triggers: BTreeMap<i32, AlertTrigger>,
    analyses: BTreeMap<i32, AnalysisRecord>,
    next_analysis_id: i32,
}

/// Struct to store data in memory, used when no database is configured and in tests
#[derive(Default)]
pub struct InMemoryDB {
    tables: RwLock<Tables>,
}

impl InMemoryDB {
    pub fn new() -> InMemoryDB {
        InMemoryDB::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DataError> {
        self.tables
            .read()
            .map_err(|e| DataError::DataAccessFailure(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, DataError> {
        self.tables
            .write()
            .map_err(|e| DataError::DataAccessFailure(e.to_string()))
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}
