///! Implementation of PostgreSQL data handler
use sqlx::postgres::{PgPoolOptions, Postgres};

use crate::datatypes::DataError;

pub mod analysis_handler;
pub mod macro_data_handler;
pub mod market_data_handler;
pub mod user_data_handler;

/// Struct to handle connections to postgres databases
pub struct PostgresDB {
    /// pool is made public to allow extending this struct outside of the library
    pub pool: sqlx::Pool<Postgres>,
}

const TABLES: [&str; 12] = [
    "analysis_results",
    "alert_triggers",
    "user_alerts",
    "portfolio_holdings",
    "economic_data",
    "turkey_economics",
    "macro_data",
    "fund_prices",
    "market_snapshots",
    "historical_data",
    "price_history",
    "assets",
];

const SCHEMA: [&str; 12] = [
    "CREATE TABLE IF NOT EXISTS assets (
        symbol TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        asset_type TEXT NOT NULL,
        exchange TEXT NOT NULL,
        currency TEXT NOT NULL,
        price FLOAT8 NOT NULL,
        previous_close FLOAT8,
        change_value FLOAT8,
        change_percent FLOAT8,
        volume FLOAT8,
        market_cap FLOAT8,
        day_high FLOAT8,
        day_low FLOAT8,
        last_updated TIMESTAMP WITH TIME ZONE NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS price_history (
        id SERIAL PRIMARY KEY,
        symbol TEXT NOT NULL,
        price FLOAT8 NOT NULL,
        volume FLOAT8,
        timestamp TIMESTAMP WITH TIME ZONE NOT NULL,
        source TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS historical_data (
        symbol TEXT NOT NULL,
        data_date DATE NOT NULL,
        price FLOAT8 NOT NULL,
        volume FLOAT8 NOT NULL DEFAULT 0,
        UNIQUE (symbol, data_date)
    )",
    "CREATE TABLE IF NOT EXISTS market_snapshots (
        board TEXT NOT NULL,
        symbol TEXT NOT NULL,
        name TEXT NOT NULL,
        close_price FLOAT8 NOT NULL,
        change_value FLOAT8,
        change_percent FLOAT8,
        day_high FLOAT8,
        day_low FLOAT8,
        volume FLOAT8,
        data_date DATE NOT NULL,
        source TEXT NOT NULL,
        UNIQUE (board, symbol, data_date)
    )",
    "CREATE TABLE IF NOT EXISTS fund_prices (
        fund_code TEXT NOT NULL,
        fund_name TEXT NOT NULL,
        fund_type TEXT NOT NULL,
        category TEXT NOT NULL,
        data_date DATE NOT NULL,
        price FLOAT8 NOT NULL,
        share_count FLOAT8,
        investor_count FLOAT8,
        portfolio_size FLOAT8,
        UNIQUE (fund_code, data_date)
    )",
    "CREATE TABLE IF NOT EXISTS macro_data (
        country TEXT NOT NULL,
        indicator TEXT NOT NULL,
        value FLOAT8 NOT NULL,
        unit TEXT NOT NULL,
        date DATE NOT NULL,
        source TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}',
        UNIQUE (country, indicator, date)
    )",
    "CREATE TABLE IF NOT EXISTS turkey_economics (
        indicator_code TEXT PRIMARY KEY,
        indicator_name TEXT NOT NULL,
        category TEXT NOT NULL,
        current_value FLOAT8 NOT NULL,
        previous_value FLOAT8,
        change_percent FLOAT8,
        period_date DATE NOT NULL,
        unit TEXT NOT NULL,
        source TEXT NOT NULL,
        last_updated TIMESTAMP WITH TIME ZONE NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS economic_data (
        indicator_code TEXT NOT NULL,
        period_date DATE NOT NULL,
        value FLOAT8 NOT NULL,
        source TEXT NOT NULL,
        UNIQUE (indicator_code, period_date)
    )",
    "CREATE TABLE IF NOT EXISTS portfolio_holdings (
        id SERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        portfolio_id TEXT,
        symbol TEXT NOT NULL,
        asset_type TEXT,
        quantity FLOAT8 NOT NULL,
        average_price FLOAT8 NOT NULL,
        current_price FLOAT8,
        current_value FLOAT8,
        gain_loss_percent FLOAT8
    )",
    "CREATE TABLE IF NOT EXISTS user_alerts (
        id SERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        symbol TEXT NOT NULL,
        alert_type TEXT NOT NULL,
        condition TEXT NOT NULL,
        threshold FLOAT8 NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        notification_methods TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL,
        triggered_at TIMESTAMP WITH TIME ZONE
    )",
    "CREATE TABLE IF NOT EXISTS alert_triggers (
        id SERIAL PRIMARY KEY,
        alert_id INTEGER NOT NULL REFERENCES user_alerts(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        symbol TEXT NOT NULL,
        trigger_value FLOAT8 NOT NULL,
        current_price FLOAT8 NOT NULL,
        triggered_at TIMESTAMP WITH TIME ZONE NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS analysis_results (
        id SERIAL PRIMARY KEY,
        kind TEXT NOT NULL,
        symbol TEXT NOT NULL,
        score FLOAT8,
        label TEXT,
        payload JSONB NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL
    )",
];

impl PostgresDB {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<PostgresDB, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;
        Ok(PostgresDB { pool })
    }

    /// Clean database by dropping all tables and than run init
    pub async fn clean(&self) -> Result<(), sqlx::Error> {
        for table in TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                .execute(&self.pool)
                .await?;
        }
        self.init().await
    }

    /// Initialize new database by creating tables
    pub async fn init(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn read_failed(e: sqlx::Error) -> DataError {
    DataError::DataAccessFailure(e.to_string())
}

fn invalid<E: std::fmt::Display>(e: E) -> DataError {
    DataError::InvalidData(e.to_string())
}
