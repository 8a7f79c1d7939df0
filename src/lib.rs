//! # finpano
//!
//! Aggregation service for Turkish and global financial data. Quotes for stocks,
//! indices, commodities, currencies, crypto and mutual funds are pulled from
//! Yahoo Finance, TEFAS and doviz.com, macroeconomic indicators from TCMB (bulletins and EVDS), FRED
//! and TÜİK. Everything is persisted through the handler traits in [`datatypes`]
//! (PostgreSQL or in memory), analysed with the small statistics toolbox in
//! [`analytics`] and served as JSON by the axum based [`server`].
//!
//! The project is licensed under Apache 2.0 or MIT license at the option of the user.

// macro exports
#[macro_use]
pub mod macros;

// module exports
pub mod alerts;
pub mod analytics;
pub mod config;
pub mod datatypes;
pub mod memory_handler;
pub mod postgres;
pub mod providers;
pub mod scheduler;
pub mod server;
pub mod sync;

pub use config::Config;
pub use datatypes::{DataError, DataHandler};
