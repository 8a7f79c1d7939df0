//! Quotes, history and dashboard boards
use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::response::CsvResponse;
use super::{optional_body, required, ApiResponse, ApiResult, AppState};
use crate::datatypes::{Asset, AssetType, Board, HistoricalPrice, MarketSnapshot};
use crate::providers::HistoryRange;
use crate::sync::{AssetFetchReport, DashboardReport};

const DEFAULT_PERIOD: &str = "1y";

#[derive(Debug, Default, Deserialize)]
pub struct FetchRequest {
    pub asset_type: Option<String>,
    pub symbols: Option<Vec<String>>,
}

pub async fn fetch(
    State(state): State<AppState>,
    body: Result<Json<FetchRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<AssetFetchReport>> {
    let request = optional_body(body)?;
    let asset_type = AssetType::from_str(&required(request.asset_type, "asset_type")?)?;
    let report = state
        .jobs
        .market
        .fetch_assets(asset_type, request.symbols)
        .await?;
    Ok(ApiResponse::success(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetQuery {
    pub asset_type: Option<String>,
}

pub async fn assets(
    State(state): State<AppState>,
    query: Result<Query<AssetQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Asset>>> {
    let Query(query) = query?;
    let asset_type = query
        .asset_type
        .filter(|t| !t.is_empty())
        .map(|t| AssetType::from_str(&t))
        .transpose()?;
    Ok(ApiResponse::success(state.db.get_assets(asset_type).await?))
}

pub async fn asset(
    State(state): State<AppState>,
    symbol: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<Option<Asset>>> {
    let Path(symbol) = symbol?;
    Ok(ApiResponse::success(state.db.get_asset(&symbol).await?))
}

pub async fn fetch_all(State(state): State<AppState>) -> ApiResult<ApiResponse<DashboardReport>> {
    Ok(ApiResponse::success(state.jobs.market.fetch_dashboard().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoricalRequest {
    pub symbol: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoricalCount {
    pub symbol: String,
    pub count: usize,
}

pub async fn fetch_historical(
    State(state): State<AppState>,
    body: Result<Json<HistoricalRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<HistoricalCount>> {
    let request = optional_body(body)?;
    let symbol = required(request.symbol, "symbol")?;
    let range = HistoryRange::parse(request.period.as_deref().unwrap_or(DEFAULT_PERIOD));
    let count = state.jobs.market.fetch_history(&symbol, range).await?;
    Ok(ApiResponse::success(HistoricalCount { symbol, count }))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `json` (default) or `csv`
    pub format: Option<String>,
}

pub async fn history(
    State(state): State<AppState>,
    symbol: Result<Path<String>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(symbol) = symbol?;
    let Query(query) = query?;
    if query.format.as_deref() == Some("csv") {
        let body = state
            .jobs
            .market
            .history_csv(&symbol, query.start_date, query.end_date)
            .await?;
        let filename = format!("{}_history.csv", symbol.replace(['^', '='], ""));
        return Ok(CsvResponse { filename, body }.into_response());
    }
    let prices: Vec<HistoricalPrice> = state
        .db
        .get_historical_prices(&symbol, query.start_date, query.end_date)
        .await?;
    Ok(ApiResponse::success(prices).into_response())
}

pub async fn board(
    State(state): State<AppState>,
    board: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<Vec<MarketSnapshot>>> {
    let Path(board) = board?;
    let board = Board::from_str(&board)?;
    Ok(ApiResponse::success(state.db.get_market_snapshots(board).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SymbolsRequest {
    pub symbols: Option<Vec<String>>,
}

pub async fn fetch_bist(
    State(state): State<AppState>,
    body: Result<Json<SymbolsRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<AssetFetchReport>> {
    let request = optional_body(body)?;
    let report = state.jobs.market.fetch_bist_indices(request.symbols).await?;
    Ok(ApiResponse::success(report))
}

pub async fn bist_indices(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<Asset>>> {
    let indices = state.db.get_assets(Some(AssetType::Index)).await?;
    Ok(ApiResponse::success(indices))
}
