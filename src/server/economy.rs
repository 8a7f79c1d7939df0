//! Macro data of TCMB, EVDS, FRED and TÜİK plus TEFAS fund prices
use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{optional_body, required, ApiError, ApiResponse, ApiResult, AppState};
use crate::datatypes::{EconomicIndicator, FundPrice, FundType, MacroFilter, MacroObservation};
use crate::providers::evds::EvdsSeries;
use crate::providers::tuik::{Bulletin, TuikCategory};
use crate::providers::DataSource;
use crate::sync::{EvdsReport, FredBatchReport, FredSeriesReport, FundSyncReport, TcmbReport};

pub async fn fetch_tcmb(State(state): State<AppState>) -> ApiResult<ApiResponse<TcmbReport>> {
    Ok(ApiResponse::success(state.jobs.macro_data.sync_tcmb().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TcmbQuery {
    pub indicator: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Stored TCMB observations, newest first
pub async fn tcmb_data(
    State(state): State<AppState>,
    query: Result<Query<TcmbQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<MacroObservation>>> {
    let Query(query) = query?;
    let filter = MacroFilter {
        country: Some("TR".to_string()),
        indicator: query.indicator,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let source = DataSource::Tcmb.to_string();
    let observations = state
        .db
        .get_macro_observations(&filter)
        .await?
        .into_iter()
        .filter(|obs| obs.source == source)
        .collect();
    Ok(ApiResponse::success(observations))
}

#[derive(Debug, Default, Deserialize)]
pub struct EvdsRequest {
    /// Indicator codes such as `POLICY_RATE` or EVDS series codes
    pub indicators: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct EvdsFetchResult {
    #[serde(flatten)]
    pub report: EvdsReport,
    /// Requested indicators EVDS is not synced for
    pub skipped: Vec<String>,
}

pub async fn fetch_evds(
    State(state): State<AppState>,
    body: Result<Json<EvdsRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<EvdsFetchResult>> {
    let request = optional_body(body)?;
    let names = request
        .indicators
        .filter(|names| !names.is_empty())
        .ok_or_else(|| ApiError::missing("indicators"))?;
    let mut series = Vec::new();
    let mut skipped = Vec::new();
    for name in names {
        match EvdsSeries::from_str(&name) {
            Ok(item) if !series.contains(&item) => series.push(item),
            Ok(_) => {}
            Err(_) => skipped.push(name),
        }
    }
    let report = state
        .jobs
        .macro_data
        .sync_evds(&series, request.start_date, request.end_date)
        .await?;
    Ok(ApiResponse::success(EvdsFetchResult { report, skipped }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FredRequest {
    pub series_id: Option<String>,
    pub limit: Option<u32>,
}

pub async fn fetch_fred(
    State(state): State<AppState>,
    body: Result<Json<FredRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<FredSeriesReport>> {
    let request = optional_body(body)?;
    let series_id = required(request.series_id, "series_id")?;
    let report = state
        .jobs
        .macro_data
        .sync_fred_series(&series_id, request.limit)
        .await?;
    Ok(ApiResponse::success(report))
}

pub async fn fetch_fred_all(State(state): State<AppState>) -> ApiResult<ApiResponse<FredBatchReport>> {
    Ok(ApiResponse::success(state.jobs.macro_data.sync_fred_all().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TefasRequest {
    pub date: Option<NaiveDate>,
    pub fund_type: Option<String>,
}

pub async fn fetch_tefas(
    State(state): State<AppState>,
    body: Result<Json<TefasRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<FundSyncReport>> {
    let request = optional_body(body)?;
    let fund_type = match request.fund_type.as_deref() {
        Some(code) if !code.is_empty() => FundType::from_str(code)?,
        _ => FundType::default(),
    };
    let report = state.jobs.funds.sync_tefas(request.date, fund_type).await?;
    Ok(ApiResponse::success(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

pub async fn tefas_funds(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<FundPrice>>> {
    let Query(query) = query?;
    Ok(ApiResponse::success(state.db.get_fund_prices(query.date).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TuikRequest {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TuikFetchResult {
    /// Figures parsed and stored
    Indicators(Vec<EconomicIndicator>),
    /// Categories without a parser only list their latest bulletins
    Bulletins(Vec<Bulletin>),
}

pub async fn fetch_tuik(
    State(state): State<AppState>,
    body: Result<Json<TuikRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<TuikFetchResult>> {
    let request = optional_body(body)?;
    let category = TuikCategory::from_str(&required(request.category, "category")?)?;
    let sync = &state.jobs.macro_data;
    let result = match category {
        TuikCategory::Inflation => TuikFetchResult::Indicators(sync.sync_tuik_inflation().await?),
        TuikCategory::Labor => {
            TuikFetchResult::Indicators(vec![sync.sync_tuik_unemployment().await?])
        }
        other => TuikFetchResult::Bulletins(sync.tuik_bulletins(other).await?),
    };
    Ok(ApiResponse::success(result))
}

async fn turkish_series(state: &AppState, indicator: &str) -> ApiResult<Vec<MacroObservation>> {
    let filter = MacroFilter {
        country: Some("TR".to_string()),
        indicator: Some(indicator.to_string()),
        ..MacroFilter::default()
    };
    Ok(state.db.get_macro_observations(&filter).await?)
}

pub async fn tuik_inflation(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<MacroObservation>>> {
    Ok(ApiResponse::success(turkish_series(&state, "TUFE").await?))
}

pub async fn tuik_unemployment(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<MacroObservation>>> {
    Ok(ApiResponse::success(
        turkish_series(&state, "UNEMPLOYMENT_RATE").await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

pub async fn turkey_indicators(
    State(state): State<AppState>,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<EconomicIndicator>>> {
    let Query(query) = query?;
    let category = query.category.filter(|c| !c.is_empty());
    Ok(ApiResponse::success(
        state.db.get_indicators(category.as_deref()).await?,
    ))
}
