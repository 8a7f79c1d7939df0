use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::{optional_body, required, ApiError, ApiResponse, ApiResult, AppState};
use crate::analytics::{AnomalyReport, CorrelationMatrix, Prediction, RiskReport, SentimentReport};

const DEFAULT_SENSITIVITY: f64 = 2.5;
const DEFAULT_PREDICTION_DAYS: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct CorrelationRequest {
    pub symbols: Option<Vec<String>>,
    /// Window in days
    pub period: Option<u32>,
}

pub async fn correlations(
    State(state): State<AppState>,
    body: Result<Json<CorrelationRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<CorrelationMatrix>> {
    let request = optional_body(body)?;
    let matrix = state
        .analysis
        .correlations(request.symbols, request.period)
        .await?;
    Ok(ApiResponse::success(matrix))
}

#[derive(Debug, Default, Deserialize)]
pub struct SymbolRequest {
    pub symbol: Option<String>,
    pub sensitivity: Option<f64>,
    pub days: Option<u32>,
}

pub async fn risk(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<RiskReport>> {
    let symbol = required(optional_body(body)?.symbol, "symbol")?;
    Ok(ApiResponse::success(state.analysis.risk(&symbol).await?))
}

pub async fn sentiment(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<SentimentReport>> {
    let symbol = required(optional_body(body)?.symbol, "symbol")?;
    Ok(ApiResponse::success(state.analysis.sentiment(&symbol).await?))
}

pub async fn anomalies(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<AnomalyReport>> {
    let request = optional_body(body)?;
    let symbol = required(request.symbol, "symbol")?;
    let sensitivity = request.sensitivity.unwrap_or(DEFAULT_SENSITIVITY);
    if sensitivity <= 0.0 {
        return Err(ApiError::BadRequest("sensitivity must be positive".to_string()));
    }
    Ok(ApiResponse::success(
        state.analysis.anomalies(&symbol, sensitivity).await?,
    ))
}

pub async fn prediction(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Prediction>> {
    let request = optional_body(body)?;
    let symbol = required(request.symbol, "symbol")?;
    let days = request.days.unwrap_or(DEFAULT_PREDICTION_DAYS);
    Ok(ApiResponse::success(
        state.analysis.prediction(&symbol, days).await?,
    ))
}
