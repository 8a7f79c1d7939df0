use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{optional_body, required, ApiError, ApiResponse, ApiResult, AppState};
use crate::analytics::{analyze_portfolio, summarize, PortfolioAnalysis, PortfolioSummary};
use crate::datatypes::Holding;

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortfolioView {
    pub holdings: Vec<Holding>,
    pub summary: PortfolioSummary,
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<PortfolioView>> {
    let Query(query) = query?;
    let user_id = required(query.user_id, "user_id")?;
    let holdings = state.db.get_holdings(&user_id).await?;
    let summary = summarize(&holdings);
    Ok(ApiResponse::success(PortfolioView { holdings, summary }))
}

#[derive(Debug, Default, Deserialize)]
pub struct HoldingRequest {
    pub user_id: Option<String>,
    pub portfolio_id: Option<String>,
    pub symbol: Option<String>,
    pub asset_type: Option<String>,
    pub quantity: Option<f64>,
    pub average_price: Option<f64>,
    pub current_price: Option<f64>,
}

pub async fn add_holding(
    State(state): State<AppState>,
    body: Result<Json<HoldingRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Holding>> {
    let request = optional_body(body)?;
    let user_id = required(request.user_id, "user_id")?;
    let symbol = required(request.symbol, "symbol")?;
    let quantity = request.quantity.ok_or_else(|| ApiError::missing("quantity"))?;
    let average_price = request
        .average_price
        .ok_or_else(|| ApiError::missing("average_price"))?;
    if quantity <= 0.0 || average_price < 0.0 {
        return Err(ApiError::BadRequest(
            "quantity must be positive and average_price not negative".to_string(),
        ));
    }

    let current_value = request.current_price.map(|price| price * quantity);
    let gain_loss_percent = match request.current_price {
        Some(price) if average_price > 0.0 => Some((price - average_price) / average_price * 100.0),
        _ => None,
    };
    let mut holding = Holding {
        id: None,
        user_id,
        portfolio_id: request.portfolio_id,
        symbol: symbol.to_uppercase(),
        asset_type: request.asset_type,
        quantity,
        average_price,
        current_price: request.current_price,
        current_value,
        gain_loss_percent,
    };
    holding.id = Some(state.db.insert_holding(&holding).await?);
    Ok(ApiResponse::success(holding))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: i32,
}

pub async fn delete_holding(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<ApiResponse<Deleted>> {
    let Path(id) = id?;
    state.db.delete_holding(id).await?;
    Ok(ApiResponse::success(Deleted { id }))
}

#[derive(Debug, Serialize)]
pub struct PortfolioReport {
    #[serde(flatten)]
    pub summary: PortfolioSummary,
    /// Missing if the user holds nothing
    pub analysis: Option<PortfolioAnalysis>,
}

pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<UserQuery>, JsonRejection>,
) -> ApiResult<ApiResponse<PortfolioReport>> {
    let request = optional_body(body)?;
    let user_id = required(request.user_id, "user_id")?;
    let holdings = state.db.get_holdings(&user_id).await?;
    Ok(ApiResponse::success(PortfolioReport {
        summary: summarize(&holdings),
        analysis: analyze_portfolio(&holdings),
    }))
}
