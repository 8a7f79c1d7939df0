//! JSON API served with axum
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::alerts::{AlertChecker, LogNotifier, Notifier, WebhookNotifier};
use crate::analytics::AnalysisService;
use crate::config::Config;
use crate::datatypes::DataHandler;
use crate::providers::MarketQuoteProvider;
use crate::sync::{ScraperReport, SyncAllReport, SyncJobs};

mod alerts;
mod analysis;
mod economy;
pub mod error;
mod market;
mod portfolio;
pub mod response;

pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DataHandler>,
    pub jobs: Arc<SyncJobs>,
    pub analysis: Arc<AnalysisService>,
    pub alerts: Arc<AlertChecker>,
    pub started: Instant,
}

impl AppState {
    pub fn new(
        config: &Config,
        db: Arc<dyn DataHandler>,
        yahoo: Arc<dyn MarketQuoteProvider>,
        client: reqwest::Client,
    ) -> AppState {
        let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(client.clone(), url)),
            None => Arc::new(LogNotifier),
        };
        AppState {
            jobs: Arc::new(SyncJobs::new(config, db.clone(), yahoo.clone(), client)),
            analysis: Arc::new(AnalysisService::new(db.clone(), yahoo.clone())),
            alerts: Arc::new(AlertChecker::new(db.clone(), yahoo, notifier)),
            db,
            started: Instant::now(),
        }
    }
}

/// Body of an optional JSON payload, a request without JSON body gives the default
pub(crate) fn optional_body<T: Default>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

/// Value of a mandatory field, rejecting missing or blank strings
pub(crate) fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::missing(field))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/market/fetch", post(market::fetch))
        .route("/api/market/assets", get(market::assets))
        .route("/api/market/assets/{symbol}", get(market::asset))
        .route("/api/market/fetch-all", post(market::fetch_all))
        .route("/api/market/fetch-historical", post(market::fetch_historical))
        .route("/api/market/history/{symbol}", get(market::history))
        .route("/api/market/boards/{board}", get(market::board))
        .route("/api/bist/fetch", post(market::fetch_bist))
        .route("/api/bist/indices", get(market::bist_indices))
        .route("/api/tcmb/fetch", post(economy::fetch_tcmb))
        .route("/api/tcmb/data", get(economy::tcmb_data))
        .route("/api/evds/fetch", post(economy::fetch_evds))
        .route("/api/fred/fetch", post(economy::fetch_fred))
        .route("/api/fred/fetch-all", post(economy::fetch_fred_all))
        .route("/api/tefas/fetch", post(economy::fetch_tefas))
        .route("/api/tefas/funds", get(economy::tefas_funds))
        .route("/api/tuik/fetch", post(economy::fetch_tuik))
        .route("/api/tuik/inflation", get(economy::tuik_inflation))
        .route("/api/tuik/unemployment", get(economy::tuik_unemployment))
        .route("/api/turkey/indicators", get(economy::turkey_indicators))
        .route("/api/portfolio", get(portfolio::get_portfolio))
        .route("/api/portfolio/holdings", post(portfolio::add_holding))
        .route("/api/portfolio/holdings/{id}", delete(portfolio::delete_holding))
        .route("/api/portfolio/analyze", post(portfolio::analyze))
        .route("/api/alerts", post(alerts::create).get(alerts::list))
        .route("/api/alerts/check", post(alerts::check))
        .route("/api/analysis/correlations", post(analysis::correlations))
        .route("/api/analysis/risk", post(analysis::risk))
        .route("/api/analysis/sentiment", post(analysis::sentiment))
        .route("/api/analysis/anomalies", post(analysis::anomalies))
        .route("/api/analysis/prediction", post(analysis::prediction))
        .route("/api/scraper/run", post(run_scraper))
        .route("/api/sync-all", post(sync_all))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind to the configured address and serve until the process ends
pub async fn serve(config: &Config, state: AppState) -> std::io::Result<()> {
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("listening on http://{}", address);
    axum::serve(listener, router(state)).await
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: Utc::now(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

async fn run_scraper(State(state): State<AppState>) -> ApiResult<ApiResponse<ScraperReport>> {
    let report = state.jobs.scraper.run().await?;
    Ok(ApiResponse::success(report))
}

async fn sync_all(State(state): State<AppState>) -> ApiResponse<SyncAllReport> {
    ApiResponse::success(state.jobs.sync_all().await)
}
