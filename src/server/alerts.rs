use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use super::{optional_body, required, ApiError, ApiResponse, ApiResult, AppState};
use crate::alerts::AlertCheckReport;
use crate::datatypes::{Alert, AlertCondition, AlertType};

#[derive(Debug, Default, Deserialize)]
pub struct AlertRequest {
    pub user_id: Option<String>,
    pub symbol: Option<String>,
    pub alert_type: Option<String>,
    pub condition: Option<String>,
    pub threshold: Option<f64>,
    pub notification_methods: Option<Vec<String>>,
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<AlertRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Alert>> {
    let request = optional_body(body)?;
    let user_id = required(request.user_id, "user_id")?;
    let symbol = required(request.symbol, "symbol")?;
    let condition = AlertCondition::from_str(&required(request.condition, "condition")?)?;
    let alert_type = match request.alert_type.as_deref() {
        Some(t) if !t.is_empty() => AlertType::from_str(t)?,
        _ => AlertType::PriceTarget,
    };
    let threshold = request.threshold.ok_or_else(|| ApiError::missing("threshold"))?;
    let notification_methods = request
        .notification_methods
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| vec!["push".to_string()]);

    let alert = Alert {
        id: None,
        user_id,
        symbol: symbol.to_uppercase(),
        alert_type,
        condition,
        threshold,
        is_active: true,
        notification_methods,
        created_at: Utc::now(),
        triggered_at: None,
    };
    Ok(ApiResponse::success(state.db.insert_alert(&alert).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    pub user_id: Option<String>,
}

/// Active alerts of a user
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<AlertQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Alert>>> {
    let Query(query) = query?;
    let user_id = required(query.user_id, "user_id")?;
    Ok(ApiResponse::success(state.db.get_alerts(&user_id).await?))
}

pub async fn check(State(state): State<AppState>) -> ApiResult<ApiResponse<AlertCheckReport>> {
    Ok(ApiResponse::success(state.alerts.check_all().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::providers::tests::DummyProvider;
    use crate::server::tests::test_state;

    fn request(symbol: &str, condition: &str, threshold: f64) -> AlertRequest {
        AlertRequest {
            user_id: Some("u1".to_string()),
            symbol: Some(symbol.to_string()),
            condition: Some(condition.to_string()),
            threshold: Some(threshold),
            ..AlertRequest::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let (state, _) = test_state(&Config::default(), DummyProvider::new());
        let mut incomplete = request("GARAN.IS", "above", 100.0);
        incomplete.condition = None;
        let result = create(State(state.clone()), Ok(Json(incomplete))).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let result = create(State(state.clone()), Ok(Json(request("GARAN.IS", "sideways", 1.0)))).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let result = list(State(state), Ok(Query(AlertQuery::default()))).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_create_list_and_check() {
        let provider = DummyProvider::new().with_series("THYAO.IS", vec![100.0, 101.0, 99.0, 100.0, 110.0]);
        let (state, _) = test_state(&Config::default(), provider);

        let created = create(State(state.clone()), Ok(Json(request("thyao.is", "above", 105.0))))
            .await
            .unwrap();
        assert_eq!(created.data.symbol, "THYAO.IS");
        assert_eq!(created.data.alert_type, AlertType::PriceTarget);
        assert_eq!(created.data.notification_methods, vec!["push".to_string()]);
        create(State(state.clone()), Ok(Json(request("THYAO.IS", "below", 50.0))))
            .await
            .unwrap();

        let query = AlertQuery {
            user_id: Some("u1".to_string()),
        };
        let alerts = list(State(state.clone()), Ok(Query(query))).await.unwrap();
        assert_eq!(alerts.data.len(), 2);

        let report = check(State(state)).await.unwrap();
        assert_eq!(report.data.checked, 2);
        assert_eq!(report.data.triggered, 1);
        assert_eq!(report.data.alerts[0].trigger.current_price, 110.0);
    }
}
