//! Errors of the HTTP layer and their JSON representation
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::analytics::service::AnalysisServiceError;
use crate::analytics::AnalysisError;
use crate::datatypes::{DataError, ParseEnumError};
use crate::providers::ProviderError;
use crate::sync::SyncError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InsufficientData(String),
    #[error("{0}")]
    MissingConfiguration(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Database(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MissingConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
            Self::MissingConfiguration(_) => "MISSING_CONFIGURATION",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Error for a missing mandatory request field
    pub fn missing(field: &str) -> ApiError {
        ApiError::BadRequest(format!("{} is required", field))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}: {}", self.error_code(), self);
        }
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(what) => ApiError::NotFound(what),
            DataError::InvalidData(msg) => ApiError::BadRequest(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingApiKey(_) => ApiError::MissingConfiguration(err.to_string()),
            ProviderError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ProviderError::StoringFailed(_) => ApiError::Database(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Provider(err) => err.into(),
            SyncError::Data(err) => err.into(),
            SyncError::NoRelease(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InsufficientData { .. } => ApiError::InsufficientData(err.to_string()),
            AnalysisError::InvalidInput(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<AnalysisServiceError> for ApiError {
    fn from(err: AnalysisServiceError) -> Self {
        match err {
            AnalysisServiceError::Provider(err) => err.into(),
            AnalysisServiceError::Analysis(err) => err.into(),
            AnalysisServiceError::Data(err) => err.into(),
            AnalysisServiceError::Serialize(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: ApiError = ProviderError::MissingApiKey("FRED_API_KEY").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "MISSING_CONFIGURATION");

        let err: ApiError = AnalysisError::InsufficientData {
            needed: 30,
            available: 3,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = SyncError::Provider(ProviderError::UnexpectedStatus {
            status: 503,
            url: "https://www.tcmb.gov.tr/kurlar/today.xml".to_string(),
        })
        .into();
        assert_eq!(err.error_code(), "UPSTREAM_ERROR");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err: ApiError = DataError::NotFound("holding 3".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = ApiError::missing("symbol").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "BAD_REQUEST");
        assert_eq!(body["message"], "symbol is required");
    }
}
