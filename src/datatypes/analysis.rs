use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Risk,
    Sentiment,
    Anomaly,
    Prediction,
    Correlation,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Sentiment => "sentiment",
            Self::Anomaly => "anomaly",
            Self::Prediction => "prediction",
            Self::Correlation => "correlation",
        }
    }
}

impl FromStr for AnalysisKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "risk" => Ok(Self::Risk),
            "sentiment" => Ok(Self::Sentiment),
            "anomaly" => Ok(Self::Anomaly),
            "prediction" => Ok(Self::Prediction),
            "correlation" => Ok(Self::Correlation),
            _ => Err(ParseEnumError::new("analysis kind", s)),
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored result of one analysis run. `payload` holds the full result as JSON,
/// `score` and `label` the headline numbers for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Option<i32>,
    pub kind: AnalysisKind,
    pub symbol: String,
    pub score: Option<f64>,
    pub label: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
