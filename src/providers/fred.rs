//! Observations from the FRED API of the Federal Reserve Bank of St. Louis
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{check_status, ProviderError};
use crate::config::DEFAULT_FRED_URL;
use crate::datatypes::date_time_helper::date_from_str;

/// Series stored when syncing all of FRED
pub const DEFAULT_SERIES: [&str; 5] = ["FEDFUNDS", "GDP", "CPIAUCSL", "UNRATE", "DGS10"];

/// Unit of the values of a series
pub fn series_unit(series_id: &str) -> &'static str {
    match series_id {
        "GDP" => "Billion USD",
        "CPIAUCSL" => "Index",
        _ => "Percent",
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
    realtime_start: String,
    realtime_end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FredObservation {
    pub date: NaiveDate,
    /// `None` if FRED reports the value as missing (`.`)
    pub value: Option<f64>,
    pub realtime_start: String,
    pub realtime_end: String,
}

pub struct Fred {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Fred {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Fred {
        Fred::with_base_url(client, DEFAULT_FRED_URL, api_key)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Fred {
        Fred {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch observations of a series. If `limit` is given, only the most recent
    /// `limit` observations are requested (newest first).
    pub async fn fetch_observations(
        &self,
        series_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<FredObservation>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey("FRED_API_KEY"))?;
        let mut params = vec![
            ("series_id", series_id.to_string()),
            ("api_key", api_key.to_string()),
            ("file_type", "json".to_string()),
        ];
        if let Some(limit) = limit {
            params.push(("sort_order", "desc".to_string()));
            params.push(("limit", limit.to_string()));
        }
        let resp = self
            .client
            .get(format!("{}/fred/series/observations", self.base_url))
            .query(&params)
            .send()
            .await?;
        let body: ObservationsResponse = check_status(resp)?.json().await?;
        let mut observations = Vec::with_capacity(body.observations.len());
        for raw in body.observations {
            observations.push(FredObservation {
                date: date_from_str(&raw.date, "%Y-%m-%d")?,
                value: raw.value.trim().parse().ok(),
                realtime_start: raw.realtime_start,
                realtime_end: raw.realtime_end,
            });
        }
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const OBSERVATIONS: &str = r#"{"realtime_start":"2025-10-19","realtime_end":"2025-10-19",
        "observation_start":"1600-01-01","observation_end":"9999-12-31","units":"lin",
        "output_type":1,"file_type":"json","order_by":"observation_date","sort_order":"desc",
        "count":3,"offset":0,"limit":3,"observations":[
        {"realtime_start":"2025-10-19","realtime_end":"2025-10-19","date":"2025-09-01","value":"4.22"},
        {"realtime_start":"2025-10-19","realtime_end":"2025-10-19","date":"2025-08-01","value":"."},
        {"realtime_start":"2025-10-19","realtime_end":"2025-10-19","date":"2025-07-01","value":"4.33"}]}"#;

    #[tokio::test]
    async fn test_fetch_observations() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fred/series/observations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("series_id".into(), "FEDFUNDS".into()),
                Matcher::UrlEncoded("api_key".into(), "secret".into()),
                Matcher::UrlEncoded("file_type".into(), "json".into()),
                Matcher::UrlEncoded("sort_order".into(), "desc".into()),
                Matcher::UrlEncoded("limit".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(OBSERVATIONS)
            .create_async()
            .await;
        let fred = Fred::with_base_url(reqwest::Client::new(), &server.url(), Some("secret".to_string()));
        let observations = fred.fetch_observations("FEDFUNDS", Some(3)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].value, Some(4.22));
        assert_eq!(observations[1].value, None);
        assert_eq!(
            observations[2].date,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let fred = Fred::new(reqwest::Client::new(), None);
        let err = fred.fetch_observations("GDP", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn test_bad_series() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fred/series/observations")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error_code":400,"error_message":"Bad Request. The series does not exist."}"#)
            .create_async()
            .await;
        let fred = Fred::with_base_url(reqwest::Client::new(), &server.url(), Some("secret".to_string()));
        let err = fred.fetch_observations("NOPE", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedStatus { status: 400, .. }));
    }

    #[test]
    fn test_series_unit() {
        assert_eq!(series_unit("GDP"), "Billion USD");
        assert_eq!(series_unit("UNRATE"), "Percent");
    }
}
