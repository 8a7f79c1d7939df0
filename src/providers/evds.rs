//! Time series of the TCMB electronic data delivery system (EVDS)
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_status, ProviderError};
use crate::config::DEFAULT_EVDS_URL;
use crate::datatypes::date_time_helper::{date_from_str, DateTimeError};
use crate::datatypes::ParseEnumError;

/// Series known to the EVDS sync, named by their short indicator code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvdsSeries {
    Tufe,
    Ufe,
    Usd,
    Eur,
    PolicyRate,
    Cds,
    Reserves,
    M3,
}

impl EvdsSeries {
    pub const ALL: [EvdsSeries; 8] = [
        Self::Tufe,
        Self::Ufe,
        Self::Usd,
        Self::Eur,
        Self::PolicyRate,
        Self::Cds,
        Self::Reserves,
        Self::M3,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Tufe => "TUFE",
            Self::Ufe => "UFE",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::PolicyRate => "POLICY_RATE",
            Self::Cds => "CDS",
            Self::Reserves => "RESERVES",
            Self::M3 => "M3",
        }
    }

    /// EVDS series code
    pub fn series_code(&self) -> &'static str {
        match self {
            Self::Tufe => "TP.FG.J0",
            Self::Ufe => "TP.FG.G01",
            Self::Usd => "TP.DK.USD.A",
            Self::Eur => "TP.DK.EUR.A",
            Self::PolicyRate => "TP.TCMB.PP",
            Self::Cds => "TP.TCMB.CDS",
            Self::Reserves => "TP.MB.B1",
            Self::M3 => "TP.M3.Y01",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Tufe | Self::Ufe => "Index",
            Self::Usd | Self::Eur => "TRY",
            Self::PolicyRate => "Percent",
            Self::Cds => "Basis Points",
            Self::Reserves => "Million USD",
            Self::M3 => "Thousand TRY",
        }
    }
}

impl FromStr for EvdsSeries {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EvdsSeries::ALL
            .iter()
            .find(|series| {
                series.code().eq_ignore_ascii_case(s.trim()) || series.series_code() == s.trim()
            })
            .copied()
            .ok_or_else(|| ParseEnumError::new("EVDS indicator", s))
    }
}

impl fmt::Display for EvdsSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    items: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvdsObservation {
    pub date: NaiveDate,
    /// `None` if EVDS has no value for the period
    pub value: Option<f64>,
}

/// Dates of daily series are `DD-MM-YYYY`, monthly series use `YYYY-M`
pub fn parse_evds_date(text: &str) -> Result<NaiveDate, DateTimeError> {
    date_from_str(text, "%d-%m-%Y").or_else(|_| {
        let (year, month) = text
            .trim()
            .split_once('-')
            .ok_or_else(|| DateTimeError::StringParseError(text.to_string()))?;
        let date = match (year.parse::<i32>(), month.parse::<u32>()) {
            (Ok(year), Ok(month)) => NaiveDate::from_ymd_opt(year, month, 1),
            _ => None,
        };
        date.ok_or_else(|| DateTimeError::StringParseError(text.to_string()))
    })
}

fn item_value(item: &Map<String, Value>, series_code: &str) -> Option<f64> {
    let value = item
        .get(&series_code.replace('.', "_"))
        .or_else(|| item.get(series_code))?;
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Observations of one series, oldest first
pub fn parse_series(body: &str, series: EvdsSeries) -> Result<Vec<EvdsObservation>, ProviderError> {
    let response: SeriesResponse = serde_json::from_str(body)?;
    let mut observations = Vec::with_capacity(response.items.len());
    for item in &response.items {
        let date_text = item
            .get("Tarih")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Parse(format!("item of {} without date", series)))?;
        observations.push(EvdsObservation {
            date: parse_evds_date(date_text)?,
            value: item_value(item, series.series_code()),
        });
    }
    observations.sort_by_key(|obs| obs.date);
    Ok(observations)
}

pub struct Evds {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Evds {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Evds {
        Evds::with_base_url(client, DEFAULT_EVDS_URL, api_key)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Evds {
        Evds {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch a series between `start` and `end`. Without a start the year before
    /// `end` is requested.
    pub async fn fetch_series(
        &self,
        series: EvdsSeries,
        start: Option<NaiveDate>,
        end: NaiveDate,
    ) -> Result<Vec<EvdsObservation>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey("EVDS_API_KEY"))?;
        let start = start.unwrap_or(end - Duration::days(365));
        let params = [
            ("series", series.series_code().to_string()),
            ("startDate", start.format("%d-%m-%Y").to_string()),
            ("endDate", end.format("%d-%m-%Y").to_string()),
            ("type", "json".to_string()),
            ("key", api_key.to_string()),
        ];
        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&params)
            .send()
            .await?;
        let body = check_status(resp)?.text().await?;
        parse_series(&body, series)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Matcher;

    pub const POLICY_RATE: &str = r#"{"totalCount":3,"items":[
        {"Tarih":"12-09-2025","TP_TCMB_PP":"40.5","UNIXTIME":{"$numberLong":"1757624400"}},
        {"Tarih":"24-07-2025","TP_TCMB_PP":"41","UNIXTIME":{"$numberLong":"1753304400"}},
        {"Tarih":"23-10-2025","TP_TCMB_PP":null,"UNIXTIME":{"$numberLong":"1761166800"}}]}"#;

    #[test]
    fn test_series_from_str() {
        assert_eq!(EvdsSeries::from_str("policy_rate").unwrap(), EvdsSeries::PolicyRate);
        assert_eq!(EvdsSeries::from_str("TP.DK.USD.A").unwrap(), EvdsSeries::Usd);
        assert!(EvdsSeries::from_str("GOLD").is_err());
        assert_eq!(serde_json::to_value(EvdsSeries::PolicyRate).unwrap(), "POLICY_RATE");
    }

    #[test]
    fn test_parse_evds_date() {
        assert_eq!(
            parse_evds_date("12-09-2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 12).unwrap()
        );
        assert_eq!(
            parse_evds_date("2025-9").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
        );
        assert!(parse_evds_date("Eylül").is_err());
    }

    #[test]
    fn test_parse_series() {
        let observations = parse_series(POLICY_RATE, EvdsSeries::PolicyRate).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(2025, 7, 24).unwrap());
        assert_eq!(observations[0].value, Some(41.0));
        assert_eq!(observations[1].value, Some(40.5));
        assert_eq!(observations[2].value, None);

        let monthly = r#"{"items":[{"Tarih":"2025-8","TP_FG_J0":3367.22}]}"#;
        let observations = parse_series(monthly, EvdsSeries::Tufe).unwrap();
        assert_eq!(observations[0].value, Some(3367.22));
    }

    #[tokio::test]
    async fn test_fetch_series() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("series".into(), "TP.TCMB.PP".into()),
                Matcher::UrlEncoded("startDate".into(), "01-07-2025".into()),
                Matcher::UrlEncoded("endDate".into(), "31-10-2025".into()),
                Matcher::UrlEncoded("type".into(), "json".into()),
                Matcher::UrlEncoded("key".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_body(POLICY_RATE)
            .create_async()
            .await;
        let evds = Evds::with_base_url(reqwest::Client::new(), &server.url(), Some("secret".to_string()));
        let observations = evds
            .fetch_series(
                EvdsSeries::PolicyRate,
                NaiveDate::from_ymd_opt(2025, 7, 1),
                NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
            )
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(observations.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let evds = Evds::new(reqwest::Client::new(), None);
        let end = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let err = evds.fetch_series(EvdsSeries::M3, None, end).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey("EVDS_API_KEY")));
    }
}
