//! Fund prices from the TEFAS history endpoint
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{check_status, parse_turkish_number, ProviderError};
use crate::config::DEFAULT_TEFAS_URL;
use crate::datatypes::date_time_helper::{format_dotted_date, unix_millis_to_date};
use crate::datatypes::{FundPrice, FundType};

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    data: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "FONKODU", default)]
    code: Option<String>,
    #[serde(rename = "FONUNVAN", default)]
    title: Option<String>,
    #[serde(rename = "FIYAT", default)]
    price: Value,
    #[serde(rename = "TARIH", default)]
    date: Value,
    #[serde(rename = "TEDPAYSAYISI", default)]
    share_count: Value,
    #[serde(rename = "KISISAYISI", default)]
    investor_count: Value,
    #[serde(rename = "PORTFOYBUYUKLUK", default)]
    portfolio_size: Value,
}

/// Numbers arrive either as JSON numbers or as strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok().or_else(|| parse_turkish_number(s)),
        _ => None,
    }
}

/// Lowercase with Turkish dotted capital I mapped to a plain `i`
fn turkish_lowercase(text: &str) -> String {
    text.replace('İ', "i").to_lowercase()
}

/// Classify a fund by keywords in its title
pub fn classify_fund(title: &str) -> &'static str {
    let title = turkish_lowercase(title);
    let has = |words: &[&str]| words.iter().any(|w| title.contains(w));
    if has(&["hisse", "equity"]) {
        "equity"
    } else if has(&["tahvil", "bono", "borçlanma", "borclanma", "bond"]) {
        "bond"
    } else if has(&["para piyasas", "money market"]) {
        "money_market"
    } else if has(&["altın", "altin", "gold", "kıymetli maden", "kiymetli maden", "metal"]) {
        "precious_metal"
    } else {
        "mixed"
    }
}

pub struct Tefas {
    client: reqwest::Client,
    base_url: String,
}

impl Tefas {
    pub fn new(client: reqwest::Client) -> Tefas {
        Tefas::with_base_url(client, DEFAULT_TEFAS_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Tefas {
        Tefas {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch prices of all funds of a type (or a single fund) between two dates
    pub async fn fetch_fund_prices(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        fund_type: FundType,
        fund_code: Option<&str>,
    ) -> Result<Vec<FundPrice>, ProviderError> {
        let form = [
            ("fontip", fund_type.code().to_string()),
            ("sfontur", String::new()),
            ("kurucukod", String::new()),
            ("fonkod", fund_code.unwrap_or_default().to_string()),
            ("bastarih", format_dotted_date(&start)),
            ("bittarih", format_dotted_date(&end)),
            ("fonturkod", String::new()),
            ("fonunvantip", String::new()),
        ];
        let resp = self
            .client
            .post(format!("{}/api/DB/BindHistoryInfo", self.base_url))
            .header("X-Requested-With", "XMLHttpRequest")
            .header(
                reqwest::header::REFERER,
                format!("{}/TarihselVeriler.aspx", self.base_url),
            )
            .form(&form)
            .send()
            .await?;
        let body: HistoryResponse = check_status(resp)?.json().await?;
        debug!("TEFAS returned {} rows", body.data.len());

        let mut funds = Vec::new();
        for row in body.data {
            let code = match row.code.as_deref().map(str::trim) {
                Some(code) if !code.is_empty() => code.to_string(),
                _ => continue,
            };
            let price = match as_number(&row.price) {
                Some(price) if price > 0.0 => price,
                _ => continue,
            };
            let data_date = match as_number(&row.date) {
                Some(millis) => unix_millis_to_date(millis as i64)?,
                None => end,
            };
            let fund_name = row.title.unwrap_or_else(|| code.clone());
            funds.push(FundPrice {
                category: classify_fund(&fund_name).to_string(),
                fund_code: code,
                fund_name,
                fund_type,
                data_date,
                price,
                share_count: as_number(&row.share_count),
                investor_count: as_number(&row.investor_count),
                portfolio_size: as_number(&row.portfolio_size),
            });
        }
        Ok(funds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_classify_fund() {
        assert_eq!(classify_fund("AK PORTFÖY BIST 30 ENDEKSİ HİSSE SENEDİ FONU"), "equity");
        assert_eq!(classify_fund("İŞ PORTFÖY KISA VADELİ BORÇLANMA ARAÇLARI FONU"), "bond");
        assert_eq!(classify_fund("GARANTİ PORTFÖY PARA PİYASASI FONU"), "money_market");
        assert_eq!(classify_fund("ZİRAAT PORTFÖY ALTIN FONU"), "precious_metal");
        assert_eq!(classify_fund("YAPI KREDİ PORTFÖY DEĞİŞKEN FON"), "mixed");
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(&serde_json::json!(1.25)), Some(1.25));
        assert_eq!(as_number(&serde_json::json!("1729123200000")), Some(1_729_123_200_000.0));
        assert_eq!(as_number(&serde_json::json!("12,5")), Some(12.5));
        assert_eq!(as_number(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_fetch_fund_prices() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/DB/BindHistoryInfo")
            .match_header("x-requested-with", "XMLHttpRequest")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("fontip".into(), "YAT".into()),
                Matcher::UrlEncoded("bastarih".into(), "17.10.2024".into()),
                Matcher::UrlEncoded("bittarih".into(), "17.10.2024".into()),
                Matcher::UrlEncoded("fonkod".into(), "".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"draw":0,"recordsTotal":3,"recordsFiltered":3,"data":[
                {"TARIH":"1729123200000","FONKODU":"AFT","FONUNVAN":"AK PORTFÖY YENİ TEKNOLOJİLER YABANCI HİSSE SENEDİ FONU","FIYAT":0.215432,"TEDPAYSAYISI":28123456789.0,"KISISAYISI":123456,"PORTFOYBUYUKLUK":6058123456.78,"BORSABULTENFIYAT":"-"},
                {"TARIH":"1729123200000","FONKODU":"","FONUNVAN":"EMPTY","FIYAT":1.0},
                {"TARIH":"1729123200000","FONKODU":"XYZ","FONUNVAN":"ZERO","FIYAT":0}]}"#,
            )
            .create_async()
            .await;
        let tefas = Tefas::with_base_url(reqwest::Client::new(), &server.url());
        let day = NaiveDate::from_ymd_opt(2024, 10, 17).unwrap();
        let funds = tefas
            .fetch_fund_prices(day, day, FundType::Investment, None)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].fund_code, "AFT");
        assert_eq!(funds[0].category, "equity");
        assert_eq!(funds[0].data_date, day);
        assert_eq!(funds[0].investor_count, Some(123456.0));
    }
}
