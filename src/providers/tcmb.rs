//! Daily exchange rate bulletin of the Central Bank of the Republic of Türkiye
use std::time::Duration;

use chrono::NaiveDate;
use log::info;
use regex::Regex;
use serde::Serialize;

use super::{check_status, retry_with_backoff, ProviderError};
use crate::config::DEFAULT_TCMB_URL;
use crate::datatypes::date_time_helper::{date_from_dotted_str, today_in_istanbul};

/// Currencies stored on every TCMB sync
pub const TRACKED_CURRENCIES: [&str; 5] = ["USD", "EUR", "GBP", "JPY", "CHF"];

/// Bodies shorter than this can't be a complete bulletin
const MIN_BULLETIN_LEN: usize = 100;

/// Rates of one currency in TRY
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxRate {
    pub code: String,
    /// Number of currency units the rates refer to (e.g. 100 for JPY)
    pub unit: u32,
    pub name: String,
    pub forex_buying: Option<f64>,
    pub forex_selling: Option<f64>,
    pub banknote_buying: Option<f64>,
    pub banknote_selling: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxBulletin {
    pub date: NaiveDate,
    pub rates: Vec<FxRate>,
}

impl FxBulletin {
    pub fn rate(&self, code: &str) -> Option<&FxRate> {
        self.rates.iter().find(|r| r.code == code)
    }

    /// Forex selling rate for a single unit of the currency, only if positive
    pub fn selling_rate(&self, code: &str) -> Option<f64> {
        self.rate(code)
            .and_then(|r| r.forex_selling.map(|rate| rate / r.unit.max(1) as f64))
            .filter(|rate| *rate > 0.0)
    }
}

fn tag_value<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = block.find(&open)? + open.len();
    let end = start + block[start..].find(&close)?;
    let value = block[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn tag_number(block: &str, tag: &str) -> Option<f64> {
    tag_value(block, tag).and_then(|v| v.parse().ok())
}

/// Parse the `today.xml` bulletin. If the bulletin carries no date, `fallback_date` is used.
pub fn parse_bulletin(xml: &str, fallback_date: NaiveDate) -> Result<FxBulletin, ProviderError> {
    let date_re = Regex::new(r#"Tarih="(\d{2}\.\d{2}\.\d{4})""#).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let currency_re = Regex::new(r#"(?s)<Currency\b([^>]*)>(.*?)</Currency>"#)
        .map_err(|e| ProviderError::Parse(e.to_string()))?;
    let code_re = Regex::new(r#"\bKod="([A-Z]{3})""#).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let date = match date_re.captures(xml) {
        Some(caps) => date_from_dotted_str(&caps[1])?,
        None => fallback_date,
    };

    let mut rates = Vec::new();
    for caps in currency_re.captures_iter(xml) {
        let code = match code_re.captures(&caps[1]) {
            Some(code) => code[1].to_string(),
            None => continue,
        };
        let block = &caps[2];
        rates.push(FxRate {
            code,
            unit: tag_value(block, "Unit")
                .and_then(|u| u.parse().ok())
                .unwrap_or(1),
            name: tag_value(block, "Isim").unwrap_or_default().to_string(),
            forex_buying: tag_number(block, "ForexBuying"),
            forex_selling: tag_number(block, "ForexSelling"),
            banknote_buying: tag_number(block, "BanknoteBuying"),
            banknote_selling: tag_number(block, "BanknoteSelling"),
        });
    }
    if rates.is_empty() {
        return Err(ProviderError::Parse("bulletin contains no currencies".to_string()));
    }
    Ok(FxBulletin { date, rates })
}

pub struct Tcmb {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl Tcmb {
    pub fn new(client: reqwest::Client) -> Tcmb {
        Tcmb::with_url(client, DEFAULT_TCMB_URL)
    }

    pub fn with_url(client: reqwest::Client, url: &str) -> Tcmb {
        Tcmb {
            client,
            url: url.to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Tcmb {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    async fn fetch_xml(&self) -> Result<String, ProviderError> {
        let resp = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/xml, text/xml, */*")
            .send()
            .await?;
        let body = check_status(resp)?.text().await?;
        if body.len() < MIN_BULLETIN_LEN {
            return Err(ProviderError::Parse(format!(
                "bulletin too short ({} bytes)",
                body.len()
            )));
        }
        Ok(body)
    }

    /// Fetch and parse today's bulletin, retrying transient failures
    pub async fn fetch_bulletin(&self) -> Result<FxBulletin, ProviderError> {
        let xml = retry_with_backoff(self.max_retries, self.retry_delay, || self.fetch_xml()).await?;
        let bulletin = parse_bulletin(&xml, today_in_istanbul())?;
        info!(
            "fetched TCMB bulletin of {} with {} currencies",
            bulletin.date,
            bulletin.rates.len()
        );
        Ok(bulletin)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const BULLETIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<?xml-stylesheet type="text/xsl" href="isokur.xsl"?>
<Tarih_Date Tarih="17.10.2025" Date="10/17/2025" Bulten_No="2025/197">
  <Currency CrossOrder="0" Kod="USD" CurrencyCode="USD">
    <Unit>1</Unit>
    <Isim>ABD DOLARI</Isim>
    <CurrencyName>US DOLLAR</CurrencyName>
    <ForexBuying>41.8046</ForexBuying>
    <ForexSelling>41.8799</ForexSelling>
    <BanknoteBuying>41.7753</BanknoteBuying>
    <BanknoteSelling>41.9427</BanknoteSelling>
    <CrossRateUSD/>
    <CrossRateOther/>
  </Currency>
  <Currency CrossOrder="2" Kod="EUR" CurrencyCode="EUR">
    <Unit>1</Unit>
    <Isim>EURO</Isim>
    <CurrencyName>EURO</CurrencyName>
    <ForexBuying>48.8211</ForexBuying>
    <ForexSelling>48.9091</ForexSelling>
    <BanknoteBuying>48.7869</BanknoteBuying>
    <BanknoteSelling>48.9825</BanknoteSelling>
    <CrossRateUSD/>
    <CrossRateOther>1.1678</CrossRateOther>
  </Currency>
  <Currency CrossOrder="12" Kod="JPY" CurrencyCode="JPY">
    <Unit>100</Unit>
    <Isim>JAPON YENI</Isim>
    <CurrencyName>JAPENESE YEN</CurrencyName>
    <ForexBuying>27.7524</ForexBuying>
    <ForexSelling>27.9361</ForexSelling>
    <BanknoteBuying>27.6537</BanknoteBuying>
    <BanknoteSelling>28.0409</BanknoteSelling>
    <CrossRateUSD>150.62</CrossRateUSD>
    <CrossRateOther/>
  </Currency>
  <Currency CrossOrder="19" Kod="XDR" CurrencyCode="XDR">
    <Unit>1</Unit>
    <Isim>OZEL CEKME HAKKI (SDR)</Isim>
    <CurrencyName>SPECIAL DRAWING RIGHT (SDR)</CurrencyName>
    <ForexBuying>57.1520</ForexBuying>
    <ForexSelling></ForexSelling>
    <BanknoteBuying></BanknoteBuying>
    <BanknoteSelling></BanknoteSelling>
    <CrossRateUSD/>
    <CrossRateOther/>
  </Currency>
</Tarih_Date>"#;

    #[test]
    fn test_parse_bulletin() {
        let fallback = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let bulletin = parse_bulletin(BULLETIN, fallback).unwrap();
        assert_eq!(bulletin.date, NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
        assert_eq!(bulletin.rates.len(), 4);
        let usd = bulletin.rate("USD").unwrap();
        assert_eq!(usd.name, "ABD DOLARI");
        assert_eq!(usd.forex_buying, Some(41.8046));
        assert_eq!(bulletin.selling_rate("USD"), Some(41.8799));
        assert_fuzzy_eq!(bulletin.selling_rate("JPY").unwrap(), 0.279361, 1e-9);
        assert_eq!(bulletin.rate("XDR").unwrap().forex_selling, None);
        assert_eq!(bulletin.selling_rate("XDR"), None);
        assert_eq!(bulletin.selling_rate("CHF"), None);
    }

    #[test]
    fn test_parse_bulletin_without_date() {
        let xml = BULLETIN.replace(r#"Tarih="17.10.2025""#, "");
        let fallback = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
        let bulletin = parse_bulletin(&xml, fallback).unwrap();
        assert_eq!(bulletin.date, fallback);
    }

    #[test]
    fn test_parse_empty_bulletin() {
        let fallback = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
        assert!(parse_bulletin("<Tarih_Date></Tarih_Date>", fallback).is_err());
    }

    #[tokio::test]
    async fn test_fetch_bulletin_retries_short_body() {
        let mut server = mockito::Server::new_async().await;
        let short = server
            .mock("GET", "/kurlar/today.xml")
            .with_status(200)
            .with_body("<error/>")
            .expect(3)
            .create_async()
            .await;
        let tcmb = Tcmb::with_url(reqwest::Client::new(), &format!("{}/kurlar/today.xml", server.url()))
            .with_retries(3, Duration::from_millis(1));
        assert!(tcmb.fetch_bulletin().await.is_err());
        short.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_bulletin() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/kurlar/today.xml")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(BULLETIN)
            .create_async()
            .await;
        let tcmb = Tcmb::with_url(reqwest::Client::new(), &format!("{}/kurlar/today.xml", server.url()));
        let bulletin = tcmb.fetch_bulletin().await.unwrap();
        assert_eq!(bulletin.selling_rate("EUR"), Some(48.9091));
    }
}
