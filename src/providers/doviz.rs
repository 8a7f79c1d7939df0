//! Live market figures scraped from the doviz.com front page
use log::{debug, warn};
use scraper::{Html, Selector};
use serde::Serialize;

use super::{check_status, parse_turkish_number, ProviderError};
use crate::config::DEFAULT_DOVIZ_URL;
use crate::datatypes::Board;

/// A value shown on the page, addressed by its socket key
#[derive(Debug, Clone, Copy)]
pub struct DovizTarget {
    pub key: &'static str,
    pub code: &'static str,
    pub name: &'static str,
    pub board: Board,
}

pub const TARGETS: [DovizTarget; 6] = [
    DovizTarget { key: "USD", code: "USD/TRY", name: "Dolar/TL", board: Board::Indices },
    DovizTarget { key: "EUR", code: "EUR/TRY", name: "Euro/TL", board: Board::Indices },
    DovizTarget { key: "gram-altin", code: "GRAM_ALTIN", name: "Gram Altın", board: Board::Commodities },
    DovizTarget { key: "XU100", code: "XU100", name: "BIST 100", board: Board::Indices },
    DovizTarget { key: "ons-altin", code: "GC=F", name: "Ons Altın", board: Board::Commodities },
    DovizTarget { key: "bitcoin", code: "BTC", name: "Bitcoin", board: Board::Indices },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DovizQuote {
    pub code: String,
    pub name: String,
    pub board: Board,
    pub value: f64,
}

/// Values found on the page together with the keys that were missing or unreadable
#[derive(Debug, Clone, Default, Serialize)]
pub struct DovizSnapshot {
    pub quotes: Vec<DovizQuote>,
    pub failed: Vec<String>,
}

pub fn parse_doviz_page(html: &str) -> Result<DovizSnapshot, ProviderError> {
    let document = Html::parse_document(html);
    let mut snapshot = DovizSnapshot::default();
    for target in TARGETS.iter() {
        let css = format!(r#"span.value[data-socket-key="{}"]"#, target.key);
        let selector = Selector::parse(&css)
            .map_err(|e| ProviderError::Parse(format!("invalid selector '{}': {}", css, e)))?;
        let value = document
            .select(&selector)
            .next()
            .and_then(|span| parse_turkish_number(&span.text().collect::<String>()));
        match value {
            Some(value) => snapshot.quotes.push(DovizQuote {
                code: target.code.to_string(),
                name: target.name.to_string(),
                board: target.board,
                value,
            }),
            None => {
                warn!("doviz.com value for {} not found", target.key);
                snapshot.failed.push(target.key.to_string());
            }
        }
    }
    Ok(snapshot)
}

pub struct Doviz {
    client: reqwest::Client,
    url: String,
}

impl Doviz {
    pub fn new(client: reqwest::Client) -> Doviz {
        Doviz::with_url(client, DEFAULT_DOVIZ_URL)
    }

    pub fn with_url(client: reqwest::Client, url: &str) -> Doviz {
        Doviz {
            client,
            url: url.to_string(),
        }
    }

    pub async fn fetch_snapshot(&self) -> Result<DovizSnapshot, ProviderError> {
        let resp = self.client.get(&self.url).send().await?;
        let html = check_status(resp)?.text().await?;
        let snapshot = parse_doviz_page(&html)?;
        debug!(
            "doviz.com: {} values, {} missing",
            snapshot.quotes.len(),
            snapshot.failed.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const PAGE: &str = r#"<html><body>
<div class="market-data">
  <div class="item"><a href="/doviz/usd"><span class="name">DOLAR</span>
    <span class="value" data-socket-key="USD" data-socket-attr="s">41,8512</span></a></div>
  <div class="item"><a href="/doviz/eur"><span class="name">EURO</span>
    <span class="value" data-socket-key="EUR" data-socket-attr="s">48,8731</span></a></div>
  <div class="item"><span class="value" data-socket-key="gram-altin">5.742,31</span></div>
  <div class="item"><span class="value" data-socket-key="XU100">10.245,67</span></div>
  <div class="item"><span class="value" data-socket-key="ons-altin">$4.268,10</span></div>
  <div class="item"><span class="value" data-socket-key="bitcoin">-</span></div>
</div></body></html>"#;

    #[test]
    fn test_parse_doviz_page() {
        let snapshot = parse_doviz_page(PAGE).unwrap();
        assert_eq!(snapshot.quotes.len(), 5);
        assert_eq!(snapshot.failed, vec!["bitcoin".to_string()]);
        assert_eq!(snapshot.quotes[0].code, "USD/TRY");
        assert_eq!(snapshot.quotes[0].value, 41.8512);
        let gold = snapshot.quotes.iter().find(|q| q.code == "GRAM_ALTIN").unwrap();
        assert_eq!(gold.value, 5742.31);
        assert_eq!(gold.board, Board::Commodities);
        let ounce = snapshot.quotes.iter().find(|q| q.code == "GC=F").unwrap();
        assert_eq!(ounce.value, 4268.10);
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;
        let doviz = Doviz::with_url(reqwest::Client::new(), &server.url());
        let snapshot = doviz.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.quotes.len(), 5);
    }
}
