//! Press bulletins of the Turkish Statistical Institute
use std::str::FromStr;

use chrono::NaiveDate;
use log::debug;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use super::{check_status, parse_turkish_number, ProviderError};
use crate::config::DEFAULT_TUIK_URL;
use crate::datatypes::date_time_helper::date_from_turkish_str;
use crate::datatypes::ParseEnumError;

/// Bulletin categories (TÜİK `UstId`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuikCategory {
    Inflation,
    Labor,
    Trade,
    Growth,
}

impl TuikCategory {
    pub fn id(&self) -> u32 {
        match self {
            Self::Inflation => 106,
            Self::Labor => 108,
            Self::Trade => 104,
            Self::Growth => 101,
        }
    }
}

impl FromStr for TuikCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inflation" | "enflasyon" => Ok(Self::Inflation),
            "labor" | "labour" | "unemployment" | "istihdam" => Ok(Self::Labor),
            "trade" | "dis_ticaret" => Ok(Self::Trade),
            "growth" | "gdp" | "buyume" => Ok(Self::Growth),
            _ => Err(ParseEnumError::new("TÜİK category", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bulletin {
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub date_text: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InflationRelease {
    pub annual: Option<f64>,
    pub monthly: Option<f64>,
    pub date: Option<NaiveDate>,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnemploymentRelease {
    pub rate: f64,
    pub date: Option<NaiveDate>,
    pub title: String,
    pub url: Option<String>,
}

fn selector(css: &str) -> Result<Selector, ProviderError> {
    Selector::parse(css).map_err(|e| ProviderError::Parse(format!("invalid selector '{}': {}", css, e)))
}

fn percentage(text: &str, pattern: &str) -> Result<Option<f64>, ProviderError> {
    let re = Regex::new(pattern).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(re
        .captures(text)
        .and_then(|caps| parse_turkish_number(&caps[1])))
}

/// Parse the bulletin list fragment. Relative links are resolved against `base_url`.
pub fn parse_bulletins(html: &str, base_url: &str) -> Result<Vec<Bulletin>, ProviderError> {
    let fragment = Html::parse_fragment(html);
    let bulletin_selector = selector("div.bulletin")?;
    let date_selector = selector("small span")?;
    let link_selector = selector("a")?;
    let summary_selector = selector("p.text-secondary")?;

    let text_of = |element: scraper::ElementRef| -> String {
        element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut bulletins = Vec::new();
    for element in fragment.select(&bulletin_selector) {
        let link = element.select(&link_selector).next();
        let title = link.map(text_of).unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let url = link
            .and_then(|a| a.value().attr("href"))
            .map(|href| {
                if href.starts_with("http") {
                    href.to_string()
                } else {
                    format!("{}/{}", base_url.trim_end_matches('/'), href.trim_start_matches('/'))
                }
            });
        let date_text = element
            .select(&date_selector)
            .next()
            .map(text_of)
            .unwrap_or_default();
        let summary = element
            .select(&summary_selector)
            .next()
            .map(text_of)
            .unwrap_or_default();
        bulletins.push(Bulletin {
            date: date_from_turkish_str(&date_text).ok(),
            title,
            summary,
            url,
            date_text,
        });
    }
    Ok(bulletins)
}

/// Figures of the latest consumer price bulletin
pub fn parse_inflation(bulletins: &[Bulletin]) -> Result<Option<InflationRelease>, ProviderError> {
    let bulletin = match bulletins
        .iter()
        .find(|b| b.title.contains("Tüketici Fiyat Endeksi") && !b.title.contains("Üretici"))
    {
        Some(bulletin) => bulletin,
        None => return Ok(None),
    };
    Ok(Some(InflationRelease {
        annual: percentage(&bulletin.summary, r"(?i)yıllık %(-?\d+(?:,\d+)?)")?,
        monthly: percentage(&bulletin.summary, r"(?i)aylık %(-?\d+(?:,\d+)?)")?,
        date: bulletin.date,
        title: bulletin.title.clone(),
        url: bulletin.url.clone(),
    }))
}

/// Unemployment rate of the latest labour force bulletin
pub fn parse_unemployment(
    bulletins: &[Bulletin],
) -> Result<Option<UnemploymentRelease>, ProviderError> {
    let bulletin = match bulletins
        .iter()
        .find(|b| b.title.contains("İşgücü İstatistikleri"))
    {
        Some(bulletin) => bulletin,
        None => return Ok(None),
    };
    let rate = match percentage(&bulletin.summary, r"(?i)[iİ]şsizlik oranı %(-?\d+(?:,\d+)?)")? {
        Some(rate) => rate,
        None => return Ok(None),
    };
    Ok(Some(UnemploymentRelease {
        rate,
        date: bulletin.date,
        title: bulletin.title.clone(),
        url: bulletin.url.clone(),
    }))
}

pub struct Tuik {
    client: reqwest::Client,
    base_url: String,
}

impl Tuik {
    pub fn new(client: reqwest::Client) -> Tuik {
        Tuik::with_base_url(client, DEFAULT_TUIK_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Tuik {
        Tuik {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the most recent bulletins of a category, optionally restricted to some years
    pub async fn fetch_bulletins(
        &self,
        category: TuikCategory,
        count: u32,
        years: &[i32],
    ) -> Result<Vec<Bulletin>, ProviderError> {
        let mut form = vec![
            ("UstId", category.id().to_string()),
            ("DilId", "1".to_string()),
            ("Count", count.to_string()),
        ];
        for year in years {
            form.push(("VeriYillari", year.to_string()));
        }
        let resp = self
            .client
            .post(format!("{}/Kategori/GetHaberBultenleri", self.base_url))
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()
            .await?;
        let html = check_status(resp)?.text().await?;
        let bulletins = parse_bulletins(&html, &self.base_url)?;
        debug!("TÜİK returned {} bulletins for {:?}", bulletins.len(), category);
        Ok(bulletins)
    }
}
