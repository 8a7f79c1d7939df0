//! Exchange rates from TCMB, EVDS series, US series from FRED and headline figures from TÜİK
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use serde_json::json;

use super::SyncError;
use crate::analytics::stats::round_to;
use crate::datatypes::date_time_helper::{format_dotted_date, today_in_istanbul};
use crate::datatypes::{DataHandler, EconomicIndicator, EconomicValue, MacroObservation};
use crate::providers::evds::{Evds, EvdsObservation, EvdsSeries};
use crate::providers::fred::{series_unit, Fred, FredObservation, DEFAULT_SERIES};
use crate::providers::tcmb::{FxBulletin, Tcmb, TRACKED_CURRENCIES};
use crate::providers::tuik::{parse_inflation, parse_unemployment, Bulletin, Tuik, TuikCategory};
use crate::providers::{DataSource, ProviderError};

/// Number of observations per series requested when syncing all of FRED
const FRED_BATCH_LIMIT: u32 = 24;
/// Number of bulletins scanned for a TÜİK release
const TUIK_BULLETIN_COUNT: u32 = 20;
const MONETARY_POLICY: &str = "Para Politikası";
const EMPLOYMENT: &str = "İstihdam";
const RISK: &str = "Risk";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateEntry {
    pub currency: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TcmbReport {
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub date: NaiveDate,
    pub rates: Vec<RateEntry>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FredSeriesReport {
    pub series_id: String,
    pub count: usize,
    pub stored: usize,
    pub observations: Vec<FredObservation>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FredBatchReport {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvdsSeriesResult {
    pub indicator: EvdsSeries,
    pub series_code: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvdsReport {
    pub results: Vec<EvdsSeriesResult>,
    pub total_duration_ms: u128,
}

/// Dashboard row (code, name, category) of EVDS series not covered by another source
fn evds_dashboard(series: EvdsSeries) -> Option<(&'static str, &'static str, &'static str)> {
    match series {
        EvdsSeries::PolicyRate => Some(("POLICY_RATE", "Politika Faizi", MONETARY_POLICY)),
        EvdsSeries::M3 => Some(("M3", "M3 Para Arzı", MONETARY_POLICY)),
        EvdsSeries::Reserves => Some(("GROSS_RESERVES", "Brüt Rezervler", MONETARY_POLICY)),
        EvdsSeries::Cds => Some(("CDS_5Y", "CDS Primi (5 Yıllık)", RISK)),
        _ => None,
    }
}

pub struct MacroSync {
    db: Arc<dyn DataHandler>,
    tcmb: Arc<Tcmb>,
    evds: Arc<Evds>,
    fred: Arc<Fred>,
    tuik: Arc<Tuik>,
}

impl MacroSync {
    pub fn new(
        db: Arc<dyn DataHandler>,
        tcmb: Arc<Tcmb>,
        evds: Arc<Evds>,
        fred: Arc<Fred>,
        tuik: Arc<Tuik>,
    ) -> Self {
        MacroSync {
            db,
            tcmb,
            evds,
            fred,
            tuik,
        }
    }

    pub fn has_fred_key(&self) -> bool {
        self.fred.has_api_key()
    }

    /// Store the rate of one currency and update its dashboard indicator
    async fn store_rate(&self, bulletin: &FxBulletin, code: &str) -> Result<f64, SyncError> {
        let rate = bulletin
            .selling_rate(code)
            .ok_or_else(|| ProviderError::NotFound(format!("{} rate", code)))?;
        let date = bulletin.date;
        let source = DataSource::Tcmb.to_string();
        self.db
            .upsert_macro_observation(&MacroObservation {
                country: "TR".to_string(),
                indicator: format!("Exchange Rate {}/TRY", code),
                value: rate,
                unit: "TRY".to_string(),
                date,
                source: source.clone(),
                metadata: json!({
                    "currency_code": code,
                    "bulletin_date": format_dotted_date(&date),
                }),
            })
            .await?;

        let indicator_code = format!("{}_TRY", code);
        let year_ago = self
            .db
            .get_economic_value_on_or_before(&indicator_code, date - Duration::days(365))
            .await?;
        self.db
            .upsert_economic_value(&EconomicValue {
                indicator_code: indicator_code.clone(),
                period_date: date,
                value: rate,
                source: source.clone(),
            })
            .await?;

        let (previous_value, change_percent) = match year_ago {
            Some(previous) if previous.value > 0.0 => (
                Some(previous.value),
                Some(round_to((rate - previous.value) / previous.value * 100.0, 2)),
            ),
            _ => (None, None),
        };
        self.db
            .upsert_indicator(&EconomicIndicator {
                indicator_code,
                indicator_name: format!("{}/TL Kuru", code),
                category: MONETARY_POLICY.to_string(),
                current_value: rate,
                previous_value,
                change_percent,
                period_date: date,
                unit: "TL".to_string(),
                source,
                last_updated: Utc::now(),
            })
            .await?;
        Ok(rate)
    }

    /// Store today's TCMB rates of the tracked currencies. Missing currencies are
    /// reported but don't fail the run.
    pub async fn sync_tcmb(&self) -> Result<TcmbReport, SyncError> {
        let bulletin = self.tcmb.fetch_bulletin().await?;
        let mut report = TcmbReport {
            total: TRACKED_CURRENCIES.len(),
            success_count: 0,
            failed_count: 0,
            date: bulletin.date,
            rates: Vec::new(),
            errors: Vec::new(),
        };
        for code in TRACKED_CURRENCIES {
            match self.store_rate(&bulletin, code).await {
                Ok(rate) => {
                    report.success_count += 1;
                    report.rates.push(RateEntry {
                        currency: code.to_string(),
                        rate: round_to(rate, 4),
                    });
                }
                Err(err) => {
                    warn!("TCMB rate of {} not stored: {}", code, err);
                    report.failed_count += 1;
                    report.errors.push(format!("{}: {}", code, err));
                }
            }
        }
        info!(
            "TCMB sync of {}: {} stored, {} failed",
            report.date, report.success_count, report.failed_count
        );
        Ok(report)
    }

    /// Store the observations of an EVDS series. Series without another source
    /// also update their dashboard indicator. Returns the number of stored values.
    async fn store_evds_series(
        &self,
        series: EvdsSeries,
        observations: &[EvdsObservation],
    ) -> Result<usize, SyncError> {
        let source = DataSource::Evds.to_string();
        let values: Vec<(NaiveDate, f64)> = observations
            .iter()
            .filter_map(|obs| obs.value.map(|value| (obs.date, value)))
            .collect();
        for (date, value) in &values {
            self.db
                .upsert_macro_observation(&MacroObservation {
                    country: "TR".to_string(),
                    indicator: series.series_code().to_string(),
                    value: *value,
                    unit: series.unit().to_string(),
                    date: *date,
                    source: source.clone(),
                    metadata: json!({
                        "indicator_code": series.code(),
                        "series_code": series.series_code(),
                    }),
                })
                .await?;
        }

        let (code, name, category) = match evds_dashboard(series) {
            Some(row) => row,
            None => return Ok(values.len()),
        };
        for (date, value) in &values {
            self.db
                .upsert_economic_value(&EconomicValue {
                    indicator_code: code.to_string(),
                    period_date: *date,
                    value: *value,
                    source: source.clone(),
                })
                .await?;
        }
        if let Some((date, value)) = values.last() {
            let previous_value = values.len().checked_sub(2).map(|i| values[i].1);
            let change_percent = previous_value
                .filter(|previous| *previous > 0.0)
                .map(|previous| round_to((value - previous) / previous * 100.0, 2));
            self.db
                .upsert_indicator(&EconomicIndicator {
                    indicator_code: code.to_string(),
                    indicator_name: name.to_string(),
                    category: category.to_string(),
                    current_value: *value,
                    previous_value,
                    change_percent,
                    period_date: *date,
                    unit: series.unit().to_string(),
                    source,
                    last_updated: Utc::now(),
                })
                .await?;
        }
        Ok(values.len())
    }

    /// Fetch and store EVDS series between `start` and `end` (default today).
    /// A failing series is reported without stopping the others.
    pub async fn sync_evds(
        &self,
        series: &[EvdsSeries],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<EvdsReport, SyncError> {
        if !self.evds.has_api_key() {
            return Err(ProviderError::MissingApiKey("EVDS_API_KEY").into());
        }
        let started = std::time::Instant::now();
        let end = end.unwrap_or_else(today_in_istanbul);
        let mut results = Vec::with_capacity(series.len());
        for &item in series {
            let outcome = match self.evds.fetch_series(item, start, end).await {
                Ok(observations) => self.store_evds_series(item, &observations).await,
                Err(err) => Err(err.into()),
            };
            let result = match outcome {
                Ok(count) => {
                    info!("stored {} values of EVDS series {}", count, item.series_code());
                    EvdsSeriesResult {
                        indicator: item,
                        series_code: item.series_code(),
                        success: true,
                        records_count: Some(count),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!("EVDS series {} failed: {}", item.series_code(), err);
                    EvdsSeriesResult {
                        indicator: item,
                        series_code: item.series_code(),
                        success: false,
                        records_count: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            results.push(result);
        }
        Ok(EvdsReport {
            results,
            total_duration_ms: started.elapsed().as_millis(),
        })
    }

    /// Store the observations of a FRED series, skipping missing values
    pub async fn sync_fred_series(
        &self,
        series_id: &str,
        limit: Option<u32>,
    ) -> Result<FredSeriesReport, SyncError> {
        let observations = self.fred.fetch_observations(series_id, limit).await?;
        let mut stored = 0;
        for obs in &observations {
            let value = match obs.value {
                Some(value) => value,
                None => continue,
            };
            self.db
                .upsert_macro_observation(&MacroObservation {
                    country: "US".to_string(),
                    indicator: series_id.to_string(),
                    value,
                    unit: series_unit(series_id).to_string(),
                    date: obs.date,
                    source: DataSource::Fred.to_string(),
                    metadata: json!({
                        "series_id": series_id,
                        "realtime_start": obs.realtime_start,
                        "realtime_end": obs.realtime_end,
                    }),
                })
                .await?;
            stored += 1;
        }
        info!("stored {} observations of {}", stored, series_id);
        Ok(FredSeriesReport {
            series_id: series_id.to_string(),
            count: observations.len(),
            stored,
            observations,
        })
    }

    /// Recent observations of the default series
    pub async fn sync_fred_all(&self) -> Result<FredBatchReport, SyncError> {
        if !self.fred.has_api_key() {
            return Err(ProviderError::MissingApiKey("FRED_API_KEY").into());
        }
        let results = join_all(
            DEFAULT_SERIES
                .iter()
                .map(|id| self.sync_fred_series(id, Some(FRED_BATCH_LIMIT))),
        )
        .await;
        let mut report = FredBatchReport::default();
        for (id, result) in DEFAULT_SERIES.iter().zip(results) {
            match result {
                Ok(_) => report.success.push(id.to_string()),
                Err(err) => {
                    warn!("FRED series {} failed: {}", id, err);
                    report.failed.push(id.to_string());
                }
            }
        }
        Ok(report)
    }

    /// Latest bulletins of a TÜİK category, not stored
    pub async fn tuik_bulletins(&self, category: TuikCategory) -> Result<Vec<Bulletin>, SyncError> {
        Ok(self
            .tuik
            .fetch_bulletins(category, TUIK_BULLETIN_COUNT, &[])
            .await?)
    }

    /// Store a TÜİK headline figure as dashboard indicator, history value and observation
    async fn store_tuik_figure(
        &self,
        code: &str,
        name: &str,
        category: &str,
        value: f64,
        date: NaiveDate,
        bulletin_url: Option<&str>,
    ) -> Result<EconomicIndicator, SyncError> {
        let source = DataSource::Tuik.to_string();
        // keep the figure of the previous release when a new period arrives
        let previous_value = match self.db.get_indicator(code).await? {
            Some(old) if old.period_date < date => Some(old.current_value),
            Some(old) => old.previous_value,
            None => None,
        };
        let indicator = EconomicIndicator {
            indicator_code: code.to_string(),
            indicator_name: name.to_string(),
            category: category.to_string(),
            current_value: value,
            previous_value,
            change_percent: None,
            period_date: date,
            unit: "%".to_string(),
            source: source.clone(),
            last_updated: Utc::now(),
        };
        self.db.upsert_indicator(&indicator).await?;
        self.db
            .upsert_economic_value(&EconomicValue {
                indicator_code: code.to_string(),
                period_date: date,
                value,
                source: source.clone(),
            })
            .await?;
        self.db
            .upsert_macro_observation(&MacroObservation {
                country: "TR".to_string(),
                indicator: code.to_string(),
                value,
                unit: "Percent".to_string(),
                date,
                source,
                metadata: json!({ "bulletin_url": bulletin_url }),
            })
            .await?;
        info!("updated {}: {}% ({})", code, value, date);
        Ok(indicator)
    }

    /// Annual and monthly consumer price inflation (TUFE, TUFE_MONTHLY) from the latest CPI bulletin
    pub async fn sync_tuik_inflation(&self) -> Result<Vec<EconomicIndicator>, SyncError> {
        let bulletins = self
            .tuik
            .fetch_bulletins(TuikCategory::Inflation, TUIK_BULLETIN_COUNT, &[])
            .await?;
        let release = parse_inflation(&bulletins)?.ok_or(SyncError::NoRelease("inflation"))?;
        let date = release.date.unwrap_or_else(today_in_istanbul);
        let url = release.url.as_deref();

        let mut stored = Vec::new();
        if let Some(annual) = release.annual {
            stored.push(
                self.store_tuik_figure("TUFE", "Tüketici Enflasyonu (Yıllık)", MONETARY_POLICY, annual, date, url)
                    .await?,
            );
        } else {
            warn!("no annual inflation rate in '{}'", release.title);
        }
        if let Some(monthly) = release.monthly {
            stored.push(
                self.store_tuik_figure(
                    "TUFE_MONTHLY",
                    "Tüketici Enflasyonu (Aylık)",
                    MONETARY_POLICY,
                    monthly,
                    date,
                    url,
                )
                .await?,
            );
        }
        Ok(stored)
    }

    /// Unemployment rate (UNEMPLOYMENT_RATE) from the latest labour force bulletin
    pub async fn sync_tuik_unemployment(&self) -> Result<EconomicIndicator, SyncError> {
        let year = today_in_istanbul().year();
        let bulletins = self
            .tuik
            .fetch_bulletins(TuikCategory::Labor, TUIK_BULLETIN_COUNT, &[year + 1, year, year - 1])
            .await?;
        let release = parse_unemployment(&bulletins)?.ok_or(SyncError::NoRelease("unemployment"))?;
        let date = release.date.unwrap_or_else(today_in_istanbul);
        self.store_tuik_figure(
            "UNEMPLOYMENT_RATE",
            "İşsizlik Oranı",
            EMPLOYMENT,
            release.rate,
            date,
            release.url.as_deref(),
        )
        .await
    }
}
