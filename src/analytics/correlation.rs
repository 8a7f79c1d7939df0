use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::stats::{pearson_correlation, round_to};
use super::{require, AnalysisError};

/// Minimal number of dates all series need to share
pub const MIN_COMMON_DATES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub matrix: BTreeMap<String, BTreeMap<String, f64>>,
    pub dates: Vec<NaiveDate>,
    pub sample_size: usize,
}

/// Correlations of prices over the dates shared by all series
pub fn correlation_matrix(
    series: &[(String, Vec<(NaiveDate, f64)>)],
) -> Result<CorrelationMatrix, AnalysisError> {
    let (_, first) = series
        .first()
        .ok_or_else(|| AnalysisError::InvalidInput("no symbols given".to_string()))?;

    let mut common: BTreeSet<NaiveDate> = first.iter().map(|(date, _)| *date).collect();
    for (_, points) in &series[1..] {
        let dates: BTreeSet<NaiveDate> = points.iter().map(|(date, _)| *date).collect();
        common = common.intersection(&dates).copied().collect();
    }
    require(common.len(), MIN_COMMON_DATES)?;
    let dates: Vec<NaiveDate> = common.into_iter().collect();

    let aligned: Vec<Vec<f64>> = series
        .iter()
        .map(|(_, points)| {
            let by_date: HashMap<NaiveDate, f64> = points.iter().copied().collect();
            dates
                .iter()
                .map(|date| by_date.get(date).copied().unwrap_or_default())
                .collect()
        })
        .collect();

    let mut matrix = BTreeMap::new();
    for (i, (symbol_i, _)) in series.iter().enumerate() {
        let mut row = BTreeMap::new();
        for (j, (symbol_j, _)) in series.iter().enumerate() {
            let value = if i == j {
                1.0
            } else {
                round_to(pearson_correlation(&aligned[i], &aligned[j]), 2)
            };
            row.insert(symbol_j.clone(), value);
        }
        matrix.insert(symbol_i.clone(), row);
    }

    Ok(CorrelationMatrix {
        matrix,
        sample_size: dates.len(),
        dates,
    })
}
