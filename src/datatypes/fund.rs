use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ParseEnumError;

/// Fund families published by TEFAS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundType {
    /// Mutual funds (YAT)
    #[default]
    Investment,
    /// Pension funds (EMK)
    Pension,
    /// Exchange traded funds (BYF)
    ExchangeTraded,
}

impl FundType {
    /// Code expected by the TEFAS `fontip` parameter
    pub fn code(&self) -> &'static str {
        match self {
            Self::Investment => "YAT",
            Self::Pension => "EMK",
            Self::ExchangeTraded => "BYF",
        }
    }
}

impl FromStr for FundType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "YAT" | "INVESTMENT" => Ok(Self::Investment),
            "EMK" | "PENSION" => Ok(Self::Pension),
            "BYF" | "ETF" => Ok(Self::ExchangeTraded),
            _ => Err(ParseEnumError::new("fund type", s)),
        }
    }
}

impl fmt::Display for FundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Daily fund price, unique by fund code and date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPrice {
    pub fund_code: String,
    pub fund_name: String,
    pub fund_type: FundType,
    /// Category derived from the fund title, e.g. `equity` or `bond`
    pub category: String,
    pub data_date: NaiveDate,
    pub price: f64,
    pub share_count: Option<f64>,
    pub investor_count: Option<f64>,
    pub portfolio_size: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fund_type_codes() {
        assert_eq!(FundType::from_str("emk").unwrap(), FundType::Pension);
        assert_eq!(FundType::ExchangeTraded.code(), "BYF");
        assert_eq!(FundType::default(), FundType::Investment);
        assert!(FundType::from_str("XYZ").is_err());
    }
}
