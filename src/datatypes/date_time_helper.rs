use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::{Europe::Istanbul, Tz};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DateTimeError {
    #[error("Failed to parse (date-)time")]
    DateTimeParseFailed(#[from] chrono::format::ParseError),
    #[error("Conversion of date-time failed")]
    DateTimeConversionFailed,
    #[error("Failed to parse (date-)time from string '{0}'")]
    StringParseError(String),
}

const TURKISH_MONTHS: [&str; 12] = [
    "ocak", "şubat", "mart", "nisan", "mayıs", "haziran", "temmuz", "ağustos", "eylül", "ekim",
    "kasım", "aralık",
];

/// Create UTC time from a UNIX epoch timestamp (i.e seconds since 1st Jan 1970)
pub fn unix_to_date_time(seconds: i64) -> Result<DateTime<Utc>, DateTimeError> {
    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or(DateTimeError::DateTimeConversionFailed)
}

/// UTC calendar date of a timestamp given in milliseconds since epoch
pub fn unix_millis_to_date(millis: i64) -> Result<NaiveDate, DateTimeError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.date_naive())
        .ok_or(DateTimeError::DateTimeConversionFailed)
}

/// Parse a date in the provided format
pub fn date_from_str(date_str: &str, format: &str) -> Result<NaiveDate, DateTimeError> {
    Ok(NaiveDate::parse_from_str(date_str.trim(), format)?)
}

/// Parse dates in the `DD.MM.YYYY` notation used by TCMB and TEFAS
pub fn date_from_dotted_str(date_str: &str) -> Result<NaiveDate, DateTimeError> {
    date_from_str(date_str, "%d.%m.%Y")
}

pub fn format_dotted_date(date: &NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Month number (1-12) of a Turkish month name, case is ignored
pub fn turkish_month(name: &str) -> Option<u32> {
    let name = name.trim().to_lowercase();
    TURKISH_MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

/// Parse dates written out in Turkish, e.g. `3 Ekim 2025`.
/// Anything after the year (like a time of day) is ignored.
pub fn date_from_turkish_str(date_str: &str) -> Result<NaiveDate, DateTimeError> {
    let parts: Vec<&str> = date_str.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(DateTimeError::StringParseError(date_str.to_string()));
    }
    let day: u32 = parts[0]
        .trim_end_matches('.')
        .parse()
        .map_err(|_| DateTimeError::StringParseError(date_str.to_string()))?;
    let month =
        turkish_month(parts[1]).ok_or_else(|| DateTimeError::StringParseError(date_str.to_string()))?;
    let year: i32 = parts[2]
        .parse()
        .map_err(|_| DateTimeError::StringParseError(date_str.to_string()))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or(DateTimeError::DateTimeConversionFailed)
}

/// Current time at the Istanbul exchange
pub fn istanbul_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&Istanbul)
}

/// Current calendar date in Istanbul
pub fn today_in_istanbul() -> NaiveDate {
    istanbul_now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_to_date_time() {
        let date = unix_to_date_time(1587099600).unwrap();
        let date_string = date.format("%Y-%m-%d %H:%M:%S").to_string();
        assert_eq!("2020-04-17 05:00:00", &date_string);
    }

    #[test]
    fn test_unix_millis_to_date() {
        let date = unix_millis_to_date(1_729_123_200_000).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 10, 17).unwrap());
    }

    #[test]
    fn test_dotted_dates() {
        let date = date_from_dotted_str("17.10.2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
        assert_eq!(format_dotted_date(&date), "17.10.2025");
        assert!(date_from_dotted_str("2025-10-17").is_err());
    }

    #[test]
    fn test_turkish_dates() {
        assert_eq!(
            date_from_turkish_str("3 Ekim 2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 3).unwrap()
        );
        assert_eq!(
            date_from_turkish_str("15 Ağustos 2024 10:00").unwrap(),
            NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()
        );
        assert_eq!(
            date_from_turkish_str("01 ŞUBAT 2023").unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()
        );
        assert!(date_from_turkish_str("3 October 2025").is_err());
        assert!(date_from_turkish_str("Ekim 2025").is_err());
    }

    #[test]
    fn test_turkish_month() {
        assert_eq!(turkish_month("Ocak"), Some(1));
        assert_eq!(turkish_month("aralık"), Some(12));
        assert_eq!(turkish_month("Kasım"), Some(11));
        assert_eq!(turkish_month("January"), None);
    }
}
