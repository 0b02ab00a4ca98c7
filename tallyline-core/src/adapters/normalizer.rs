//! Standard value normalizer
//!
//! Dates via chrono/chrono-tz, amounts via the decimal cleaner, hashes by
//! simple canonicalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::domain::{clean_decimal, RawAmount, RawDate};
use crate::ports::{AmountOptions, Normalizer};

/// Decimal places kept for regular amounts
pub const DEFAULT_SCALE: u32 = 10;
/// Decimal places kept when `small_decimals` is requested
pub const SMALL_DECIMALS_SCALE: u32 = 18;

/// Timestamps above this are milliseconds (year 5138 in seconds)
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Default [`Normalizer`] implementation
#[derive(Debug, Clone, Default)]
pub struct StandardNormalizer {
    default_timezone: Option<Tz>,
}

impl StandardNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zone for naive dates when the caller passes none
    pub fn with_default_timezone(mut self, tz: Tz) -> Self {
        self.default_timezone = Some(tz);
        self
    }

    fn parse_text(&self, text: &str, tz: Tz) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if text.chars().all(|c| c.is_ascii_digit()) && text.len() >= 9 {
            return from_unix(text.parse().ok()?);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return Some(dt.with_timezone(&Utc));
        }

        // "2021-03-04 10:00:00 UTC" and friends
        let (naive_text, tz) = match text.strip_suffix(" UTC").or_else(|| text.strip_suffix('Z')) {
            Some(rest) => (rest.trim_end(), Tz::UTC),
            None => (text, tz),
        };

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(naive_text, fmt) {
                return localize(naive, tz);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(naive_text, fmt) {
                return localize(date.and_hms_opt(0, 0, 0)?, tz);
            }
        }
        None
    }
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn from_unix(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

impl Normalizer for StandardNormalizer {
    fn normalize_date(&self, raw: &RawDate, timezone: Option<Tz>) -> Option<DateTime<Utc>> {
        let tz = timezone.or(self.default_timezone).unwrap_or(Tz::UTC);
        match raw {
            RawDate::At(dt) => Some(*dt),
            RawDate::Unix(value) => from_unix(*value),
            RawDate::Text(text) => self.parse_text(text, tz),
        }
    }

    fn normalize_amount(&self, raw: &RawAmount, options: AmountOptions) -> Option<Decimal> {
        let value = match raw {
            RawAmount::Number(d) => *d,
            RawAmount::Text(text) => clean_decimal(text, options.comma_as_decimal),
        };
        let scale = if options.small_decimals {
            SMALL_DECIMALS_SCALE
        } else {
            DEFAULT_SCALE
        };
        let value = value.round_dp(scale);

        if options.no_zero && value.is_zero() {
            None
        } else {
            Some(value)
        }
    }

    fn normalize_hash(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim().to_lowercase();
        let hash = trimmed.strip_prefix("0x").unwrap_or(&trimmed);
        (!hash.is_empty()).then(|| hash.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use rust_decimal_macros::dec;

    fn date(text: &str, tz: Option<Tz>) -> Option<DateTime<Utc>> {
        StandardNormalizer::new().normalize_date(&RawDate::from(text), tz)
    }

    #[test]
    fn test_date_formats() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 4, 10, 30, 0).unwrap();
        assert_eq!(date("2021-03-04 10:30:00", None), Some(expected));
        assert_eq!(date("2021-03-04T10:30:00Z", None), Some(expected));
        assert_eq!(date("2021-03-04T12:30:00+02:00", None), Some(expected));
        assert_eq!(date("03/04/2021 10:30:00", None), Some(expected));
        assert_eq!(date("04.03.2021 10:30", None), Some(expected));
        assert_eq!(date("2021-03-04 10:30:00 UTC", None), Some(expected));
        assert_eq!(date("2021-03-04", None).unwrap().day(), 4);
        assert_eq!(date("yesterday", None), None);
        assert_eq!(date("", None), None);
    }

    #[test]
    fn test_naive_dates_use_timezone() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let dt = date("2021-07-01 12:00:00", Some(berlin)).unwrap();
        assert_eq!(dt.hour(), 10);

        // explicit offsets win over the zone
        let dt = date("2021-07-01T12:00:00Z", Some(berlin)).unwrap();
        assert_eq!(dt.hour(), 12);

        let n = StandardNormalizer::new().with_default_timezone(berlin);
        let dt = n.normalize_date(&"2021-07-01 12:00:00".into(), None).unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_unix_timestamps() {
        let n = StandardNormalizer::new();
        let secs = n.normalize_date(&RawDate::Unix(1_614_852_000), None).unwrap();
        let millis = n.normalize_date(&RawDate::Unix(1_614_852_000_000), None).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(date("1614852000", None), Some(secs));
    }

    #[test]
    fn test_amount_rounding() {
        let n = StandardNormalizer::new();
        let raw = RawAmount::from("0.123456789012345678");
        assert_eq!(
            n.normalize_amount(&raw, AmountOptions::default()),
            Some(dec!(0.1234567890))
        );
        let small = AmountOptions {
            small_decimals: true,
            ..Default::default()
        };
        assert_eq!(n.normalize_amount(&raw, small), Some(dec!(0.123456789012345678)));
    }

    #[test]
    fn test_amount_no_zero() {
        let n = StandardNormalizer::new();
        let opts = AmountOptions {
            no_zero: true,
            ..Default::default()
        };
        assert_eq!(n.normalize_amount(&"0.00".into(), opts), None);
        assert_eq!(n.normalize_amount(&"abc".into(), opts), None);
        assert_eq!(
            n.normalize_amount(&"abc".into(), AmountOptions::default()),
            Some(Decimal::ZERO)
        );
        assert_eq!(n.normalize_amount(&RawAmount::from(-3i64), opts), Some(dec!(-3)));
    }

    #[test]
    fn test_hash() {
        let n = StandardNormalizer::new();
        assert_eq!(n.normalize_hash(" 0xABCdef "), Some("abcdef".to_string()));
        assert_eq!(n.normalize_hash("0x"), None);
        assert_eq!(n.normalize_hash("   "), None);
    }
}
