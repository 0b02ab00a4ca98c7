//! Value normalization port
//!
//! Dates, amounts and transaction hashes arrive in whatever shape a source
//! uses. The entity layer relies on these three operations to turn them into
//! canonical values.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::domain::{RawAmount, RawDate};

/// Flags for amount normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmountOptions {
    /// Keep up to 18 decimal places instead of 10 (tokens with tiny units)
    pub small_decimals: bool,
    /// Report a zero amount as absent
    pub no_zero: bool,
    /// Read `,` as the decimal separator when no `.` is present
    pub comma_as_decimal: bool,
}

/// Normalizer trait
///
/// Implementations must be pure: the same input always yields the same
/// output, and nothing is read from or written to the outside world.
pub trait Normalizer: Send + Sync {
    /// Parse a date. `timezone` applies to values without an offset.
    /// Returns `None` when the value cannot be read; the entity rejects it.
    fn normalize_date(&self, raw: &RawDate, timezone: Option<Tz>) -> Option<DateTime<Utc>>;

    /// Turn a raw amount into a signed decimal
    fn normalize_amount(&self, raw: &RawAmount, options: AmountOptions) -> Option<Decimal>;

    /// Canonical form of a transaction hash, `None` when blank
    fn normalize_hash(&self, raw: &str) -> Option<String>;
}
