//! Dirty decimal cleaning
//!
//! Exports and APIs hand us amounts like `−$1,012.13`, `1e-5 USD` or
//! `89.612179480 Interzone`. [`clean_decimal`] recovers the number or falls
//! back to zero; it never fails.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Largest exponent magnitude accepted in scientific notation.
/// Anything above this is treated as garbage rather than parsed.
pub const MAX_EXPONENT: u64 = 100;

const UNICODE_MINUS: char = '\u{2212}';

/// Runs of two or more letters/spaces: currency words, unit names.
/// A lone `e`/`E` exponent marker survives.
fn word_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z ]{2,}").expect("word run pattern"))
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^-0-9.eE]").expect("disallowed chars pattern"))
}

fn exponent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[eE]-?(\d+)").expect("exponent pattern"))
}

/// Leading numeric part of the cleaned text, the same way a lenient
/// string-to-decimal conversion reads `12-3` as `12`.
fn numeric_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE]-?\d+)?").expect("numeric prefix pattern")
    })
}

/// Clean a free-form amount string into a decimal.
///
/// When `comma_as_decimal` is set and the text has no `.`, commas are read
/// as the decimal separator (`12,5` -> `12.5`). Otherwise commas are
/// thousands separators and dropped.
pub fn clean_decimal(raw: &str, comma_as_decimal: bool) -> Decimal {
    if raw.trim().is_empty() {
        return Decimal::ZERO;
    }

    let mut cleaned = raw.replace(UNICODE_MINUS, "-");

    if comma_as_decimal && !cleaned.contains('.') {
        cleaned = cleaned.replace(',', ".");
    }

    // 7.456.12345687: every dot but the last is a grouping separator
    while cleaned.matches('.').count() > 1 {
        cleaned = cleaned.replacen('.', "", 1);
    }

    if cleaned.ends_with('.') {
        cleaned.pop();
    }

    let cleaned = word_run_re().replace_all(&cleaned, "");
    let cleaned = disallowed_re().replace_all(&cleaned, "").into_owned();

    if cleaned.chars().filter(|c| matches!(c, 'e' | 'E')).count() > 1 {
        return Decimal::ZERO;
    }

    if let Some(caps) = exponent_re().captures(&cleaned) {
        // digit runs too long for u64 are far past the limit anyway
        let magnitude = caps[1].parse::<u64>().unwrap_or(u64::MAX);
        if magnitude > MAX_EXPONENT {
            return Decimal::ZERO;
        }
    }

    parse_lenient(&cleaned)
}

fn parse_lenient(cleaned: &str) -> Decimal {
    let Some(found) = numeric_prefix_re().find(cleaned) else {
        return Decimal::ZERO;
    };

    let text = found.as_str();
    let text = if let Some(rest) = text.strip_prefix("-.") {
        format!("-0.{}", rest)
    } else if let Some(rest) = text.strip_prefix('.') {
        format!("0.{}", rest)
    } else {
        text.to_string()
    };

    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str(&text)
    };

    // out of range for the decimal type
    parsed.unwrap_or(Decimal::ZERO)
}
