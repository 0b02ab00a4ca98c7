//! Tabular format definitions and row shapes
//!
//! A [`MappingDefinition`] describes one importable layout: which headers it
//! needs, how headers map onto transaction fields, and optional hooks for
//! per-row fixups and multi-row grouping. Definitions are plain static data
//! registered once at start-up.

use std::collections::BTreeMap;
use std::fmt;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::decimal::clean_decimal;
use super::label::Label;

/// Transaction field a column can be mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    Description,
    Label,
    /// Signed amount, resolved into a from or to leg by sign
    Amount,
    /// Currency of the signed amount
    Currency,
    FromAmount,
    FromCurrency,
    ToAmount,
    ToCurrency,
    FeeAmount,
    FeeCurrency,
    NetWorthAmount,
    NetWorthCurrency,
    FeeWorthAmount,
    FeeWorthCurrency,
    Txhash,
    Txsrc,
    Txdest,
    ExternalId,
    GroupName,
}

impl Field {
    /// Fields holding amounts; these are summed when rows are grouped
    pub const AMOUNTS: &'static [Field] = &[
        Field::Amount,
        Field::FromAmount,
        Field::ToAmount,
        Field::FeeAmount,
        Field::NetWorthAmount,
        Field::FeeWorthAmount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Description => "description",
            Self::Label => "label",
            Self::Amount => "amount",
            Self::Currency => "currency",
            Self::FromAmount => "from_amount",
            Self::FromCurrency => "from_currency",
            Self::ToAmount => "to_amount",
            Self::ToCurrency => "to_currency",
            Self::FeeAmount => "fee_amount",
            Self::FeeCurrency => "fee_currency",
            Self::NetWorthAmount => "net_worth_amount",
            Self::NetWorthCurrency => "net_worth_currency",
            Self::FeeWorthAmount => "fee_worth_amount",
            Self::FeeWorthCurrency => "fee_worth_currency",
            Self::Txhash => "txhash",
            Self::Txsrc => "txsrc",
            Self::Txdest => "txdest",
            Self::ExternalId => "external_id",
            Self::GroupName => "group_name",
        }
    }

    pub fn is_amount(&self) -> bool {
        Self::AMOUNTS.contains(self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header comparison key: trimmed, inner whitespace collapsed, lowercased
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One data row as read from the file, cells in header order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// 1-based data row number (header excluded)
    pub number: usize,
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(number: usize, cells: Vec<(String, String)>) -> Self {
        Self { number, cells }
    }

    /// Cell for `header`, compared whitespace/case-insensitively
    pub fn get(&self, header: &str) -> Option<&str> {
        let wanted = normalize_header(header);
        self.cells
            .iter()
            .find(|(h, _)| normalize_header(h) == wanted)
            .map(|(_, v)| v.as_str())
    }

    /// Non-blank trimmed cell for `header`
    pub fn value(&self, header: &str) -> Option<&str> {
        self.get(header).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.get(header).is_some()
    }

    /// First non-blank cell whose header satisfies `pred`
    pub fn find_value(&self, pred: impl Fn(&str) -> bool) -> Option<&str> {
        self.cells
            .iter()
            .filter(|(h, _)| pred(h))
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

/// A row after header mapping: transaction fields as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappedRow {
    fields: BTreeMap<Field, String>,
}

impl MappedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Set a field; blank values remove it
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, value.to_string());
        }
    }

    pub fn set_opt(&mut self, field: Field, value: Option<&str>) {
        match value {
            Some(v) => self.set(field, v),
            None => {
                self.fields.remove(&field);
            }
        }
    }

    pub fn take(&mut self, field: Field) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// Move a signed `amount`/`currency` pair onto the leg its sign implies.
    /// Rows that already carry a from or to amount are left alone.
    pub fn resolve_signed_amount(&mut self, comma_as_decimal: bool) {
        if self.contains(Field::FromAmount) || self.contains(Field::ToAmount) {
            return;
        }
        let Some(amount) = self.take(Field::Amount) else {
            return;
        };
        let currency = self.take(Field::Currency);
        let value = clean_decimal(&amount, comma_as_decimal);
        let magnitude = value.abs().normalize().to_string();

        let (amount_field, currency_field) = if value.is_sign_negative() {
            (Field::FromAmount, Field::FromCurrency)
        } else {
            (Field::ToAmount, Field::ToCurrency)
        };
        self.set(amount_field, magnitude);
        self.set_opt(currency_field, currency.as_deref());
    }
}

/// Where a field's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSource {
    One(&'static str),
    /// Candidate headers; the first one present in the file wins
    AnyOf(&'static [&'static str]),
}

impl HeaderSource {
    pub fn resolve<'a>(&self, row: &'a RawRow) -> Option<&'a str> {
        match self {
            Self::One(header) => row.value(header),
            Self::AnyOf(headers) => headers
                .iter()
                .find(|h| row.has_header(h))
                .and_then(|h| row.value(h)),
        }
    }
}

/// What a process hook decided for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Keep,
    Skip(&'static str),
}

/// Options a CSV run hands to format hooks
#[derive(Debug, Clone, Default)]
pub struct MapperOptions {
    pub timezone: Option<Tz>,
    /// Currency for layouts without a currency column
    pub currency_id: Option<String>,
    pub deposit_label: Option<Label>,
    pub wallet_service_tag: Option<String>,
    pub extra: BTreeMap<String, String>,
}

pub type GroupKeyFn = fn(&MappedRow, &RawRow) -> Option<String>;
pub type GroupEligibleFn = fn(&MappedRow, &RawRow) -> bool;
pub type ProcessHook = fn(&mut MappedRow, &RawRow, &MapperOptions) -> RowAction;

/// Rows sharing a key collapse into one row
#[derive(Debug, Clone, Copy)]
pub struct GroupRule {
    pub key: GroupKeyFn,
    /// Rows failing this are never grouped
    pub eligible: Option<GroupEligibleFn>,
}

/// Declarative description of one importable layout
#[derive(Debug, Clone)]
pub struct MappingDefinition {
    pub id: &'static str,
    /// Wallet service this layout belongs to
    pub tag: Option<&'static str>,
    pub required_headers: &'static [&'static str],
    pub optional_headers: &'static [&'static str],
    pub header_mappings: &'static [(Field, HeaderSource)],
    /// Substrings expected in matching file names
    pub file_name_hints: &'static [&'static str],
    /// Options the caller must supply before rows can be mapped
    pub required_options: &'static [&'static str],
    pub comma_as_decimal: bool,
    pub group: Option<GroupRule>,
    pub process: Option<ProcessHook>,
    /// Known layout that cannot be imported; the run fails with this message
    pub error: Option<&'static str>,
}

impl MappingDefinition {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            tag: None,
            required_headers: &[],
            optional_headers: &[],
            header_mappings: &[],
            file_name_hints: &[],
            required_options: &[],
            comma_as_decimal: false,
            group: None,
            process: None,
            error: None,
        }
    }

    /// Apply the header mappings to one raw row
    pub fn map_row(&self, row: &RawRow) -> MappedRow {
        let mut mapped = MappedRow::new();
        for (field, source) in self.header_mappings {
            if let Some(value) = source.resolve(row) {
                mapped.set(*field, value);
            }
        }
        mapped
    }
}
