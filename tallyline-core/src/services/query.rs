//! Predicates over pending transactions

use std::cmp::Ordering;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{CurrencyDescriptor, Label, TransactionType, Txn};

/// Transaction attribute a query can test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Date,
    Type,
    Label,
    FromAmount,
    FromCurrency,
    ToAmount,
    ToCurrency,
    FeeAmount,
    FeeCurrency,
    Txhash,
    ExternalId,
    ImporterTag,
    GroupName,
    Margin,
    Synced,
}

/// Value of one attribute; absent optional attributes read as `Null`
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Date(DateTime<Utc>),
    Decimal(Decimal),
    Text(String),
    Type(TransactionType),
    Label(Label),
    Currency(CurrencyDescriptor),
    Bool(bool),
}

impl PartialOrd for AttrValue {
    /// Only values of the same ordered kind compare
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Date(a), Self::Date(b)) => a.partial_cmp(b),
            (Self::Decimal(a), Self::Decimal(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            _ if self == other => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

impl From<Decimal> for AttrValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<TransactionType> for AttrValue {
    fn from(v: TransactionType) -> Self {
        Self::Type(v)
    }
}

impl From<Label> for AttrValue {
    fn from(v: Label) -> Self {
        Self::Label(v)
    }
}

impl From<CurrencyDescriptor> for AttrValue {
    fn from(v: CurrencyDescriptor) -> Self {
        Self::Currency(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Eq(AttrValue),
    OneOf(Vec<AttrValue>),
    Within(RangeInclusive<AttrValue>),
}

impl Matcher {
    fn matches(&self, value: &AttrValue) -> bool {
        match self {
            Self::Eq(expected) => value == expected,
            Self::OneOf(options) => options.contains(value),
            Self::Within(range) => range.contains(value),
        }
    }
}

/// Conjunction of attribute predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxnQuery {
    conditions: Vec<(Attribute, Matcher)>,
}

impl TxnQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, attribute: Attribute, value: impl Into<AttrValue>) -> Self {
        self.conditions.push((attribute, Matcher::Eq(value.into())));
        self
    }

    pub fn one_of<V: Into<AttrValue>>(mut self, attribute: Attribute, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((attribute, Matcher::OneOf(values)));
        self
    }

    /// Inclusive range
    pub fn within(mut self, attribute: Attribute, start: impl Into<AttrValue>, end: impl Into<AttrValue>) -> Self {
        self.conditions
            .push((attribute, Matcher::Within(start.into()..=end.into())));
        self
    }

    pub fn matches(&self, txn: &Txn) -> bool {
        self.conditions
            .iter()
            .all(|(attribute, matcher)| matcher.matches(&read(txn, *attribute)))
    }
}

fn read(txn: &Txn, attribute: Attribute) -> AttrValue {
    match attribute {
        Attribute::Date => txn.date.into(),
        Attribute::Type => txn.txn_type().into(),
        Attribute::Label => txn.label.into(),
        Attribute::FromAmount => txn.from_amount.into(),
        Attribute::FromCurrency => txn.from_currency.clone().into(),
        Attribute::ToAmount => txn.to_amount.into(),
        Attribute::ToCurrency => txn.to_currency.clone().into(),
        Attribute::FeeAmount => txn.fee_amount.into(),
        Attribute::FeeCurrency => txn.fee_currency.clone().into(),
        Attribute::Txhash => txn.txhash.clone().into(),
        Attribute::ExternalId => txn.external_id.clone().into(),
        Attribute::ImporterTag => txn.importer_tag.clone().into(),
        Attribute::GroupName => txn.group_name.clone().into(),
        Attribute::Margin => txn.margin.into(),
        Attribute::Synced => txn.synced.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::normalizer::StandardNormalizer;
    use crate::domain::TxnParams;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn txn() -> Txn {
        let btc = CurrencyDescriptor::symbol("BTC").unwrap();
        Txn::build(
            TxnParams::new("2021-06-01 12:00:00")
                .to("0.5", btc)
                .external_id("D-1")
                .label(Label::Mining),
            &StandardNormalizer::new(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_equality() {
        let t = txn();
        assert!(TxnQuery::new().eq(Attribute::ExternalId, "D-1").matches(&t));
        assert!(TxnQuery::new().eq(Attribute::Type, TransactionType::Deposit).matches(&t));
        assert!(!TxnQuery::new().eq(Attribute::ExternalId, "D-2").matches(&t));
        assert!(TxnQuery::new().eq(Attribute::Txhash, AttrValue::Null).matches(&t));
    }

    #[test]
    fn test_membership() {
        let t = txn();
        let q = TxnQuery::new().one_of(Attribute::Label, [Label::Mining, Label::Airdrop]);
        assert!(q.matches(&t));
        let q = TxnQuery::new().one_of(Attribute::Label, [Label::Fork]);
        assert!(!q.matches(&t));
    }

    #[test]
    fn test_range() {
        let t = txn();
        let start = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 6, 2, 0, 0, 0).unwrap();
        assert!(TxnQuery::new().within(Attribute::Date, start, end).matches(&t));
        assert!(TxnQuery::new()
            .within(Attribute::ToAmount, dec!(0.5), dec!(1))
            .matches(&t));
        assert!(!TxnQuery::new()
            .within(Attribute::ToAmount, dec!(0.6), dec!(1))
            .matches(&t));
        // mismatched kinds never fall inside a range
        assert!(!TxnQuery::new().within(Attribute::ToAmount, "a", "z").matches(&t));
    }

    #[test]
    fn test_conjunction() {
        let t = txn();
        let q = TxnQuery::new()
            .eq(Attribute::ExternalId, "D-1")
            .eq(Attribute::Synced, true);
        assert!(!q.matches(&t));
    }
}
