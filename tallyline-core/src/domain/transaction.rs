//! Transaction domain model
//!
//! [`Txn`] is the canonical transaction every import produces. Construction
//! normalizes each field, derives the [`TransactionType`] from the populated
//! currency legs and computes the uniqueness fingerprint. [`Txn::build`]
//! additionally runs validation and refuses invalid entities.

use chrono::{DateTime, Datelike, Months, SecondsFormat, Utc};
use chrono_tz::Tz;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use super::currency::CurrencyDescriptor;
use super::label::{Label, TransactionType};
use super::result::{Error, FieldError, Result};
use super::wallet::WalletRef;
use crate::ports::{AmountOptions, Normalizer};

/// Upper bound on the magnitude of any leg amount (10^15)
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Earliest year a transaction may be dated
pub const MIN_YEAR: i32 = 2009;

/// Prefix of the current fingerprint scheme
pub const FINGERPRINT_VERSION: &str = "v1";

/// Receiving ledgers may truncate to 8 decimals, so a transfer can arrive
/// up to 1e-8 larger than it left.
fn transfer_tolerance() -> Decimal {
    Decimal::new(1, 8)
}

/// Amount exactly as a source delivered it
#[derive(Debug, Clone, PartialEq)]
pub enum RawAmount {
    Text(String),
    Number(Decimal),
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawAmount {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Decimal> for RawAmount {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for RawAmount {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        match Decimal::from_f64(value) {
            Some(d) => Self::Number(d),
            None => Self::Text(value.to_string()),
        }
    }
}

/// Date exactly as a source delivered it
#[derive(Debug, Clone, PartialEq)]
pub enum RawDate {
    Text(String),
    At(DateTime<Utc>),
    /// Unix timestamp, seconds or milliseconds
    Unix(i64),
}

impl From<&str> for RawDate {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawDate {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for RawDate {
    fn from(value: DateTime<Utc>) -> Self {
        Self::At(value)
    }
}

/// Content-hash duplicate check for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueCheck {
    /// Dedup group the fingerprint is tracked in
    pub group: String,
    /// Extra value mixed into the fingerprint
    pub seed: Option<String>,
}

impl Default for UniqueCheck {
    fn default() -> Self {
        Self {
            group: "duplicates".to_string(),
            seed: None,
        }
    }
}

impl UniqueCheck {
    pub fn seeded(seed: impl Into<String>) -> Self {
        Self {
            seed: Some(seed.into()),
            ..Self::default()
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }
}

/// Per-call switches that are not transaction attributes
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub small_decimals: bool,
    pub comma_as_decimal: bool,
    /// Zone for dates without an offset
    pub default_timezone: Option<Tz>,
    pub bypass_soft_start_date: bool,
    pub ignore_duplicate_external_id: bool,
    pub unique: Option<UniqueCheck>,
}

/// Raw attributes for one transaction.
///
/// `amount`/`currency` are only read by the sign-dispatching pipeline entry
/// points, which move them onto the from or to leg.
#[derive(Debug, Clone, Default)]
pub struct TxnParams {
    pub date: Option<RawDate>,
    pub description: Option<String>,
    pub label: Option<Label>,

    pub amount: Option<RawAmount>,
    pub currency: Option<CurrencyDescriptor>,

    pub from_amount: Option<RawAmount>,
    pub from_currency: Option<CurrencyDescriptor>,
    pub to_amount: Option<RawAmount>,
    pub to_currency: Option<CurrencyDescriptor>,
    pub from_wallet: Option<WalletRef>,
    pub to_wallet: Option<WalletRef>,

    pub fee_amount: Option<RawAmount>,
    pub fee_currency: Option<CurrencyDescriptor>,
    pub net_worth_amount: Option<RawAmount>,
    pub net_worth_currency: Option<CurrencyDescriptor>,
    pub fee_worth_amount: Option<RawAmount>,
    pub fee_worth_currency: Option<CurrencyDescriptor>,

    pub txhash: Option<String>,
    pub txsrc: Option<String>,
    pub txdest: Option<String>,
    pub contract_address: Option<String>,
    pub method_hash: Option<String>,
    pub method_name: Option<String>,

    pub external_id: Option<String>,
    pub external_data: Option<JsonValue>,
    pub importer_tag: Option<String>,
    pub group_name: Option<String>,
    pub margin: bool,
    pub synced: bool,

    pub options: SyncOptions,
}

impl TxnParams {
    pub fn new(date: impl Into<RawDate>) -> Self {
        Self {
            date: Some(date.into()),
            ..Default::default()
        }
    }

    /// Signed amount, dispatched by `sync_amount`
    pub fn amount(mut self, amount: impl Into<RawAmount>, currency: CurrencyDescriptor) -> Self {
        self.amount = Some(amount.into());
        self.currency = Some(currency);
        self
    }

    pub fn from(mut self, amount: impl Into<RawAmount>, currency: CurrencyDescriptor) -> Self {
        self.from_amount = Some(amount.into());
        self.from_currency = Some(currency);
        self
    }

    pub fn to(mut self, amount: impl Into<RawAmount>, currency: CurrencyDescriptor) -> Self {
        self.to_amount = Some(amount.into());
        self.to_currency = Some(currency);
        self
    }

    pub fn fee(mut self, amount: impl Into<RawAmount>, currency: CurrencyDescriptor) -> Self {
        self.fee_amount = Some(amount.into());
        self.fee_currency = Some(currency);
        self
    }

    pub fn net_worth(mut self, amount: impl Into<RawAmount>, currency: CurrencyDescriptor) -> Self {
        self.net_worth_amount = Some(amount.into());
        self.net_worth_currency = Some(currency);
        self
    }

    pub fn label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn txhash(mut self, txhash: impl Into<String>) -> Self {
        self.txhash = Some(txhash.into());
        self
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn external_data(mut self, data: JsonValue) -> Self {
        self.external_data = Some(data);
        self
    }

    pub fn unique(mut self, check: UniqueCheck) -> Self {
        self.options.unique = Some(check);
        self
    }
}

/// A canonical transaction
#[derive(Debug, Clone, Serialize)]
pub struct Txn {
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub label: Option<Label>,
    #[serde(rename = "type")]
    txn_type: Option<TransactionType>,

    pub from_amount: Decimal,
    pub from_currency: Option<CurrencyDescriptor>,
    pub to_amount: Decimal,
    pub to_currency: Option<CurrencyDescriptor>,
    pub from_wallet: Option<WalletRef>,
    pub to_wallet: Option<WalletRef>,

    pub fee_amount: Decimal,
    pub fee_currency: Option<CurrencyDescriptor>,
    pub net_worth_amount: Option<Decimal>,
    pub net_worth_currency: Option<CurrencyDescriptor>,
    pub fee_worth_amount: Option<Decimal>,
    pub fee_worth_currency: Option<CurrencyDescriptor>,

    pub txhash: Option<String>,
    pub txsrc: Option<String>,
    pub txdest: Option<String>,
    pub contract_address: Option<String>,
    pub method_hash: Option<String>,
    pub method_name: Option<String>,

    pub external_id: Option<String>,
    pub external_data: Option<JsonValue>,
    pub importer_tag: Option<String>,
    pub margin: bool,
    pub group_name: Option<String>,
    pub synced: bool,

    unique_hash: String,
}

impl Txn {
    /// Normalize raw attributes into a transaction without validating it
    pub fn new(params: TxnParams, normalizer: &dyn Normalizer, uniqueness_seed: Option<&str>) -> Self {
        let TxnParams {
            date,
            description,
            label,
            amount: _,
            currency: _,
            from_amount,
            from_currency,
            to_amount,
            to_currency,
            from_wallet,
            to_wallet,
            fee_amount,
            fee_currency,
            net_worth_amount,
            net_worth_currency,
            fee_worth_amount,
            fee_worth_currency,
            txhash,
            txsrc,
            txdest,
            contract_address,
            method_hash,
            method_name,
            external_id,
            external_data,
            importer_tag,
            group_name,
            margin,
            synced,
            options,
        } = params;

        let leg_options = AmountOptions {
            small_decimals: options.small_decimals,
            comma_as_decimal: options.comma_as_decimal,
            no_zero: false,
        };
        let worth_options = AmountOptions {
            comma_as_decimal: options.comma_as_decimal,
            ..AmountOptions::default()
        };

        let magnitude = |raw: Option<RawAmount>, opts: AmountOptions| -> Option<Decimal> {
            raw.and_then(|r| normalizer.normalize_amount(&r, opts))
                .map(|d| d.abs())
        };

        let fee_amount = magnitude(fee_amount, leg_options).unwrap_or(Decimal::ZERO);
        let fee_currency = fee_currency.filter(|_| fee_amount > Decimal::ZERO);

        let (net_worth_amount, net_worth_currency) =
            both_or_neither(magnitude(net_worth_amount, worth_options), net_worth_currency);
        let (fee_worth_amount, fee_worth_currency) =
            both_or_neither(magnitude(fee_worth_amount, worth_options), fee_worth_currency);

        let txn_type = derive_type(from_currency.as_ref(), to_currency.as_ref());

        let mut txn = Self {
            date: date.and_then(|d| normalizer.normalize_date(&d, options.default_timezone)),
            description: presence(description),
            label,
            txn_type,
            from_amount: magnitude(from_amount, leg_options).unwrap_or(Decimal::ZERO),
            from_currency,
            to_amount: magnitude(to_amount, leg_options).unwrap_or(Decimal::ZERO),
            to_currency,
            from_wallet,
            to_wallet,
            fee_amount,
            fee_currency,
            net_worth_amount,
            net_worth_currency,
            fee_worth_amount,
            fee_worth_currency,
            // 0, 0x and similar placeholders are not hashes
            txhash: presence(txhash).filter(|h| h.chars().count() > 2),
            txsrc: presence(txsrc),
            txdest: presence(txdest),
            contract_address: presence(contract_address),
            method_hash: presence(method_hash),
            method_name: presence(method_name),
            external_id: presence(external_id),
            external_data,
            importer_tag: presence(importer_tag),
            margin,
            group_name: presence(group_name),
            synced,
            unique_hash: String::new(),
        };

        let seed = uniqueness_seed.map(str::trim).filter(|s| !s.is_empty());
        txn.unique_hash = txn.fingerprint(normalizer, seed);
        txn
    }

    /// Normalize and validate; invalid transactions are returned inside the error
    pub fn build(params: TxnParams, normalizer: &dyn Normalizer, uniqueness_seed: Option<&str>) -> Result<Self> {
        let txn = Self::new(params, normalizer, uniqueness_seed);
        let errors = txn.validate();
        if errors.is_empty() {
            Ok(txn)
        } else {
            Err(Error::Validation {
                errors,
                txn: Box::new(txn),
            })
        }
    }

    pub fn txn_type(&self) -> Option<TransactionType> {
        self.txn_type
    }

    pub fn unique_hash(&self) -> &str {
        &self.unique_hash
    }

    pub fn is_trade(&self) -> bool {
        self.txn_type == Some(TransactionType::Trade)
    }

    pub fn is_transfer(&self) -> bool {
        self.txn_type == Some(TransactionType::Transfer)
    }

    pub fn is_deposit(&self) -> bool {
        self.txn_type == Some(TransactionType::Deposit)
    }

    pub fn is_withdrawal(&self) -> bool {
        self.txn_type == Some(TransactionType::Withdrawal)
    }

    pub fn has_fee(&self) -> bool {
        self.fee_currency.is_some() && self.fee_amount > Decimal::ZERO
    }

    /// Check every entity invariant, returning all violations
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.txn_type.is_none() {
            errors.push(FieldError::new("type", "is not included in the list"));
        }

        match self.date {
            None => errors.push(FieldError::new("date", "is invalid")),
            Some(date) => {
                let now = Utc::now();
                let latest = now.checked_add_months(Months::new(12)).unwrap_or(now);
                if date.year() < MIN_YEAR || date > latest {
                    errors.push(FieldError::new("date", "is out of bounds/invalid"));
                }
            }
        }

        let needs_from = self.is_trade() || self.is_transfer() || self.is_withdrawal();
        let needs_to = self.is_trade() || self.is_transfer() || self.is_deposit();

        if needs_from {
            if self.from_currency.is_none() {
                errors.push(FieldError::new("from_currency", "can't be blank"));
            }
            if self.from_amount <= Decimal::ZERO {
                errors.push(FieldError::new("from_amount", "must be greater than 0"));
            }
        }

        if needs_to {
            if self.to_currency.is_none() {
                errors.push(FieldError::new("to_currency", "can't be blank"));
            }
            if self.to_amount <= Decimal::ZERO {
                errors.push(FieldError::new("to_amount", "must be greater than 0"));
            }
        }

        if self.fee_amount > Decimal::ZERO && self.fee_currency.is_none() {
            errors.push(FieldError::new("fee_currency", "can't be blank"));
        }

        if self.is_transfer() {
            if self.to_amount > self.from_amount + transfer_tolerance() {
                errors.push(FieldError::new("to_amount", "must be less than from_amount"));
            } else if self.from_currency != self.to_currency {
                errors.push(FieldError::new("from_currency", "must be same as to_currency"));
            }
        }

        if self.is_trade() && self.from_currency == self.to_currency {
            errors.push(FieldError::new("from_currency", "should not be same as to_currency"));
        }

        let max = Decimal::from(MAX_AMOUNT);
        for (field, amount) in [
            ("from_amount", self.from_amount),
            ("to_amount", self.to_amount),
            ("fee_amount", self.fee_amount),
        ] {
            if amount.abs() > max {
                errors.push(FieldError::new(field, "must be less than 10^15"));
            }
        }

        if let (Some(label), Some(txn_type)) = (self.label, self.txn_type) {
            if !txn_type.allows(label) {
                errors.push(FieldError::new(
                    "label",
                    format!("{} is not valid for a {}", label, txn_type),
                ));
            }
        }

        errors
    }

    /// Fingerprint used to recognise the same economic event on re-import.
    ///
    /// Fees are left out: sources report them inconsistently and they must
    /// not break matching of otherwise identical transactions.
    fn fingerprint(&self, normalizer: &dyn Normalizer, seed: Option<&str>) -> String {
        let currency_key = |c: &Option<CurrencyDescriptor>| {
            c.as_ref()
                .map(CurrencyDescriptor::fingerprint_key)
                .unwrap_or(JsonValue::Null)
        };
        let wallet_key = |w: &Option<WalletRef>| json!(w.as_ref().map(|w| w.wallet_service_tag.as_str()));

        let pairs = [
            (
                "date",
                json!(self.date.map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))),
            ),
            ("type", json!(self.txn_type.map(|t| t.as_str()))),
            ("from_amount", json!(self.from_amount.normalize().to_string())),
            ("to_amount", json!(self.to_amount.normalize().to_string())),
            ("from_currency", currency_key(&self.from_currency)),
            ("to_currency", currency_key(&self.to_currency)),
            ("from_wallet", wallet_key(&self.from_wallet)),
            ("to_wallet", wallet_key(&self.to_wallet)),
            (
                "txhash",
                json!(self.txhash.as_deref().and_then(|h| normalizer.normalize_hash(h))),
            ),
            ("external_id", json!(self.external_id)),
            ("uniqueness_seed", json!(seed)),
        ];

        let kept: Vec<JsonValue> = pairs
            .into_iter()
            .filter(|(_, value)| !is_blank(value))
            .map(|(key, value)| json!([key, value]))
            .collect();

        let canonical = JsonValue::Array(kept).to_string().to_lowercase();
        format!("{}:{:x}", FINGERPRINT_VERSION, md5::compute(canonical.as_bytes()))
    }

    /// One-line human readable rendering
    pub fn prettify(&self) -> String {
        let from = self
            .from_currency
            .as_ref()
            .map(|c| format!("{} {}", self.from_amount, c));
        let to = self
            .to_currency
            .as_ref()
            .map(|c| format!("{} {}", self.to_amount, c));

        let result = match (from, to) {
            (Some(from), Some(to)) => format!("{} -> {}", from, to),
            (Some(from), None) => format!("Withdraw {}", from),
            (None, Some(to)) => format!("Deposit {}", to),
            (None, None) => "Empty".to_string(),
        };

        let mut extra = Vec::new();
        if let Some(c) = &self.fee_currency {
            extra.push(format!("fee: {} {}", self.fee_amount, c));
        }
        if let (Some(a), Some(c)) = (self.net_worth_amount, &self.net_worth_currency) {
            extra.push(format!("net worth: {} {}", a, c));
        }
        if let (Some(a), Some(c)) = (self.fee_worth_amount, &self.fee_worth_currency) {
            extra.push(format!("fee worth: {} {}", a, c));
        }
        if let Some(label) = self.label {
            extra.push(format!("label: {}", label));
        }
        if let Some(desc) = &self.description {
            extra.push(format!("desc: {}", desc));
        }
        if let Some(hash) = &self.txhash {
            extra.push(format!("txhash: {}", hash));
        }
        if let Some(method) = self.method_name.as_ref().or(self.method_hash.as_ref()) {
            extra.push(format!("method: {}", method));
        }
        if let Some(tag) = &self.importer_tag {
            extra.push(format!("importer_tag: {}", tag));
        }
        if self.margin {
            extra.push("margin trade!".to_string());
        }

        let date = self
            .date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".to_string());

        if extra.is_empty() {
            format!("{} | {}", date, result)
        } else {
            format!("{} | {} ({})", date, result, extra.join(", "))
        }
    }
}

/// Type is a pure function of which currency legs are present
fn derive_type(
    from: Option<&CurrencyDescriptor>,
    to: Option<&CurrencyDescriptor>,
) -> Option<TransactionType> {
    match (from, to) {
        (Some(from), Some(to)) if from == to => Some(TransactionType::Transfer),
        (Some(_), Some(_)) => Some(TransactionType::Trade),
        (None, Some(_)) => Some(TransactionType::Deposit),
        (Some(_), None) => Some(TransactionType::Withdrawal),
        (None, None) => None,
    }
}

fn both_or_neither(
    amount: Option<Decimal>,
    currency: Option<CurrencyDescriptor>,
) -> (Option<Decimal>, Option<CurrencyDescriptor>) {
    match (amount, currency) {
        (Some(amount), Some(currency)) => (Some(amount), Some(currency)),
        _ => (None, None),
    }
}

fn presence(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
        _ => false,
    }
}
