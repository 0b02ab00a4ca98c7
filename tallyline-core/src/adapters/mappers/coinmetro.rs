//! CoinMetro exports

use crate::domain::{
    clean_decimal, Field, GroupRule, HeaderSource, MappedRow, MapperOptions, MappingDefinition,
    RawRow, RowAction,
};

use super::tag;

pub const TRANSACTIONS: MappingDefinition = MappingDefinition {
    tag: Some(tag::COIN_METRO),
    required_headers: &[
        "Currency",
        "Date",
        "Description",
        "Amount",
        "Fees",
        "Price",
        "Pair",
        "Other Currency",
        "Other Amount",
    ],
    optional_headers: &["IBAN", "Transaction Hash", "Additional Info"],
    header_mappings: &[
        (Field::Date, HeaderSource::One("Date")),
        (Field::Amount, HeaderSource::One("Amount")),
        (Field::Currency, HeaderSource::One("Currency")),
        (Field::Txhash, HeaderSource::One("Transaction Hash")),
        (Field::Description, HeaderSource::One("Description")),
        (Field::FeeCurrency, HeaderSource::One("Currency")),
        (Field::FeeAmount, HeaderSource::One("Fees")),
    ],
    file_name_hints: &["coinmetro", "coin-metro"],
    group: Some(GroupRule {
        key: order_key,
        eligible: Some(is_order),
    }),
    process: Some(resolve_legs),
    ..MappingDefinition::new("coinmetro-transactions")
};

/// Balance snapshots look importable but carry no transactions
pub const BALANCES: MappingDefinition = MappingDefinition {
    tag: Some(tag::COIN_METRO),
    required_headers: &["Asset", "Total Balance", "Available Balance"],
    file_name_hints: &["coinmetro"],
    error: Some("CoinMetro balance exports cannot be imported, upload the transaction export instead"),
    ..MappingDefinition::new("coinmetro-balances")
};

/// Fills of one order share the order description
fn order_key(_: &MappedRow, raw: &RawRow) -> Option<String> {
    raw.value("Description").map(str::to_string)
}

fn is_order(_: &MappedRow, raw: &RawRow) -> bool {
    raw.value("Description")
        .is_some_and(|d| d.to_lowercase().contains("order"))
}

/// Order rows carry the counter leg in `Other Amount`/`Other Currency`.
/// The sign of `Amount` says which side `Currency` is on.
fn resolve_legs(mapped: &mut MappedRow, raw: &RawRow, _: &MapperOptions) -> RowAction {
    let (Some(other_amount), Some(other_currency)) =
        (raw.value("Other Amount"), raw.value("Other Currency"))
    else {
        return RowAction::Keep;
    };
    let Some(amount) = mapped.take(Field::Amount) else {
        return RowAction::Keep;
    };
    let currency = mapped.take(Field::Currency);

    let value = clean_decimal(&amount, false);
    let own = value.abs().normalize().to_string();
    let other = clean_decimal(other_amount, false).abs().normalize().to_string();

    let (own_fields, other_fields) = if value.is_sign_negative() {
        ((Field::FromAmount, Field::FromCurrency), (Field::ToAmount, Field::ToCurrency))
    } else {
        ((Field::ToAmount, Field::ToCurrency), (Field::FromAmount, Field::FromCurrency))
    };
    mapped.set(own_fields.0, own);
    mapped.set_opt(own_fields.1, currency.as_deref());
    mapped.set(other_fields.0, other);
    mapped.set(other_fields.1, other_currency);

    RowAction::Keep
}
