//! Generic layouts not tied to one wallet service

use crate::domain::{Field, HeaderSource, MappedRow, MapperOptions, MappingDefinition, RawRow, RowAction};

/// Sent/received columns, one transaction per row
pub const TRADES: MappingDefinition = MappingDefinition {
    required_headers: &["Date", "Sent Amount", "Sent Currency", "Received Amount", "Received Currency"],
    optional_headers: &[
        "Fee Amount",
        "Fee Currency",
        "Net Worth Amount",
        "Net Worth Currency",
        "Label",
        "Description",
        "TxHash",
    ],
    header_mappings: &[
        (Field::Date, HeaderSource::One("Date")),
        (Field::FromAmount, HeaderSource::One("Sent Amount")),
        (Field::FromCurrency, HeaderSource::One("Sent Currency")),
        (Field::ToAmount, HeaderSource::One("Received Amount")),
        (Field::ToCurrency, HeaderSource::One("Received Currency")),
        (Field::FeeAmount, HeaderSource::One("Fee Amount")),
        (Field::FeeCurrency, HeaderSource::One("Fee Currency")),
        (Field::NetWorthAmount, HeaderSource::One("Net Worth Amount")),
        (Field::NetWorthCurrency, HeaderSource::One("Net Worth Currency")),
        (Field::Label, HeaderSource::One("Label")),
        (Field::Description, HeaderSource::One("Description")),
        (Field::Txhash, HeaderSource::AnyOf(&["TxHash", "Transaction Hash"])),
    ],
    ..MappingDefinition::new("generic-trades")
};

const AMOUNT_MAPPINGS: &[(Field, HeaderSource)] = &[
    (Field::Date, HeaderSource::One("Date")),
    (Field::Amount, HeaderSource::One("Amount")),
    (Field::Currency, HeaderSource::One("Currency")),
    (Field::FeeAmount, HeaderSource::AnyOf(&["Fee", "Fee Amount"])),
    (Field::FeeCurrency, HeaderSource::One("Fee Currency")),
    (Field::Label, HeaderSource::One("Label")),
    (Field::Description, HeaderSource::One("Description")),
    (Field::Txhash, HeaderSource::AnyOf(&["TxHash", "Transaction Hash"])),
    (Field::ExternalId, HeaderSource::AnyOf(&["ID", "Transaction ID"])),
];

/// Signed amount plus currency
pub const AMOUNTS: MappingDefinition = MappingDefinition {
    required_headers: &["Date", "Amount", "Currency"],
    optional_headers: &["Fee", "Fee Currency", "Label", "Description", "TxHash", "ID"],
    header_mappings: AMOUNT_MAPPINGS,
    ..MappingDefinition::new("generic-amounts")
};

/// Signed amount; the currency is supplied by the caller
pub const SINGLE_CURRENCY: MappingDefinition = MappingDefinition {
    required_headers: &["Date", "Amount"],
    optional_headers: &["Label", "Description", "TxHash", "ID"],
    header_mappings: AMOUNT_MAPPINGS,
    required_options: &["currency_id"],
    process: Some(apply_currency_option),
    ..MappingDefinition::new("generic-single-currency")
};

fn apply_currency_option(mapped: &mut MappedRow, _: &RawRow, options: &MapperOptions) -> RowAction {
    if !mapped.contains(Field::Currency) {
        mapped.set_opt(Field::Currency, options.currency_id.as_deref());
    }
    if mapped.contains(Field::FeeAmount) && !mapped.contains(Field::FeeCurrency) {
        mapped.set_opt(Field::FeeCurrency, options.currency_id.as_deref());
    }
    RowAction::Keep
}
