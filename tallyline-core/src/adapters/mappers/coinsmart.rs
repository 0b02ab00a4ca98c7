//! CoinSmart transaction exports

use crate::domain::{
    Field, GroupRule, HeaderSource, MappedRow, MapperOptions, MappingDefinition, RawRow, RowAction,
};

use super::tag;

pub const TRANSACTIONS: MappingDefinition = MappingDefinition {
    tag: Some(tag::COINSMART),
    required_headers: &["Transaction Type", "Reference Type", "Product", "Balance", "Time Stamp"],
    optional_headers: &["Debit", "Debits", "Credit", "Credits"],
    header_mappings: &[
        (Field::Date, HeaderSource::One("Time Stamp")),
        (Field::FromAmount, HeaderSource::AnyOf(&["Debit", "Debits"])),
        (Field::ToAmount, HeaderSource::AnyOf(&["Credit", "Credits"])),
    ],
    file_name_hints: &["coinsmart"],
    group: Some(GroupRule {
        key: by_timestamp,
        eligible: Some(is_trade_or_fee),
    }),
    process: Some(assign_currency),
    ..MappingDefinition::new("coinsmart-transactions")
};

/// Trade legs and their fee share a timestamp
fn by_timestamp(_: &MappedRow, raw: &RawRow) -> Option<String> {
    raw.value("Time Stamp").map(str::to_string)
}

fn is_trade_or_fee(_: &MappedRow, raw: &RawRow) -> bool {
    raw.value("Transaction Type").is_some_and(|t| {
        let t = t.to_lowercase();
        t.contains("trade") || t.contains("fee")
    })
}

fn debit(raw: &RawRow) -> Option<&str> {
    raw.find_value(|h| h.to_lowercase().contains("debit"))
}

fn credit(raw: &RawRow) -> Option<&str> {
    raw.find_value(|h| h.to_lowercase().contains("credit"))
}

/// Every row moves one product; the reference type says in which role
fn assign_currency(mapped: &mut MappedRow, raw: &RawRow, _: &MapperOptions) -> RowAction {
    let from_amount = debit(raw);
    let to_amount = credit(raw);
    if from_amount.is_none() && to_amount.is_none() {
        return RowAction::Skip("balance only");
    }

    let currency = raw.value("Product");
    let ref_type = raw.value("Reference Type").unwrap_or_default().to_lowercase();

    if ref_type.contains("deposit") {
        mapped.set_opt(Field::ToCurrency, currency);
    } else if ref_type.contains("withdraw") {
        mapped.set_opt(Field::FromCurrency, currency);
    } else if ref_type.contains("fee") {
        mapped.take(Field::FromAmount);
        mapped.take(Field::ToAmount);
        mapped.set_opt(Field::FeeCurrency, currency);
        mapped.set_opt(Field::FeeAmount, from_amount.or(to_amount));
    } else {
        if from_amount.is_some() {
            mapped.set_opt(Field::FromCurrency, currency);
        }
        if to_amount.is_some() {
            mapped.set_opt(Field::ToCurrency, currency);
        }
    }

    RowAction::Keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cells: &[(&str, &str)]) -> RawRow {
        RawRow::new(1, cells.iter().map(|(h, v)| (h.to_string(), v.to_string())).collect())
    }

    fn run(row: &RawRow) -> (MappedRow, RowAction) {
        let mut mapped = TRANSACTIONS.map_row(row);
        let action = assign_currency(&mut mapped, row, &MapperOptions::default());
        (mapped, action)
    }

    #[test]
    fn test_trade_leg() {
        let row = raw(&[
            ("Transaction Type", "Trade"),
            ("Reference Type", "Trade"),
            ("Product", "BTC"),
            ("Debits", "0.1"),
            ("Credits", ""),
            ("Time Stamp", "2021-01-01 10:00:00"),
        ]);
        let (mapped, action) = run(&row);
        assert_eq!(action, RowAction::Keep);
        assert_eq!(mapped.get(Field::FromAmount), Some("0.1"));
        assert_eq!(mapped.get(Field::FromCurrency), Some("BTC"));
        assert_eq!(mapped.get(Field::ToCurrency), None);
    }

    #[test]
    fn test_fee_row_moves_amount_to_fee_leg() {
        let row = raw(&[
            ("Transaction Type", "Fee"),
            ("Reference Type", "Fee"),
            ("Product", "USD"),
            ("Debit", "2.5"),
            ("Time Stamp", "2021-01-01 10:00:00"),
        ]);
        let (mapped, _) = run(&row);
        assert_eq!(mapped.get(Field::FeeAmount), Some("2.5"));
        assert_eq!(mapped.get(Field::FeeCurrency), Some("USD"));
        assert_eq!(mapped.get(Field::FromAmount), None);
    }

    #[test]
    fn test_deposit_and_balance_rows() {
        let deposit = raw(&[
            ("Transaction Type", "Other"),
            ("Reference Type", "Deposit"),
            ("Product", "CAD"),
            ("Credit", "500"),
        ]);
        let (mapped, _) = run(&deposit);
        assert_eq!(mapped.get(Field::ToCurrency), Some("CAD"));
        assert!(!is_trade_or_fee(&mapped, &deposit));

        let balance = raw(&[("Transaction Type", "Other"), ("Reference Type", "Balance"), ("Product", "CAD")]);
        assert_eq!(run(&balance).1, RowAction::Skip("balance only"));
    }
}
