//! Output formatting utilities

use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use tallyline_core::domain::ApiBalance;
use tallyline_core::{CsvImportState, Txn};

/// Rows shown before a transaction listing is cut off
pub const PREVIEW_ROWS: usize = 10;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn state_label(state: CsvImportState) -> ColoredString {
    match state {
        CsvImportState::Completed => state.as_str().green(),
        CsvImportState::Failed | CsvImportState::ProcessingFailed => state.as_str().red(),
        _ => state.as_str().yellow(),
    }
}

/// Table of the first transactions, with a trailer for the rest
pub fn print_txns(txns: &[Txn]) {
    if txns.is_empty() {
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["Date", "Type", "Transaction"]);
    for txn in txns.iter().take(PREVIEW_ROWS) {
        table.add_row(vec![
            txn.date.map(|d| d.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default(),
            txn.txn_type().map(|t| t.to_string()).unwrap_or_default(),
            txn.prettify(),
        ]);
    }
    println!("{}", table);

    if txns.len() > PREVIEW_ROWS {
        println!("... and {} more", txns.len() - PREVIEW_ROWS);
    }
}

pub fn print_balances(balances: &[ApiBalance]) {
    let mut table = create_table();
    table.set_header(vec!["Currency", "Balance"]);
    for balance in balances {
        table.add_row(vec![balance.currency.to_string(), balance.amount.to_string()]);
    }
    println!("{}", table);
}
