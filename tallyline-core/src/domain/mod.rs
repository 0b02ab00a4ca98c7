//! Core domain entities
//!
//! Transactions, currencies, labels and format definitions. These are pure
//! data structures with validation logic - no I/O or external dependencies.

mod currency;
pub mod decimal;
mod label;
pub mod mapping;
pub mod payload;
pub mod result;
mod transaction;
mod wallet;

pub use currency::{CurrencyBuilder, CurrencyDescriptor, FIAT_SYMBOLS};
pub use decimal::clean_decimal;
pub use label::{
    Label, TransactionType, DEPOSIT_LABELS, EXPENSE_LABELS, INCOME_LABELS, SPECIAL_LABELS,
    TRADE_LABELS, TRANSFER_LABELS, WITHDRAWAL_LABELS,
};
pub use mapping::{
    Field, GroupRule, HeaderSource, MappedRow, MapperOptions, MappingDefinition, RawRow, RowAction,
};
pub use payload::{
    ApiBalance, CommitPayload, CsvImportState, ImportResults, PayloadError, RowError, SkippedRow,
    SyncFailure,
};
pub use transaction::{
    RawAmount, RawDate, SyncOptions, Txn, TxnParams, UniqueCheck, MAX_AMOUNT, MIN_YEAR,
};
pub use wallet::WalletRef;
