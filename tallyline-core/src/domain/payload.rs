//! Terminal run payloads

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::currency::CurrencyDescriptor;
use super::transaction::Txn;

/// Terminal state of a CSV run; exactly one per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvImportState {
    ProcessingFailed,
    Failed,
    EnterMappingId,
    EnterRequiredOptions,
    UnknownCsv,
    Completed,
}

impl CsvImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessingFailed => "processing_failed",
            Self::Failed => "failed",
            Self::EnterMappingId => "enter_mapping_id",
            Self::EnterRequiredOptions => "enter_required_options",
            Self::UnknownCsv => "unknown_csv",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CsvImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an API importer, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub auth_failed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_message: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayloadError {
    Message(String),
    Sync(SyncFailure),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(m) => f.write_str(m),
            Self::Sync(s) => f.write_str(&s.message),
        }
    }
}

/// Reported balance of one currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiBalance {
    pub currency: CurrencyDescriptor,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub messages: Vec<String>,
}

/// Per-row outcome counts of a completed CSV run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResults {
    pub total_rows: usize,
    pub imported: usize,
    pub duplicates: usize,
    pub skipped: Vec<SkippedRow>,
    pub errors: Vec<RowError>,
}

/// Everything a run reports when it ends.
///
/// The CSV path fills `csv_import_id` and the `state`/`initial_rows`/...
/// group; the API path fills `wallet_id` and the `api_*` group.
#[derive(Debug, Clone, Serialize)]
pub struct CommitPayload {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_import_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub txns: Vec<Txn>,
    pub error: Option<PayloadError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<CsvImportState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_rows: Option<Vec<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_mappers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ImportResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_syncdata: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_balances: Option<Vec<ApiBalance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<JsonValue>,
}

impl CommitPayload {
    pub fn is_csv(&self) -> bool {
        self.csv_import_id.is_some()
    }
}
