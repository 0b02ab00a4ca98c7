//! Payload publication port

use crate::domain::result::Result;
use crate::domain::CommitPayload;

pub const CSV_IMPORT_FINISHED: &str = "job.finished.csv_import";
pub const API_IMPORT_FINISHED: &str = "job.finished.api_import";

/// Receives the terminal payload of every run
pub trait PayloadPublisher: Send + Sync {
    fn publish(&self, routing_key: &str, payload: &CommitPayload) -> Result<()>;
}
