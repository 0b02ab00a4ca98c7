//! API importer port
//!
//! One implementation per exchange or wallet API. Pagination, auth and rate
//! limiting live entirely inside the implementation; it reports transactions
//! through the pipeline it is handed.

use serde_json::Value as JsonValue;

use crate::domain::result::Result;
use crate::domain::ApiBalance;
use crate::services::ImportPipeline;

pub trait ApiImporter {
    /// Unique importer tag, stamped on every transaction as `importer_tag`
    fn tag(&self) -> &str;

    /// Option names that must be present before the importer runs
    fn required_options(&self) -> &[&str] {
        &[]
    }

    /// Fetch transactions and feed them to `pipeline`
    fn import(&mut self, pipeline: &mut ImportPipeline) -> Result<()>;

    /// Balances reported by the source after the import
    fn sync_balances(&mut self) -> Result<Vec<ApiBalance>>;

    /// Opaque state carried to the next sync (cursors, known markets)
    fn syncdata(&self) -> Option<JsonValue> {
        None
    }
}
