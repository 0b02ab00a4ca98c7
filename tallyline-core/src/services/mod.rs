//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. The pipeline,
//! detector and grouper are pure; the two import services wire them to
//! the ports and own the run-level logging.

pub mod api_import;
pub mod csv_import;
mod detection;
mod grouping;
mod pipeline;
mod query;
mod registry;

pub use api_import::{ApiImportRequest, ApiImportService};
pub use csv_import::{CsvImportOptions, CsvImportRequest, CsvImportService, CsvImportSettings};
pub use detection::{select, Candidate, Detection, FormatDetector};
pub use grouping::{GroupedRow, RowGrouper};
pub use pipeline::{
    DuplicatePolicy, ImportPipeline, PipelineOptions, RunOutcome, RunTarget, Side, TradeParams,
};
pub use query::{AttrValue, Attribute, Matcher, TxnQuery};
pub use registry::MappingRegistry;
