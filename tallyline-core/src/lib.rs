//! Tallyline Core - transaction import normalization and deduplication
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Txn, CurrencyDescriptor, MappingDefinition, payloads)
//! - **ports**: Trait definitions for collaborators (Normalizer, FileReader, PayloadPublisher, ApiImporter)
//! - **services**: Orchestration (ImportPipeline, FormatDetector, RowGrouper, import runs)
//! - **adapters**: Concrete implementations (chrono normalizer, csv reader, publishers, formats)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::csv_reader::CsvFileReader;
use adapters::normalizer::StandardNormalizer;
use config::Config;
use ports::{Normalizer, PayloadPublisher};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    CommitPayload, CsvImportState, CurrencyDescriptor, Label, TransactionType, Txn, TxnParams,
};

/// Main context for Tallyline operations
///
/// Holds the configuration, the format registry and both import services,
/// all sharing one normalizer and one publisher.
pub struct TallylineContext {
    pub config: Config,
    pub registry: Arc<MappingRegistry>,
    pub csv_import_service: CsvImportService,
    pub api_import_service: ApiImportService,
}

impl TallylineContext {
    /// Create a context from the settings in `dir`
    pub fn new(dir: &Path, publisher: Arc<dyn PayloadPublisher>) -> Result<Self> {
        let config = Config::load(dir)?;
        Self::with_config(config, publisher)
    }

    pub fn with_config(config: Config, publisher: Arc<dyn PayloadPublisher>) -> Result<Self> {
        let registry = Arc::new(MappingRegistry::builtin()?);
        let normalizer: Arc<dyn Normalizer> =
            Arc::new(StandardNormalizer::new().with_default_timezone(config.default_timezone));

        let csv_import_service = CsvImportService::new(
            Arc::clone(&registry),
            Arc::new(CsvFileReader::new()),
            Arc::clone(&normalizer),
            Arc::clone(&publisher),
            config.csv_settings(),
        );
        let api_import_service =
            ApiImportService::new(normalizer, publisher, config.duplicate_policy);

        Ok(Self {
            config,
            registry,
            csv_import_service,
            api_import_service,
        })
    }
}
