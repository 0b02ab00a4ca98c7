//! CSV import runs
//!
//! One run takes an uploaded file from bytes to a published payload:
//! read, detect the format, check options, map and group rows, feed them
//! through an [`ImportPipeline`] and commit. Every expected outcome, such
//! as an unknown format or a missing option, ends in a terminal state
//! rather than an error.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{
    CommitPayload, CsvImportState, CurrencyDescriptor, Field, ImportResults, Label, MappedRow,
    MapperOptions, MappingDefinition, RawAmount, RawDate, RowAction, RowError, SkippedRow,
    TxnParams,
};
use crate::ports::{FileReader, Normalizer, PayloadPublisher, TabularFile, CSV_IMPORT_FINISHED};

use super::detection::{select, Detection, FormatDetector};
use super::grouping::RowGrouper;
use super::pipeline::{DuplicatePolicy, ImportPipeline, PipelineOptions, RunOutcome, RunTarget};
use super::registry::MappingRegistry;

pub const PROCESSING_FAILED_MESSAGE: &str = "Error while processing";

/// Options the uploader supplied with the file
#[derive(Debug, Clone, Default)]
pub struct CsvImportOptions {
    /// Resolves a detection tie
    pub mapping_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub deposit_label: Option<Label>,
    pub timezone: Option<Tz>,
    pub currency_id: Option<String>,
    /// Anything else a format may require
    pub extra: BTreeMap<String, String>,
}

impl CsvImportOptions {
    /// Names of the options that carry a value
    fn provided(&self) -> HashSet<&str> {
        let mut names: HashSet<&str> = self.extra.keys().map(String::as_str).collect();
        let named = [
            ("mapping_id", self.mapping_id.is_some()),
            ("start_date", self.start_date.is_some()),
            ("deposit_label", self.deposit_label.is_some()),
            ("timezone", self.timezone.is_some()),
            ("currency_id", self.currency_id.is_some()),
        ];
        names.extend(named.into_iter().filter(|(_, set)| *set).map(|(n, _)| n));
        names
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvImportRequest {
    pub request_id: String,
    pub csv_import_id: String,
    pub file_name: String,
    pub wallet_service_tag: Option<String>,
    /// Overrides the configured row cap
    pub max_rows_limit: Option<usize>,
    pub options: CsvImportOptions,
}

/// Process-wide knobs for CSV runs
#[derive(Debug, Clone, Default)]
pub struct CsvImportSettings {
    pub duplicate_policy: DuplicatePolicy,
    pub max_rows_limit: Option<usize>,
    pub default_timezone: Option<Tz>,
}

pub struct CsvImportService {
    registry: Arc<MappingRegistry>,
    reader: Arc<dyn FileReader>,
    normalizer: Arc<dyn Normalizer>,
    publisher: Arc<dyn PayloadPublisher>,
    settings: CsvImportSettings,
}

impl CsvImportService {
    pub fn new(
        registry: Arc<MappingRegistry>,
        reader: Arc<dyn FileReader>,
        normalizer: Arc<dyn Normalizer>,
        publisher: Arc<dyn PayloadPublisher>,
        settings: CsvImportSettings,
    ) -> Self {
        Self {
            registry,
            reader,
            normalizer,
            publisher,
            settings,
        }
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    /// Run one import and publish its payload.
    ///
    /// Only publication failures surface as `Err`; everything that can go
    /// wrong with the file itself is reported in the payload.
    pub fn run(&self, request: CsvImportRequest, bytes: &[u8]) -> Result<CommitPayload> {
        let options = &request.options;
        let mut pipeline = ImportPipeline::new(
            RunTarget::CsvImport(request.csv_import_id.clone()),
            PipelineOptions {
                request_id: request.request_id.clone(),
                start_date: options.start_date,
                deposit_label: options.deposit_label,
                importer_tag: None,
                duplicate_policy: self.settings.duplicate_policy,
            },
            Arc::clone(&self.normalizer),
        );

        let table = match self.reader.read(bytes) {
            Ok(table) => table,
            Err(e) => {
                warn!(file = %request.file_name, error = %e, "failed to read csv file");
                let outcome = RunOutcome::csv(
                    CsvImportState::ProcessingFailed,
                    Some(PROCESSING_FAILED_MESSAGE.to_string()),
                );
                return self.finish(&mut pipeline, outcome);
            }
        };
        pipeline.set_initial_rows(table.initial_rows());

        let total_rows = table.total_rows();
        if let Some(max) = request.max_rows_limit.or(self.settings.max_rows_limit) {
            if total_rows > max {
                info!(total_rows, max, "csv file over row limit");
                let message = format!("file has too many rows {} (max: {})", total_rows, max);
                let outcome = RunOutcome::csv(CsvImportState::Failed, Some(message));
                return self.finish(&mut pipeline, outcome);
            }
        }

        let candidates = FormatDetector::new(&self.registry)
            .with_wallet_tag(request.wallet_service_tag.as_deref())
            .detect(&table.headers, &request.file_name);
        debug!(?candidates, "format candidates");

        let mapping_id = match select(&candidates, options.mapping_id.as_deref()) {
            Detection::Matched(id) => id,
            Detection::Unknown => {
                info!(file = %request.file_name, "no format matched");
                return self.finish(&mut pipeline, RunOutcome::csv(CsvImportState::UnknownCsv, None));
            }
            Detection::Ambiguous(tied) => {
                info!(?tied, "format detection ambiguous");
                let outcome = RunOutcome::Csv {
                    state: CsvImportState::EnterMappingId,
                    error: None,
                    required_options: None,
                    potential_mappers: Some(tied),
                    results: None,
                    exception: None,
                };
                return self.finish(&mut pipeline, outcome);
            }
        };

        let definition = self
            .registry
            .get(&mapping_id)
            .ok_or_else(|| Error::Config(format!("unknown mapping id: {}", mapping_id)))?;
        pipeline.set_mapping_id(mapping_id.as_str());
        info!(mapping_id = %mapping_id, total_rows, "format detected");

        let provided = options.provided();
        let missing: Vec<String> = definition
            .required_options
            .iter()
            .filter(|o| !provided.contains(**o))
            .map(|o| o.to_string())
            .collect();
        if !missing.is_empty() {
            info!(?missing, "required options missing");
            let outcome = RunOutcome::Csv {
                state: CsvImportState::EnterRequiredOptions,
                error: None,
                required_options: Some(missing),
                potential_mappers: None,
                results: None,
                exception: None,
            };
            return self.finish(&mut pipeline, outcome);
        }

        if let Some(message) = definition.error {
            return self.finish(
                &mut pipeline,
                RunOutcome::csv(CsvImportState::Failed, Some(message.to_string())),
            );
        }

        let outcome = self.import_rows(&mut pipeline, definition, &request, &table);
        self.finish(&mut pipeline, outcome)
    }

    fn import_rows(
        &self,
        pipeline: &mut ImportPipeline,
        definition: &MappingDefinition,
        request: &CsvImportRequest,
        table: &TabularFile,
    ) -> RunOutcome {
        let options = &request.options;
        let timezone = options.timezone.or(self.settings.default_timezone);
        let mapper_options = MapperOptions {
            timezone,
            currency_id: options.currency_id.clone(),
            deposit_label: options.deposit_label,
            wallet_service_tag: request.wallet_service_tag.clone(),
            extra: options.extra.clone(),
        };

        let mut results = ImportResults {
            total_rows: table.total_rows(),
            ..Default::default()
        };

        let mut kept = Vec::with_capacity(table.total_rows());
        for raw in table.raw_rows() {
            let mut mapped = definition.map_row(&raw);
            if let Some(process) = definition.process {
                if let RowAction::Skip(reason) = process(&mut mapped, &raw, &mapper_options) {
                    results.skipped.push(SkippedRow {
                        row: raw.number,
                        reason: reason.to_string(),
                    });
                    continue;
                }
            }
            mapped.resolve_signed_amount(definition.comma_as_decimal);
            kept.push((raw, mapped));
        }

        let grouper = RowGrouper::new(self.normalizer.as_ref(), timezone, definition.comma_as_decimal);
        for row in grouper.group(definition.group.as_ref(), kept) {
            let params = match txn_params(&row.mapped, timezone, definition.comma_as_decimal) {
                Ok(params) => params,
                Err(e) => {
                    results.errors.push(RowError {
                        row: row.row,
                        messages: vec![e.to_string()],
                    });
                    continue;
                }
            };

            match pipeline.sync_txn(params) {
                Ok(Some(_)) => results.imported += 1,
                Ok(None) => results.duplicates += 1,
                Err(e) if e.is_fatal() => {
                    error!(row = row.row, error = %e, "csv import aborted");
                    pipeline.discard_pending();
                    return RunOutcome::Csv {
                        state: CsvImportState::Failed,
                        error: Some(e.to_string()),
                        required_options: None,
                        potential_mappers: None,
                        results: Some(results),
                        exception: Some(format!("{}: {}", e.kind(), e)),
                    };
                }
                Err(e) => {
                    let messages = match e.field_errors() {
                        Some(errors) => errors.iter().map(|fe| fe.to_string()).collect(),
                        None => vec![e.to_string()],
                    };
                    results.errors.push(RowError {
                        row: row.row,
                        messages,
                    });
                }
            }
        }

        info!(
            imported = results.imported,
            duplicates = results.duplicates,
            skipped = results.skipped.len(),
            errors = results.errors.len(),
            "csv import completed"
        );

        RunOutcome::Csv {
            state: CsvImportState::Completed,
            error: None,
            required_options: None,
            potential_mappers: None,
            results: Some(results),
            exception: None,
        }
    }

    fn finish(&self, pipeline: &mut ImportPipeline, outcome: RunOutcome) -> Result<CommitPayload> {
        let payload = pipeline.commit(outcome);
        self.publisher.publish(CSV_IMPORT_FINISHED, &payload)?;
        if let Some(state) = payload.state {
            debug!(state = %state, txns = payload.txns.len(), "csv import payload published");
        }
        Ok(payload)
    }
}

/// Turn a mapped row into transaction parameters
fn txn_params(mapped: &MappedRow, timezone: Option<Tz>, comma_as_decimal: bool) -> Result<TxnParams> {
    let text = |field: Field| mapped.get(field).map(str::to_string);
    let amount = |field: Field| mapped.get(field).map(RawAmount::from);
    let currency = |field: Field| mapped.get(field).map(CurrencyDescriptor::symbol).transpose();

    let label = mapped.get(Field::Label).map(str::parse::<Label>).transpose()?;

    let mut params = TxnParams {
        date: mapped.get(Field::Date).map(RawDate::from),
        description: text(Field::Description),
        label,
        from_amount: amount(Field::FromAmount),
        from_currency: currency(Field::FromCurrency)?,
        to_amount: amount(Field::ToAmount),
        to_currency: currency(Field::ToCurrency)?,
        fee_amount: amount(Field::FeeAmount),
        fee_currency: currency(Field::FeeCurrency)?,
        net_worth_amount: amount(Field::NetWorthAmount),
        net_worth_currency: currency(Field::NetWorthCurrency)?,
        fee_worth_amount: amount(Field::FeeWorthAmount),
        fee_worth_currency: currency(Field::FeeWorthCurrency)?,
        txhash: text(Field::Txhash),
        txsrc: text(Field::Txsrc),
        txdest: text(Field::Txdest),
        external_id: text(Field::ExternalId),
        group_name: text(Field::GroupName),
        ..Default::default()
    };
    // the mapped row tells a re-exported row apart from a conflicting one
    if params.external_id.is_some() {
        params.external_data = Some(serde_json::to_value(mapped)?);
    }
    params.options.comma_as_decimal = comma_as_decimal;
    params.options.default_timezone = timezone;

    Ok(params)
}
