//! Import command - run a CSV import

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::debug;
use uuid::Uuid;

use super::{get_context, get_tallyline_dir, parse_start_date};
use crate::output;
use tallyline_core::adapters::publisher::{JsonLinesPublisher, MemoryPublisher};
use tallyline_core::config::{parse_timezone, ImportProfile};
use tallyline_core::ports::PayloadPublisher;
use tallyline_core::services::{CsvImportOptions, CsvImportRequest};
use tallyline_core::{CommitPayload, CsvImportState, Label};

#[derive(Args)]
pub struct ImportArgs {
    /// Path to CSV file
    file: PathBuf,
    /// Format to use when several match equally well
    #[arg(long)]
    mapping_id: Option<String>,
    /// Drop transactions before this date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,
    /// IANA zone for dates without an offset
    #[arg(long)]
    timezone: Option<String>,
    /// Currency for formats without a currency column
    #[arg(long)]
    currency_id: Option<String>,
    /// Label for deposits that carry none
    #[arg(long)]
    deposit_label: Option<String>,
    /// Wallet service the file belongs to
    #[arg(long)]
    wallet_tag: Option<String>,
    /// Extra format option, repeatable
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    options: Vec<(String, String)>,
    /// Store the options used as the wallet's profile
    #[arg(long, requires = "wallet_tag")]
    save_profile: bool,
    /// Append the payload as a JSON line to this file
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

pub fn run(args: ImportArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let publisher: Arc<dyn PayloadPublisher> = match &args.out {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Arc::new(JsonLinesPublisher::new(file))
        }
        None => Arc::new(MemoryPublisher::new()),
    };
    let mut ctx = get_context(publisher)?;

    let mut options = CsvImportOptions {
        mapping_id: args.mapping_id.clone(),
        start_date: args.start_date.as_deref().map(parse_start_date).transpose()?,
        deposit_label: args
            .deposit_label
            .as_deref()
            .map(str::parse::<Label>)
            .transpose()?,
        timezone: args.timezone.as_deref().map(parse_timezone).transpose()?,
        currency_id: args.currency_id.clone(),
        extra: args.options.iter().cloned().collect::<BTreeMap<_, _>>(),
    };

    if let Some(profile) = args.wallet_tag.as_deref().and_then(|t| ctx.config.profile(t)) {
        debug!(wallet_tag = ?args.wallet_tag, "applying saved profile");
        profile.apply(&mut options)?;
    }

    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let request = CsvImportRequest {
        request_id: Uuid::new_v4().to_string(),
        csv_import_id: Uuid::new_v4().to_string(),
        file_name,
        wallet_service_tag: args.wallet_tag.clone(),
        max_rows_limit: None,
        options: options.clone(),
    };

    let payload = ctx.csv_import_service.run(request, &bytes)?;

    if args.save_profile && payload.state == Some(CsvImportState::Completed) {
        if let Some(tag) = &args.wallet_tag {
            ctx.config.set_profile(
                tag.clone(),
                ImportProfile {
                    mapping_id: payload.mapping_id.clone(),
                    timezone: options.timezone.map(|tz| tz.name().to_string()),
                    currency_id: options.currency_id.clone(),
                    deposit_label: options.deposit_label,
                    start_date: options.start_date,
                },
            );
            ctx.config.save(&get_tallyline_dir()?)?;
            if !args.json {
                println!("Profile for '{}' saved", tag);
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_summary(&payload);
    }

    match payload.state {
        Some(CsvImportState::Failed) | Some(CsvImportState::ProcessingFailed) => {
            let reason = payload
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "import failed".to_string());
            anyhow::bail!(reason)
        }
        _ => Ok(()),
    }
}

fn print_summary(payload: &CommitPayload) {
    let Some(state) = payload.state else {
        return;
    };

    println!("{} {}", "Import".bold(), output::state_label(state));
    if let Some(mapping_id) = &payload.mapping_id {
        println!("  Format: {}", mapping_id);
    }

    match state {
        CsvImportState::UnknownCsv => {
            output::warning("No known format matches this file. Known formats: tly mappings");
        }
        CsvImportState::EnterMappingId => {
            let tied = payload.potential_mappers.clone().unwrap_or_default();
            output::warning(&format!(
                "Several formats match equally well: {}. Pick one with --mapping-id",
                tied.join(", ")
            ));
        }
        CsvImportState::EnterRequiredOptions => {
            let missing = payload.required_options.clone().unwrap_or_default();
            let flags: Vec<String> = missing
                .iter()
                .map(|o| match o.as_str() {
                    "currency_id" | "timezone" | "mapping_id" | "start_date" | "deposit_label" => {
                        format!("--{}", o.replace('_', "-"))
                    }
                    other => format!("--option {}=...", other),
                })
                .collect();
            output::warning(&format!("This format needs more options: {}", flags.join(", ")));
        }
        _ => {}
    }

    if let Some(results) = &payload.results {
        println!();
        output::print_txns(&payload.txns);
        println!();
        println!("  Rows: {}", results.total_rows);
        println!("  Imported: {}", results.imported);
        println!("  Duplicates: {}", results.duplicates);
        println!("  Skipped: {}", results.skipped.len());
        println!("  Errors: {}", results.errors.len());

        if !results.errors.is_empty() {
            let mut table = output::create_table();
            table.set_header(vec!["Row", "Problem"]);
            for error in &results.errors {
                table.add_row(vec![error.row.to_string(), error.messages.join("; ")]);
            }
            println!("{}", table);
        }
    }

    if state == CsvImportState::Completed {
        output::success("Import complete");
    }
}
