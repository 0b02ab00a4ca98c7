//! Detect command - rank the known formats against a file

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::output;
use tallyline_core::adapters::csv_reader::CsvFileReader;
use tallyline_core::ports::FileReader;
use tallyline_core::services::{select, Detection, FormatDetector, MappingRegistry};

pub fn run(file: &Path, wallet_tag: Option<&str>, json: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let table = CsvFileReader::new()
        .read(&bytes)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let registry = MappingRegistry::builtin()?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let candidates = FormatDetector::new(&registry)
        .with_wallet_tag(wallet_tag)
        .detect(&table.headers, &file_name);
    let detection = select(&candidates, None);

    if json {
        let selected = match &detection {
            Detection::Matched(id) => json!(id),
            _ => json!(null),
        };
        let out = json!({
            "headers": table.headers,
            "separator": table.column_separator.to_string(),
            "candidates": candidates,
            "selected": selected,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Headers: {}", table.headers.join(", "));
    println!("Rows: {}", table.total_rows());
    println!();

    if candidates.is_empty() {
        output::warning("No known format matches this file");
        return Ok(());
    }

    let mut t = output::create_table();
    t.set_header(vec!["Format", "Score"]);
    for candidate in &candidates {
        t.add_row(vec![candidate.mapping_id.clone(), candidate.score.to_string()]);
    }
    println!("{}", t);

    match detection {
        Detection::Matched(id) => output::success(&format!("Detected: {}", id)),
        Detection::Ambiguous(tied) => output::info(&format!(
            "Tied: {}. Pass --mapping-id to import",
            tied.join(", ")
        )),
        Detection::Unknown => {}
    }

    Ok(())
}
