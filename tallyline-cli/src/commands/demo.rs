//! Demo command - run the demo API importer

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use uuid::Uuid;

use super::{get_context, parse_start_date};
use crate::output;
use tallyline_core::adapters::demo::DemoImporter;
use tallyline_core::adapters::publisher::MemoryPublisher;
use tallyline_core::services::ApiImportRequest;

pub fn run(start_date: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context(Arc::new(MemoryPublisher::new()))?;

    let request = ApiImportRequest {
        request_id: Uuid::new_v4().to_string(),
        wallet_id: "demo".to_string(),
        start_date: start_date.map(parse_start_date).transpose()?,
        ..Default::default()
    };

    let mut importer = DemoImporter::new();
    let payload = ctx.api_import_service.run(request, &mut importer)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if let Some(error) = &payload.error {
        anyhow::bail!("Demo sync failed: {}", error);
    }

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for txn in &payload.txns {
        let kind = txn.txn_type().map(|t| t.to_string()).unwrap_or_default();
        *by_type.entry(kind).or_default() += 1;
    }

    println!("{}", "Demo sync".bold());
    println!();
    output::print_txns(&payload.txns);
    println!();
    for (kind, count) in &by_type {
        println!("  {}: {}", kind, count);
    }
    println!();

    if let Some(balances) = &payload.api_balances {
        output::print_balances(balances);
    }
    output::success(&format!("Synced {} transactions", payload.txns.len()));

    Ok(())
}
