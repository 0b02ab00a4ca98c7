//! CLI command implementations

pub mod demo;
pub mod detect;
pub mod import;
pub mod mappings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tallyline_core::ports::PayloadPublisher;
use tallyline_core::TallylineContext;

/// Get the tallyline directory from environment or default
pub fn get_tallyline_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLYLINE_DIR") {
        Ok(PathBuf::from(dir))
    } else {
        dirs::home_dir()
            .map(|home| home.join(".tallyline"))
            .context("Could not find home directory")
    }
}

/// Build the context, publishing payloads through `publisher`
pub fn get_context(publisher: Arc<dyn PayloadPublisher>) -> Result<TallylineContext> {
    let dir = get_tallyline_dir()?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create tallyline directory: {:?}", dir))?;

    TallylineContext::new(&dir, publisher).context("Failed to initialize tallyline context")
}

/// `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp
pub fn parse_start_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD)", value))
}
