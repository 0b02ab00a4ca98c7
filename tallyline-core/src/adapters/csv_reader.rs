//! CSV file reader
//!
//! Reads exports with whatever separator the source chose. The column
//! separator is sniffed from the header line.

use crate::domain::result::{Error, Result};
use crate::ports::{FileReader, TabularFile};

const CANDIDATE_SEPARATORS: &[char] = &[',', ';', '\t', '|'];
const UTF8_BOM: &str = "\u{feff}";

/// [`FileReader`] for delimited text files
#[derive(Debug, Clone, Default)]
pub struct CsvFileReader;

impl CsvFileReader {
    pub fn new() -> Self {
        Self
    }
}

/// Separator occurring most often outside quotes on the header line
fn sniff_separator(header_line: &str) -> char {
    let mut counts = [0usize; 4];
    let mut in_quotes = false;
    for c in header_line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = CANDIDATE_SEPARATORS.iter().position(|s| *s == c) {
                counts[i] += 1;
            }
        }
    }

    // ties go to the earlier candidate
    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATE_SEPARATORS[best]
}

impl FileReader for CsvFileReader {
    fn read(&self, bytes: &[u8]) -> Result<TabularFile> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Format(format!("file is not valid UTF-8: {}", e)))?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

        let header_line = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| Error::Format("file is empty".to_string()))?;

        let column_separator = sniff_separator(header_line);
        let row_separator = if text.contains("\r\n") { "\r\n" } else { "\n" };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(column_separator as u8)
            .flexible(true)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(Error::Format("header row is empty".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(TabularFile {
            headers,
            rows,
            column_separator,
            row_separator: row_separator.to_string(),
        })
    }
}
