//! Tabular file reader port

use crate::domain::result::Result;
use crate::domain::RawRow;

/// Number of leading rows (header included) kept for the run payload
pub const INITIAL_ROWS: usize = 10;

/// A file split into a header row and data rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularFile {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub column_separator: char,
    pub row_separator: String,
}

impl TabularFile {
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Header row followed by the first data rows
    pub fn initial_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.headers.clone())
            .chain(self.rows.iter().take(INITIAL_ROWS - 1).cloned())
            .collect()
    }

    /// Data rows paired with their headers, numbered from 1
    pub fn raw_rows(&self) -> impl Iterator<Item = RawRow> + '_ {
        self.rows.iter().enumerate().map(|(i, cells)| {
            let paired = self
                .headers
                .iter()
                .enumerate()
                .map(|(col, h)| (h.clone(), cells.get(col).cloned().unwrap_or_default()))
                .collect();
            RawRow::new(i + 1, paired)
        })
    }
}

/// Reads raw file bytes into a table
pub trait FileReader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<TabularFile>;
}
