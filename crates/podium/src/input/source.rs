//! Raw source tables and their provenance.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cell text that reads as a missing value, compared case-insensitively
/// after trimming.
const NULL_TOKENS: &[&str] = &["", "na", "n/a", "null", "none", "nil", ".", "-"];

/// Where a raw table came from. Stored next to the raw tier copy and
/// carried on loaded datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub file: String,
    pub path: PathBuf,
    /// `sha256:` digest of the bytes as read.
    pub hash: String,
    pub size_bytes: u64,
    /// Format label derived from the delimiter.
    pub format: String,
    /// Data records, header excluded.
    pub row_count: usize,
    pub column_count: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => String::new(),
        };
        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}

/// Header plus text records exactly as split by the parser.
///
/// Records may be shorter or longer than the header; the loader reports
/// those as row errors instead of the parser rejecting the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: u8,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: u8) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text at (row, column), if that record is wide enough.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Whether a cell's text stands for a missing value.
    pub fn is_null_value(value: &str) -> bool {
        let value = value.trim();
        NULL_TOKENS.iter().any(|token| value.eq_ignore_ascii_case(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_takes_file_name() {
        let source = SourceMetadata::new(
            PathBuf::from("data/Teams.csv"),
            "sha256:ab".to_string(),
            42,
            "csv".to_string(),
            3,
            4,
        );
        assert_eq!(source.file, "Teams.csv");
        assert_eq!(source.size_bytes, 42);
    }

    #[test]
    fn test_get_out_of_range() {
        let table = RawTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
            b',',
        );
        assert_eq!(table.get(0, 0), Some("1"));
        assert_eq!(table.get(0, 1), None);
        assert_eq!(table.get(5, 0), None);
    }

    #[test]
    fn test_null_tokens_are_trimmed() {
        assert!(RawTable::is_null_value("  None "));
        assert!(RawTable::is_null_value("-"));
        assert!(!RawTable::is_null_value("--"));
    }
}
