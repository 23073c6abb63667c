//! Delimited-text parsing with delimiter sniffing.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::source::{RawTable, SourceMetadata};
use crate::error::{PodiumError, Result};

/// Candidate delimiters, in tie-break order.
const DELIMITERS: &[u8] = &[b',', b'\t', b';', b'|'];

/// Records sampled when sniffing the delimiter.
const SNIFF_RECORDS: usize = 16;

/// Parser settings.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Field delimiter (None = sniff from the content).
    pub delimiter: Option<u8>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
        }
    }
}

/// Reads delimited sources into verbatim text tables.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser with explicit settings.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read a file, returning its text table and provenance.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(RawTable, SourceMetadata)> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|source| PodiumError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => self.sniff_delimiter(&contents)?,
        };
        let table = self.parse_bytes(&contents, delimiter)?;

        let source = SourceMetadata::new(
            path.to_path_buf(),
            content_hash(&contents),
            contents.len() as u64,
            format_name(delimiter).to_string(),
            table.row_count(),
            table.column_count(),
        );
        Ok((table, source))
    }

    /// Parse bytes with a known delimiter. The first record is the header.
    ///
    /// Records keep their own field count; width checks happen at
    /// coercion time so they can be reported per row.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<RawTable> {
        let mut reader = self.reader(bytes, delimiter);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(PodiumError::EmptyData("No header row found".to_string()));
        }

        let rows = reader
            .records()
            .map(|record| -> Result<Vec<String>> { Ok(record?.iter().map(str::to_string).collect()) })
            .collect::<Result<Vec<Vec<String>>>>()?;

        Ok(RawTable::new(headers, rows, delimiter))
    }

    /// Pick the delimiter that splits the sampled records into the same,
    /// largest number of fields.
    pub(crate) fn sniff_delimiter(&self, bytes: &[u8]) -> Result<u8> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(PodiumError::EmptyData("No lines to analyze".to_string()));
        }

        let mut best: Option<(bool, usize, u8)> = None;
        for &delimiter in DELIMITERS {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .quote(self.config.quote)
                .has_headers(false)
                .flexible(true)
                .from_reader(bytes);
            let widths: Vec<usize> = reader
                .records()
                .take(SNIFF_RECORDS)
                .map_while(|r| r.ok())
                .map(|r| r.len())
                .collect();
            let Some(&first) = widths.first() else {
                continue;
            };
            if first < 2 {
                continue;
            }
            let candidate = (widths.iter().all(|&w| w == first), first, delimiter);
            if best.is_none_or(|(consistent, width, _)| (candidate.0, candidate.1) > (consistent, width)) {
                best = Some(candidate);
            }
        }

        // Single-column files have no delimiter to find.
        Ok(best.map(|(_, _, d)| d).unwrap_or(b','))
    }

    fn reader<'a>(&self, bytes: &'a [u8], delimiter: u8) -> csv::Reader<&'a [u8]> {
        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .quote(self.config.quote)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes)
    }
}

/// SHA-256 of a source's bytes, prefixed with the algorithm.
pub(crate) fn content_hash(bytes: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(bytes))
}

fn format_name(delimiter: u8) -> &'static str {
    match delimiter {
        b',' => "csv",
        b'\t' => "tsv",
        b';' => "csv-semicolon",
        b'|' => "psv",
        _ => "delimited",
    }
}
