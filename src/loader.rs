//! Encoding-tolerant CSV ingestion.
//!
//! Extracts are `;`-delimited and every field is kept as text, so identifiers
//! with leading zeros survive untouched. Files are decoded as UTF-8 first and
//! fall back to Latin-1 when that fails.

use crate::error::{EtlError, Result};
use crate::text::{clean_text, normalize_header};
use csv::ReaderBuilder;
use std::path::Path;

pub const DELIMITER: u8 = b';';

/// Text encoding an extract was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
}

impl std::fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utf8 => write!(f, "utf-8"),
            Self::Latin1 => write!(f, "latin-1"),
        }
    }
}

/// Untyped table as read from disk.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub encoding: SourceEncoding,
    /// Lines dropped because their field count did not match the header.
    pub skipped_lines: usize,
}

/// Column positions resolved by [`RawTable::require_columns`].
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: Vec<usize>,
}

impl ColumnIndex {
    /// Value of the `n`th required column in `row`.
    pub fn get<'a>(&self, row: &'a [Option<String>], n: usize) -> Option<&'a str> {
        let position = *self.positions.get(n)?;
        row.get(position)?.as_deref()
    }
}

impl RawTable {
    /// Normalizes every header and cleans every cell.
    pub fn normalized(self) -> Self {
        let columns = self.columns.iter().map(|c| normalize_header(c)).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| clean_text(cell.as_deref()))
                    .collect()
            })
            .collect();
        Self {
            columns,
            rows,
            ..self
        }
    }

    /// Resolves the positions of `required`, failing with a schema error that
    /// lists what is missing and what is present.
    pub fn require_columns(&self, required: &[&str], source_file: &str) -> Result<ColumnIndex> {
        let mut positions = Vec::with_capacity(required.len());
        let mut missing = Vec::new();

        for name in required {
            match self.columns.iter().position(|c| c == name) {
                Some(position) => positions.push(position),
                None => missing.push((*name).to_owned()),
            }
        }

        if missing.is_empty() {
            Ok(ColumnIndex { positions })
        } else {
            Err(EtlError::Schema {
                file: source_file.to_owned(),
                missing,
                present: self.columns.clone(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads an extract from disk.
///
/// # Errors
///
/// Returns [`EtlError::Load`] if the file does not exist, cannot be read or
/// has no parsable header.
pub fn load(path: &Path) -> Result<RawTable> {
    tracing::info!(path = %path.display(), "Reading CSV");

    if !path.exists() {
        return Err(EtlError::Load(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| EtlError::Load(format!("Failed to read {}: {e}", path.display())))?;

    let (text, encoding) = decode(bytes);
    if encoding == SourceEncoding::Latin1 {
        tracing::warn!(path = %path.display(), "Not valid UTF-8, decoded as latin-1");
    }

    let table = parse(&text, encoding)
        .map_err(|e| EtlError::Load(format!("Failed to parse {}: {e}", path.display())))?;

    tracing::info!(
        encoding = %table.encoding,
        rows = table.len(),
        columns = table.columns.len(),
        skipped_lines = table.skipped_lines,
        "CSV loaded"
    );
    tracing::debug!(columns = ?table.columns, "Columns");

    Ok(table)
}

/// UTF-8 first, Latin-1 otherwise. Latin-1 maps every byte to the code point
/// of the same value, so the fallback cannot fail.
pub fn decode(bytes: Vec<u8>) -> (String, SourceEncoding) {
    match String::from_utf8(bytes) {
        Ok(text) => {
            let text = text.strip_prefix('\u{feff}').map(str::to_owned).unwrap_or(text);
            (text, SourceEncoding::Utf8)
        }
        Err(err) => {
            let text = err.into_bytes().into_iter().map(char::from).collect();
            (text, SourceEncoding::Latin1)
        }
    }
}

/// Parses decoded text, skipping records whose width differs from the header.
pub fn parse(text: &str, encoding: SourceEncoding) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    if columns.iter().all(String::is_empty) {
        return Err(EtlError::Load("Missing header row".to_owned()));
    }

    let mut rows = Vec::new();
    let mut skipped_lines = 0;

    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(record = index + 1, error = %e, "Skipping unreadable line");
                skipped_lines += 1;
                continue;
            }
        };

        if record.len() != columns.len() {
            tracing::warn!(
                record = index + 1,
                expected = columns.len(),
                found = record.len(),
                "Skipping line with wrong field count"
            );
            skipped_lines += 1;
            continue;
        }

        rows.push(
            record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_owned()))
                .collect(),
        );
    }

    Ok(RawTable {
        columns,
        rows,
        encoding,
        skipped_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_keeps_text_and_leading_zeros() {
        let table = parse("cod_cliente;telefono\n007;0600123456\n", SourceEncoding::Utf8).unwrap();
        assert_eq!(table.columns, vec!["cod_cliente", "telefono"]);
        assert_eq!(
            table.rows,
            vec![vec![Some("007".to_owned()), Some("0600123456".to_owned())]]
        );
    }

    #[test]
    fn test_parse_skips_ragged_lines() {
        let text = "a;b;c\n1;2;3\n1;2\n4;5;6;7\n8;9;10\n";
        let table = parse(text, SourceEncoding::Utf8).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped_lines, 2);
    }

    #[test]
    fn test_parse_empty_field_is_absent() {
        let table = parse("a;b\n;x\n", SourceEncoding::Utf8).unwrap();
        assert_eq!(table.rows, vec![vec![None, Some("x".to_owned())]]);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "Núñez" in latin-1
        let bytes = vec![b'N', 0xFA, 0xF1, b'e', b'z'];
        let (text, encoding) = decode(bytes);
        assert_eq!(encoding, SourceEncoding::Latin1);
        assert_eq!(text, "Núñez");
    }

    #[test]
    fn test_decode_utf8_strips_bom() {
        let (text, encoding) = decode("\u{feff}a;b".as_bytes().to_vec());
        assert_eq!(encoding, SourceEncoding::Utf8);
        assert_eq!(text, "a;b");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/Clientes-2024-01-01.csv")).unwrap_err();
        assert!(matches!(err, EtlError::Load(_)));
    }

    #[test]
    fn test_load_latin1_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Nombre;Tel\xe9fono\nJos\xe9;600123456\n").unwrap();
        file.flush().unwrap();

        let table = load(file.path()).unwrap().normalized();
        assert_eq!(table.encoding, SourceEncoding::Latin1);
        assert_eq!(table.columns, vec!["nombre", "telefono"]);
        assert_eq!(table.rows[0][0].as_deref(), Some("Jose"));
    }

    #[test]
    fn test_require_columns() {
        let table = parse("Cod Cliente;CORREO\n1;a@b.es\n", SourceEncoding::Utf8)
            .unwrap()
            .normalized();

        let index = table
            .require_columns(&["correo", "cod_cliente"], "f.csv")
            .unwrap();
        let row = &table.rows[0];
        assert_eq!(index.get(row, 0), Some("a@b.es"));
        assert_eq!(index.get(row, 1), Some("1"));

        let err = table.require_columns(&["dni"], "f.csv").unwrap_err();
        match err {
            EtlError::Schema { missing, present, .. } => {
                assert_eq!(missing, vec!["dni"]);
                assert_eq!(present, vec!["cod_cliente", "correo"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
