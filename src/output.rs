//! Cleaned-file and quarantine writers.

use crate::error::{Result, ResultExt as _};
use crate::records::{REJECTION_REASON_COLUMN, RecordKind, Rejection, RejectionReason, TabularRecord};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// `<output_dir>/<stem>.cleaned.csv` for a source file name.
pub fn cleaned_path(output_dir: &Path, source_file: &str) -> PathBuf {
    let stem = source_file.strip_suffix(".csv").unwrap_or(source_file);
    output_dir.join(format!("{stem}.cleaned.csv"))
}

/// Builds a string-typed `DataFrame` from row-major cells.
pub fn to_dataframe(headers: &[&str], rows: &[Vec<Option<String>>]) -> Result<DataFrame> {
    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|row| row.get(i).and_then(|v| v.as_deref()))
                .collect();
            Column::from(Series::new((*name).into(), values))
        })
        .collect::<Vec<_>>();
    Ok(DataFrame::new(columns)?)
}

fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn rows_of<R: TabularRecord>(records: &[R]) -> Vec<Vec<Option<String>>> {
    records
        .iter()
        .map(|r| r.values().into_iter().map(|v| v.map(str::to_owned)).collect())
        .collect()
}

/// Writes `records` with exactly their persisted columns.
///
/// Returns the number of rows written.
pub fn write_records<R: TabularRecord>(records: &[R], path: &Path) -> Result<usize> {
    let mut df = to_dataframe(R::headers(), &rows_of(records))?;
    save_csv(&mut df, path)?;
    tracing::info!(path = %path.display(), rows = df.height(), "Output saved");
    Ok(df.height())
}

#[derive(Debug, Default)]
struct Sheet {
    headers: Vec<&'static str>,
    rows: Vec<Vec<Option<String>>>,
}

/// Rejected rows accumulated across a run, one sheet per record kind and
/// rejection reason.
#[derive(Debug, Default)]
pub struct Quarantine {
    sheets: BTreeMap<(RecordKind, RejectionReason), Sheet>,
}

impl Quarantine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<R: TabularRecord>(&mut self, rejections: &[Rejection<R>]) {
        for rejection in rejections {
            let sheet = self
                .sheets
                .entry((R::KIND, rejection.reason))
                .or_insert_with(|| Sheet {
                    headers: R::headers()
                        .iter()
                        .copied()
                        .chain(std::iter::once(REJECTION_REASON_COLUMN))
                        .collect(),
                    rows: Vec::new(),
                });

            let mut row: Vec<Option<String>> = rejection
                .record
                .values()
                .into_iter()
                .map(|v| v.map(str::to_owned))
                .collect();
            row.push(Some(rejection.reason.as_str().to_owned()));
            sheet.rows.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.sheets.values().map(|s| s.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `<errors_dir>/rejected_<table>_<reason>_<run_id>.csv`
    pub fn path_for(
        errors_dir: &Path,
        kind: RecordKind,
        reason: RejectionReason,
        run_id: &str,
    ) -> PathBuf {
        errors_dir.join(format!("rejected_{}_{}_{run_id}.csv", kind.table_name(), reason))
    }

    /// Writes every non-empty sheet and returns the paths written.
    pub fn write_all(&self, errors_dir: &Path, run_id: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for ((kind, reason), sheet) in &self.sheets {
            if sheet.rows.is_empty() {
                continue;
            }
            let path = Self::path_for(errors_dir, *kind, *reason, run_id);
            let mut df = to_dataframe(&sheet.headers, &sheet.rows)?;
            save_csv(&mut df, &path)?;
            tracing::warn!(path = %path.display(), rows = sheet.rows.len(), reason = %reason, "Rejected rows saved");
            written.push(path);
        }
        Ok(written)
    }
}
