//! Per-file and per-run reporting.

use crate::records::RecordKind;
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Outputs written and accepted rows persisted.
    Processed,
    /// Outputs written but the store rejected the insert.
    PersistFailed(String),
    /// The file was not processed at all.
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: String,
    pub kind: RecordKind,
    pub status: FileStatus,
    pub rows_read: usize,
    pub skipped_lines: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub inserted: usize,
    pub ignored: usize,
    /// Accepted customers with an identity document failing the checksum.
    pub invalid_documents: usize,
    /// Accepted customers with an invalid phone number.
    pub invalid_phones: usize,
    pub cleaned_path: Option<PathBuf>,
}

impl FileReport {
    pub fn new(file: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            file: file.into(),
            kind,
            status: FileStatus::Processed,
            rows_read: 0,
            skipped_lines: 0,
            accepted: 0,
            rejected: 0,
            inserted: 0,
            ignored: 0,
            invalid_documents: 0,
            invalid_phones: 0,
            cleaned_path: None,
        }
    }

    pub fn skipped(file: impl Into<String>, kind: RecordKind, reason: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Skipped(reason.into()),
            ..Self::new(file, kind)
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, FileStatus::Skipped(_))
    }
}

/// Report generated after a batch run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub run_id: String,
    pub files: Vec<FileReport>,
    pub ignored_files: Vec<String>,
    pub quarantine_files: Vec<PathBuf>,
    /// Set when the quarantine files could not be written.
    pub quarantine_error: Option<String>,
    /// Size of the known customer set used to filter cards.
    pub known_customers: usize,
    pub duration: Duration,
}

impl RunReport {
    fn sum(&self, kind: RecordKind, f: impl Fn(&FileReport) -> usize) -> usize {
        self.files.iter().filter(|r| r.kind == kind).map(f).sum()
    }

    pub fn accepted(&self, kind: RecordKind) -> usize {
        self.sum(kind, |r| r.accepted)
    }

    pub fn rejected(&self, kind: RecordKind) -> usize {
        self.sum(kind, |r| r.rejected)
    }

    pub fn inserted(&self, kind: RecordKind) -> usize {
        self.sum(kind, |r| r.inserted)
    }

    pub fn skipped_files(&self) -> usize {
        self.files.iter().filter(|r| r.is_skipped()).count()
    }

    /// One-line summary for the end-of-run log.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Run {}: {} files ({} skipped, {} ignored by name), clientes {} accepted / {} rejected / {} inserted, tarjetas {} accepted / {} rejected / {} inserted, {:.2}s",
            self.run_id,
            self.files.len(),
            self.skipped_files(),
            self.ignored_files.len(),
            self.accepted(RecordKind::Client),
            self.rejected(RecordKind::Client),
            self.inserted(RecordKind::Client),
            self.accepted(RecordKind::Card),
            self.rejected(RecordKind::Card),
            self.inserted(RecordKind::Card),
            self.duration.as_secs_f64()
        );
        if self.quarantine_error.is_some() {
            summary.push_str(", quarantine NOT written");
        }
        summary
    }
}
