//! Batch runner: one pass over an input directory.
//!
//! Customer files are processed and persisted first, in name order. The known
//! customer set is then refreshed from the store and card files are filtered
//! against it. A failure in one file is logged and recorded in the report;
//! the remaining files still run. Only errors that are not file-local (see
//! [`crate::error::EtlError::is_file_local`]) end the run.

use super::cards::process_cards;
use super::clients::process_clients;
use super::known_customers::KnownCustomerSet;
use super::report::{FileReport, FileStatus, RunReport};
use crate::anonymizer::Anonymizer;
use crate::discovery::discover;
use crate::error::{EtlError, Result};
use crate::loader;
use crate::output::{Quarantine, cleaned_path, write_records};
use crate::records::RecordKind;
use crate::store::PersistenceGateway;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Directories and identity of one run.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub errors_dir: PathBuf,
    pub run_id: String,
}

impl BatchSettings {
    /// Run id in the `YYYYMMDD_HHMMSS` form used in output and log names.
    pub fn new_run_id() -> String {
        chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
    }
}

struct Batch<'a> {
    settings: &'a BatchSettings,
    anonymizer: &'a Anonymizer,
    store: &'a dyn PersistenceGateway,
    quarantine: Quarantine,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Batch<'_> {
    async fn client_file(&mut self, path: &Path, known: &mut KnownCustomerSet) -> Result<FileReport> {
        let name = file_name(path);
        let table = loader::load(path)?;
        let mut report = FileReport::new(&name, RecordKind::Client);
        report.rows_read = table.len();
        report.skipped_lines = table.skipped_lines;

        let outcome = process_clients(table, &name, self.anonymizer)?;
        report.accepted = outcome.accepted.len();
        report.rejected = outcome.rejected.len();
        report.invalid_documents = outcome.invalid_documents();
        report.invalid_phones = outcome.invalid_phones();

        let out_path = cleaned_path(&self.settings.output_dir, &name);
        write_records(&outcome.accepted, &out_path)?;
        report.cleaned_path = Some(out_path);
        self.quarantine.add(&outcome.rejected);

        if outcome.accepted.is_empty() {
            tracing::warn!(file = %name, "No accepted rows, nothing to insert into clientes");
            return Ok(report);
        }

        match self.store.insert_clients(&outcome.accepted).await {
            Ok(inserted) => {
                report.inserted = inserted.inserted_count();
                report.ignored = inserted.ignored;
                let added = known.extend_with_inserted(&inserted);
                tracing::info!(
                    file = %name,
                    submitted = inserted.submitted(),
                    inserted = inserted.inserted_count(),
                    ignored = inserted.ignored,
                    known_added = added,
                    "Rows inserted into clientes"
                );
            }
            Err(e) => {
                tracing::error!(file = %name, error = %e, "Insert into clientes failed, known customers not extended");
                report.status = FileStatus::PersistFailed(e.to_string());
            }
        }

        Ok(report)
    }

    async fn card_file(&mut self, path: &Path, known: &KnownCustomerSet) -> Result<FileReport> {
        let name = file_name(path);
        let filter = known.referential_filter()?;
        let table = loader::load(path)?;
        let mut report = FileReport::new(&name, RecordKind::Card);
        report.rows_read = table.len();
        report.skipped_lines = table.skipped_lines;

        let outcome = process_cards(table, &name, &filter, self.anonymizer)?;
        report.accepted = outcome.accepted.len();
        report.rejected = outcome.rejected.len();

        let out_path = cleaned_path(&self.settings.output_dir, &name);
        write_records(&outcome.accepted, &out_path)?;
        report.cleaned_path = Some(out_path);
        self.quarantine.add(&outcome.rejected);

        if outcome.accepted.is_empty() {
            tracing::warn!(file = %name, "No accepted rows, nothing to insert into tarjetas");
            return Ok(report);
        }

        match self.store.insert_cards(&outcome.accepted).await {
            Ok(inserted) => {
                report.inserted = inserted.inserted_count();
                report.ignored = inserted.ignored;
                tracing::info!(
                    file = %name,
                    submitted = inserted.submitted(),
                    inserted = inserted.inserted_count(),
                    ignored = inserted.ignored,
                    "Rows inserted into tarjetas"
                );
            }
            Err(e) => {
                tracing::error!(file = %name, error = %e, "Insert into tarjetas failed");
                report.status = FileStatus::PersistFailed(e.to_string());
            }
        }

        Ok(report)
    }
}

fn skipped(path: &Path, kind: RecordKind, error: EtlError) -> Result<FileReport> {
    if !error.is_file_local() {
        return Err(error);
    }
    let name = file_name(path);
    tracing::error!(file = %name, error = %error, "Skipping file");
    Ok(FileReport::skipped(name, kind, error.to_string()))
}

/// Runs the whole batch over `settings.input_dir`.
///
/// # Errors
///
/// Returns [`EtlError::InputDirMissing`] if the input directory does not
/// exist. Failures confined to one file, and a failed quarantine write, are
/// recorded in the returned report instead.
pub async fn run_batch(
    settings: &BatchSettings,
    anonymizer: &Anonymizer,
    store: &dyn PersistenceGateway,
) -> Result<RunReport> {
    let start = Instant::now();
    tracing::info!(
        run_id = %settings.run_id,
        input = %settings.input_dir.display(),
        output = %settings.output_dir.display(),
        errors = %settings.errors_dir.display(),
        "Pipeline started"
    );

    let discovery = discover(&settings.input_dir)?;
    let mut report = RunReport {
        run_id: settings.run_id.clone(),
        ignored_files: discovery.ignored.clone(),
        ..Default::default()
    };

    tracing::info!(
        clients = discovery.clients.len(),
        cards = discovery.cards.len(),
        "Files matched by name"
    );
    if discovery.is_empty() {
        tracing::warn!("No files to process");
        report.duration = start.elapsed();
        return Ok(report);
    }

    match store.ping().await {
        Ok(()) => tracing::info!("Store reachable"),
        Err(e) => tracing::warn!(error = %e, "Store not reachable, inserts will fail"),
    }

    let mut batch = Batch {
        settings,
        anonymizer,
        store,
        quarantine: Quarantine::new(),
    };

    let mut known = KnownCustomerSet::seed(store).await;

    for path in &discovery.clients {
        tracing::info!(file = %path.display(), "Processing clientes");
        let file_report = match batch.client_file(path, &mut known).await {
            Ok(r) => r,
            Err(e) => skipped(path, RecordKind::Client, e)?,
        };
        report.files.push(file_report);
    }

    if let Err(e) = known.refresh(store).await {
        tracing::error!(error = %e, "Could not refresh known customers, card files will be skipped");
    }
    report.known_customers = known.len();

    for path in &discovery.cards {
        tracing::info!(file = %path.display(), "Processing tarjetas");
        let file_report = match batch.card_file(path, &known).await {
            Ok(r) => r,
            Err(e) => skipped(path, RecordKind::Card, e)?,
        };
        report.files.push(file_report);
    }

    match batch
        .quarantine
        .write_all(&settings.errors_dir, &settings.run_id)
    {
        Ok(paths) => report.quarantine_files = paths,
        Err(e) => {
            tracing::error!(
                errors_dir = %settings.errors_dir.display(),
                rows = batch.quarantine.len(),
                error = %e,
                "Could not write quarantine files"
            );
            report.quarantine_error = Some(e.to_string());
        }
    }
    report.duration = start.elapsed();

    tracing::info!("{}", report.summary());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_local_errors_skip_the_file() {
        let path = Path::new("input/Tarjetas-2024-01-31.csv");
        let report = skipped(
            path,
            RecordKind::Card,
            EtlError::StaleCustomerSet { version: 0 },
        )
        .unwrap();
        assert!(report.is_skipped());
        assert_eq!(report.file, "Tarjetas-2024-01-31.csv");
    }

    #[test]
    fn test_fatal_errors_end_the_run() {
        let path = Path::new("input/Clientes-2024-01-31.csv");
        let result = skipped(path, RecordKind::Client, EtlError::Config("bad".to_owned()));
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
