//! Input directory scanning and file-name classification.

use crate::error::{EtlError, Result};
use crate::records::RecordKind;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const CLIENTS_PATTERN: &str = r"^Clientes-\d{4}-\d{2}-\d{2}\.csv$";
pub const CARDS_PATTERN: &str = r"^Tarjetas-\d{4}-\d{2}-\d{2}\.csv$";

static CLIENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(CLIENTS_PATTERN).unwrap_or_else(|e| panic!("invalid clients pattern: {e}"))
});

static CARDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(CARDS_PATTERN).unwrap_or_else(|e| panic!("invalid cards pattern: {e}"))
});

/// Record kind implied by a file name, if it follows the naming contract.
pub fn classify(file_name: &str) -> Option<RecordKind> {
    if CLIENTS_RE.is_match(file_name) {
        Some(RecordKind::Client)
    } else if CARDS_RE.is_match(file_name) {
        Some(RecordKind::Card)
    } else {
        None
    }
}

/// Files found in the input directory, sorted by name within each group.
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    pub clients: Vec<PathBuf>,
    pub cards: Vec<PathBuf>,
    pub ignored: Vec<String>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.cards.is_empty()
    }
}

/// Lists and classifies the regular files of `input_dir`.
///
/// # Errors
///
/// Returns [`EtlError::InputDirMissing`] if the directory does not exist.
pub fn discover(input_dir: &Path) -> Result<Discovery> {
    if !input_dir.is_dir() {
        return Err(EtlError::InputDirMissing(input_dir.to_path_buf()));
    }

    let mut names: Vec<String> = std::fs::read_dir(input_dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    tracing::info!(count = names.len(), files = ?names, "Files found in input directory");

    let mut discovery = Discovery::default();
    for name in names {
        match classify(&name) {
            Some(RecordKind::Client) => discovery.clients.push(input_dir.join(&name)),
            Some(RecordKind::Card) => discovery.cards.push(input_dir.join(&name)),
            None => discovery.ignored.push(name),
        }
    }

    if !discovery.ignored.is_empty() {
        tracing::warn!(
            files = ?discovery.ignored,
            "Files ignored by name (expected Clientes-YYYY-MM-DD.csv / Tarjetas-YYYY-MM-DD.csv)"
        );
    }

    Ok(discovery)
}
