//! Typed records for the two extract schemas.
//!
//! Records are only built from a [`RawTable`] after its required columns have
//! been resolved, so a missing column is reported once per file instead of
//! surfacing as absent values row by row.

use crate::error::Result;
use crate::loader::{ColumnIndex, RawTable};

/// Persisted columns of the `clientes` table, in insert order.
pub const CLIENT_COLUMNS: [&str; 7] = [
    "cod_cliente",
    "nombre",
    "apellido1",
    "apellido2",
    "dni",
    "correo",
    "telefono",
];

/// Persisted columns of the `tarjetas` table, in insert order.
pub const CARD_COLUMNS: [&str; 4] = ["cod_cliente", "numero_tarjeta", "fecha_exp", "cvv"];

/// Column added to every quarantined row.
pub const REJECTION_REASON_COLUMN: &str = "rejection_reason";

/// Which extract a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Client,
    Card,
}

impl RecordKind {
    /// Name of the backing table, also used in output file names.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Client => "clientes",
            Self::Card => "tarjetas",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Why a row was quarantined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectionReason {
    InvalidEmail,
    UnknownCustomer,
    /// The row lacks the value the store keys it by.
    MissingKey,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidEmail => "invalid_email",
            Self::UnknownCustomer => "unknown_customer",
            Self::MissingKey => "missing_key",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that can be written as a row of text cells.
pub trait TabularRecord {
    const KIND: RecordKind;

    fn headers() -> &'static [&'static str];

    fn values(&self) -> Vec<Option<&str>>;
}

/// A record that can be built from a normalized raw table.
pub trait FromRawTable: Sized {
    const REQUIRED_COLUMNS: &'static [&'static str];

    fn from_row(index: &ColumnIndex, row: &[Option<String>]) -> Self;

    /// Checks the required columns and converts every row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EtlError::Schema`] if a required column is
    /// missing.
    fn from_table(table: &RawTable, source_file: &str) -> Result<Vec<Self>> {
        let index = table.require_columns(Self::REQUIRED_COLUMNS, source_file)?;
        Ok(table
            .rows
            .iter()
            .map(|row| Self::from_row(&index, row))
            .collect())
    }
}

fn owned(index: &ColumnIndex, row: &[Option<String>], n: usize) -> Option<String> {
    index.get(row, n).map(str::to_owned)
}

/// One customer row. Before the client pipeline runs, `identity_document`
/// holds the clear-text document; afterwards it holds its hash.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientRecord {
    pub customer_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name1: Option<String>,
    pub last_name2: Option<String>,
    pub identity_document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl FromRawTable for ClientRecord {
    const REQUIRED_COLUMNS: &'static [&'static str] = &CLIENT_COLUMNS;

    fn from_row(index: &ColumnIndex, row: &[Option<String>]) -> Self {
        Self {
            customer_id: owned(index, row, 0),
            first_name: owned(index, row, 1),
            last_name1: owned(index, row, 2),
            last_name2: owned(index, row, 3),
            identity_document: owned(index, row, 4),
            email: owned(index, row, 5),
            phone: owned(index, row, 6),
        }
    }
}

impl TabularRecord for ClientRecord {
    const KIND: RecordKind = RecordKind::Client;

    fn headers() -> &'static [&'static str] {
        &CLIENT_COLUMNS
    }

    fn values(&self) -> Vec<Option<&str>> {
        vec![
            self.customer_id.as_deref(),
            self.first_name.as_deref(),
            self.last_name1.as_deref(),
            self.last_name2.as_deref(),
            self.identity_document.as_deref(),
            self.email.as_deref(),
            self.phone.as_deref(),
        ]
    }
}

/// A customer that passed the acceptance gate, with its anonymized document
/// and the auxiliary data-quality flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedClient {
    pub record: ClientRecord,
    pub customer_id: String,
    pub document_valid: bool,
    pub phone_valid: bool,
}

impl TabularRecord for AcceptedClient {
    const KIND: RecordKind = RecordKind::Client;

    fn headers() -> &'static [&'static str] {
        &CLIENT_COLUMNS
    }

    fn values(&self) -> Vec<Option<&str>> {
        self.record.values()
    }
}

/// One card row in clear text, as read from the extract.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardRecord {
    pub customer_id: Option<String>,
    pub card_number: Option<String>,
    pub expiration: Option<String>,
    pub cvv: Option<String>,
}

impl FromRawTable for CardRecord {
    const REQUIRED_COLUMNS: &'static [&'static str] = &CARD_COLUMNS;

    fn from_row(index: &ColumnIndex, row: &[Option<String>]) -> Self {
        Self {
            customer_id: owned(index, row, 0),
            card_number: owned(index, row, 1),
            expiration: owned(index, row, 2),
            cvv: owned(index, row, 3),
        }
    }
}

/// A card accepted by the referential filter. Holds no clear-text card data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizedCard {
    pub customer_id: String,
    pub card_hash: String,
    pub masked_number: String,
    pub expiration: Option<String>,
    pub cvv_hash: Option<String>,
}

impl TabularRecord for AnonymizedCard {
    const KIND: RecordKind = RecordKind::Card;

    fn headers() -> &'static [&'static str] {
        &CARD_COLUMNS
    }

    fn values(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.customer_id.as_str()),
            Some(self.card_hash.as_str()),
            self.expiration.as_deref(),
            self.cvv_hash.as_deref(),
        ]
    }
}

/// Quarantine view of a rejected card: the number is masked and the cvv is
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinedCard {
    pub customer_id: Option<String>,
    pub masked_number: String,
    pub expiration: Option<String>,
}

const QUARANTINED_CARD_COLUMNS: [&str; 3] = ["cod_cliente", "numero_tarjeta", "fecha_exp"];

impl TabularRecord for QuarantinedCard {
    const KIND: RecordKind = RecordKind::Card;

    fn headers() -> &'static [&'static str] {
        &QUARANTINED_CARD_COLUMNS
    }

    fn values(&self) -> Vec<Option<&str>> {
        vec![
            self.customer_id.as_deref(),
            Some(self.masked_number.as_str()),
            self.expiration.as_deref(),
        ]
    }
}

/// A rejected row and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection<R> {
    pub record: R,
    pub reason: RejectionReason,
}

impl<R> Rejection<R> {
    pub fn new(record: R, reason: RejectionReason) -> Self {
        Self { record, reason }
    }
}
