//! Customer extract processing.

use crate::anonymizer::Anonymizer;
use crate::error::Result;
use crate::loader::RawTable;
use crate::records::{AcceptedClient, ClientRecord, FromRawTable as _, Rejection, RejectionReason};
use crate::validators::{
    normalize_identity_document, normalize_phone, validate_email, validate_identity_document,
    validate_phone,
};

/// Result of running one customer extract through the pipeline.
#[derive(Debug, Default)]
pub struct ClientOutcome {
    pub accepted: Vec<AcceptedClient>,
    pub rejected: Vec<Rejection<ClientRecord>>,
}

impl ClientOutcome {
    /// Accepted rows whose identity document failed the checksum.
    pub fn invalid_documents(&self) -> usize {
        self.accepted.iter().filter(|c| !c.document_valid).count()
    }

    /// Accepted rows whose phone number failed validation.
    pub fn invalid_phones(&self) -> usize {
        self.accepted.iter().filter(|c| !c.phone_valid).count()
    }
}

/// Validation flags computed for one customer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientChecks {
    pub document_valid: bool,
    pub phone_valid: bool,
    pub email_valid: bool,
}

/// Lower-cases the email and normalizes document and phone.
pub fn normalize_client(mut record: ClientRecord) -> ClientRecord {
    record.email = record.email.map(|e| e.to_lowercase());
    record.identity_document = record
        .identity_document
        .as_deref()
        .and_then(normalize_identity_document);
    record.phone = record.phone.as_deref().and_then(normalize_phone);
    record
}

pub fn check_client(record: &ClientRecord) -> ClientChecks {
    ClientChecks {
        document_valid: record
            .identity_document
            .as_deref()
            .is_some_and(validate_identity_document),
        phone_valid: record.phone.as_deref().is_some_and(validate_phone),
        email_valid: record.email.as_deref().is_some_and(validate_email),
    }
}

/// Normalizes, validates and anonymizes a customer extract.
///
/// Only the email gates acceptance. Document and phone validity are kept as
/// flags on the accepted row. The identity document is replaced by its hash on
/// every row, accepted or rejected.
///
/// # Errors
///
/// Returns [`crate::error::EtlError::Schema`] if a required column is missing.
pub fn process_clients(
    table: RawTable,
    source_file: &str,
    anonymizer: &Anonymizer,
) -> Result<ClientOutcome> {
    let table = table.normalized();
    let records = ClientRecord::from_table(&table, source_file)?;
    tracing::debug!(rows = records.len(), columns = ?table.columns, "Client cleaning done");

    let mut outcome = ClientOutcome::default();

    for record in records {
        let mut record = normalize_client(record);
        let checks = check_client(&record);
        record.identity_document = anonymizer.hash_value(record.identity_document.as_deref());

        if !checks.email_valid {
            outcome
                .rejected
                .push(Rejection::new(record, RejectionReason::InvalidEmail));
            continue;
        }

        let Some(customer_id) = record.customer_id.clone() else {
            outcome
                .rejected
                .push(Rejection::new(record, RejectionReason::MissingKey));
            continue;
        };

        outcome.accepted.push(AcceptedClient {
            record,
            customer_id,
            document_valid: checks.document_valid,
            phone_valid: checks.phone_valid,
        });
    }

    tracing::info!(
        file = source_file,
        accepted = outcome.accepted.len(),
        rejected = outcome.rejected.len(),
        invalid_documents = outcome.invalid_documents(),
        invalid_phones = outcome.invalid_phones(),
        "Clients validated"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{SourceEncoding, parse};
    use secrecy::SecretString;

    const HEADER: &str = "cod_cliente;nombre;apellido1;apellido2;dni;correo;telefono";

    fn anonymizer() -> Anonymizer {
        Anonymizer::new(SecretString::from("test-salt".to_owned()))
    }

    fn table(rows: &[&str]) -> RawTable {
        let mut text = format!("{HEADER}\n");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        parse(&text, SourceEncoding::Utf8).unwrap()
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        let outcome = process_clients(
            table(&[
                "1;Ana;Gil;Ruiz;12345678Z;INVALID;600123456",
                "2;Luis;Paz;Sol;12345678Z;Luis.Paz@Example.COM;600123456",
            ]),
            "Clientes-2024-01-01.csv",
            &anonymizer(),
        )
        .unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].customer_id, "2");
        assert_eq!(
            outcome.accepted[0].record.email.as_deref(),
            Some("luis.paz@example.com")
        );

        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, RejectionReason::InvalidEmail);
        assert_eq!(outcome.rejected[0].record.customer_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_document_and_phone_are_flags_not_gates() {
        let outcome = process_clients(
            table(&["1;Ana;Gil;Ruiz;12345678A;ana@x.es;123"]),
            "Clientes-2024-01-01.csv",
            &anonymizer(),
        )
        .unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert!(!outcome.accepted[0].document_valid);
        assert!(!outcome.accepted[0].phone_valid);
        assert_eq!(outcome.invalid_documents(), 1);
        assert_eq!(outcome.invalid_phones(), 1);
    }

    #[test]
    fn test_document_is_hashed_after_normalization() {
        let a = anonymizer();
        let outcome = process_clients(
            table(&["1;Ana;Gil;Ruiz; 12345678-z ;ana@x.es;+34 600 123 456"]),
            "Clientes-2024-01-01.csv",
            &a,
        )
        .unwrap();

        let accepted = &outcome.accepted[0];
        assert!(accepted.document_valid);
        assert!(accepted.phone_valid);
        assert_eq!(accepted.record.identity_document, a.hash_value(Some("12345678Z")));
        assert_eq!(accepted.record.phone.as_deref(), Some("34600123456"));
    }

    #[test]
    fn test_rejected_rows_never_keep_clear_document() {
        let outcome = process_clients(
            table(&["1;Ana;Gil;Ruiz;12345678Z;bad-email;600123456"]),
            "Clientes-2024-01-01.csv",
            &anonymizer(),
        )
        .unwrap();

        let rejected = &outcome.rejected[0].record;
        assert_ne!(rejected.identity_document.as_deref(), Some("12345678Z"));
        assert_eq!(rejected.identity_document.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_missing_customer_id_is_quarantined() {
        let outcome = process_clients(
            table(&[";Ana;Gil;Ruiz;12345678Z;ana@x.es;600123456"]),
            "Clientes-2024-01-01.csv",
            &anonymizer(),
        )
        .unwrap();

        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected[0].reason, RejectionReason::MissingKey);
    }

    #[test]
    fn test_accented_headers_and_cells() {
        let text = "Cód Cliente;Nombre;Apellido1;Apellido2;DNI;Correo;Teléfono\n\
                    0001;  José ;Núñez;Peña;12345678Z;jose@x.es;600123456\n";
        let outcome = process_clients(
            parse(text, SourceEncoding::Utf8).unwrap(),
            "Clientes-2024-01-01.csv",
            &anonymizer(),
        )
        .unwrap();

        let record = &outcome.accepted[0].record;
        assert_eq!(record.customer_id.as_deref(), Some("0001"));
        assert_eq!(record.first_name.as_deref(), Some("Jose"));
        assert_eq!(record.last_name1.as_deref(), Some("Nunez"));
        assert_eq!(record.last_name2.as_deref(), Some("Pena"));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let text = "cod_cliente;nombre;correo\n1;Ana;ana@x.es\n";
        let result = process_clients(
            parse(text, SourceEncoding::Utf8).unwrap(),
            "Clientes-2024-01-01.csv",
            &anonymizer(),
        );
        assert!(matches!(
            result,
            Err(crate::error::EtlError::Schema { .. })
        ));
    }
}
