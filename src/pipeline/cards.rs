//! Card extract processing.

use super::known_customers::ReferentialFilter;
use crate::anonymizer::{Anonymizer, mask_card};
use crate::error::Result;
use crate::loader::RawTable;
use crate::records::{
    AnonymizedCard, CardRecord, FromRawTable as _, QuarantinedCard, Rejection, RejectionReason,
};
use crate::text::clean_text;

/// Result of running one card extract through the pipeline.
#[derive(Debug, Default)]
pub struct CardOutcome {
    pub accepted: Vec<AnonymizedCard>,
    pub rejected: Vec<Rejection<QuarantinedCard>>,
}

fn quarantine(record: CardRecord, reason: RejectionReason) -> Rejection<QuarantinedCard> {
    let masked_number = mask_card(record.card_number.as_deref().unwrap_or_default());
    Rejection::new(
        QuarantinedCard {
            customer_id: record.customer_id,
            masked_number,
            expiration: record.expiration,
        },
        reason,
    )
}

/// Filters a card extract against the known customers and anonymizes what
/// passes.
///
/// Clear-text card numbers and cvvs are consumed here: accepted cards carry
/// only hashes and a masked number, quarantined cards only the masked number.
///
/// # Errors
///
/// Returns [`crate::error::EtlError::Schema`] if a required column is missing.
pub fn process_cards(
    table: RawTable,
    source_file: &str,
    filter: &ReferentialFilter<'_>,
    anonymizer: &Anonymizer,
) -> Result<CardOutcome> {
    let table = table.normalized();
    let records = CardRecord::from_table(&table, source_file)?;
    tracing::debug!(rows = records.len(), columns = ?table.columns, "Card cleaning done");

    let mut outcome = CardOutcome::default();

    for mut record in records {
        record.customer_id = clean_text(record.customer_id.as_deref());

        let Some(customer_id) = record
            .customer_id
            .clone()
            .filter(|id| filter.admits(id))
        else {
            outcome
                .rejected
                .push(quarantine(record, RejectionReason::UnknownCustomer));
            continue;
        };

        let Some(card_hash) = anonymizer.hash_value(record.card_number.as_deref()) else {
            outcome
                .rejected
                .push(quarantine(record, RejectionReason::MissingKey));
            continue;
        };

        outcome.accepted.push(AnonymizedCard {
            customer_id,
            card_hash,
            masked_number: mask_card(record.card_number.as_deref().unwrap_or_default()),
            expiration: record.expiration,
            cvv_hash: anonymizer.hash_value(record.cvv.as_deref()),
        });
    }

    for card in &outcome.accepted {
        tracing::debug!(
            cod_cliente = %card.customer_id,
            card = %card.masked_number,
            "Card accepted"
        );
    }

    for rejection in &outcome.rejected {
        tracing::debug!(
            cod_cliente = rejection.record.customer_id.as_deref().unwrap_or("<none>"),
            card = %rejection.record.masked_number,
            reason = %rejection.reason,
            "Card quarantined"
        );
    }

    tracing::info!(
        file = source_file,
        accepted = outcome.accepted.len(),
        rejected = outcome.rejected.len(),
        filter_version = filter.version(),
        "Cards filtered (cod_cliente -> clientes)"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{SourceEncoding, parse};
    use crate::pipeline::known_customers::KnownCustomerSet;
    use crate::records::{AcceptedClient, ClientRecord};
    use crate::store::{MemoryStore, PersistenceGateway as _};
    use secrecy::SecretString;

    fn anonymizer() -> Anonymizer {
        Anonymizer::new(SecretString::from("test-salt".to_owned()))
    }

    async fn refreshed(ids: &[&str]) -> KnownCustomerSet {
        let store = MemoryStore::new();
        let clients: Vec<_> = ids
            .iter()
            .map(|id| AcceptedClient {
                record: ClientRecord {
                    customer_id: Some((*id).to_owned()),
                    email: Some(format!("{id}@x.es")),
                    ..Default::default()
                },
                customer_id: (*id).to_owned(),
                document_valid: true,
                phone_valid: true,
            })
            .collect();
        store.insert_clients(&clients).await.unwrap();

        let mut set = KnownCustomerSet::seed(&store).await;
        set.refresh(&store).await.unwrap();
        set
    }

    fn cards(rows: &[&str]) -> RawTable {
        let mut text = "cod_cliente;numero_tarjeta;fecha_exp;cvv\n".to_owned();
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        parse(&text, SourceEncoding::Utf8).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_customer_is_quarantined() {
        let set = refreshed(&["1"]).await;
        let filter = set.referential_filter().unwrap();

        let outcome = process_cards(
            cards(&[
                "1;4111 1111 1111 1234;12/27;123",
                "99;5500 0000 0000 0004;01/26;456",
            ]),
            "Tarjetas-2024-01-01.csv",
            &filter,
            &anonymizer(),
        )
        .unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].customer_id, "1");
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, RejectionReason::UnknownCustomer);
        assert_eq!(
            outcome.rejected[0].record.masked_number,
            "XXXX-XXXX-XXXX-0004"
        );
    }

    #[tokio::test]
    async fn test_accepted_card_is_anonymized() {
        let a = anonymizer();
        let set = refreshed(&["1"]).await;
        let filter = set.referential_filter().unwrap();

        let outcome = process_cards(
            cards(&[" 1 ;4111 1111 1111 1234;12/27;123"]),
            "Tarjetas-2024-01-01.csv",
            &filter,
            &a,
        )
        .unwrap();

        let card = &outcome.accepted[0];
        assert_eq!(card.customer_id, "1");
        assert_eq!(card.masked_number, "XXXX-XXXX-XXXX-1234");
        assert_eq!(Some(card.card_hash.clone()), a.hash_value(Some("4111 1111 1111 1234")));
        assert_eq!(card.cvv_hash, a.hash_value(Some("123")));
        assert_eq!(card.expiration.as_deref(), Some("12/27"));
    }

    #[tokio::test]
    async fn test_missing_card_number_is_quarantined() {
        let set = refreshed(&["1"]).await;
        let filter = set.referential_filter().unwrap();

        let outcome = process_cards(
            cards(&["1;;12/27;123"]),
            "Tarjetas-2024-01-01.csv",
            &filter,
            &anonymizer(),
        )
        .unwrap();

        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected[0].reason, RejectionReason::MissingKey);
        assert_eq!(outcome.rejected[0].record.masked_number, "XXXX-XXXX-XXXX-XXXX");
    }

    #[tokio::test]
    async fn test_leading_zeros_must_match_exactly() {
        let set = refreshed(&["0001"]).await;
        let filter = set.referential_filter().unwrap();

        let outcome = process_cards(
            cards(&["1;4111111111111234;12/27;123", "0001;4111111111115678;12/27;123"]),
            "Tarjetas-2024-01-01.csv",
            &filter,
            &anonymizer(),
        )
        .unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].customer_id, "0001");
        assert_eq!(outcome.rejected.len(), 1);
    }
}
