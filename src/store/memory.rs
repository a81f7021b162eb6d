use super::{InsertOutcome, PersistenceGateway};
use crate::error::{EtlError, Result};
use crate::records::{AcceptedClient, AnonymizedCard};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    clientes: BTreeMap<String, AcceptedClient>,
    emails: HashSet<String>,
    tarjetas: BTreeMap<String, AnonymizedCard>,
}

/// Store kept in process memory for the lifetime of a run.
///
/// Mirrors the Postgres constraints: `cod_cliente` and `correo` are unique in
/// `clientes`, `numero_tarjeta` is the key of `tarjetas`, and a card whose
/// customer is not in `clientes` fails the whole call like a foreign-key
/// violation would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| EtlError::Persistence("In-memory store lock poisoned".to_owned()))
    }

    /// Customer ids referenced by persisted cards but absent from `clientes`.
    /// Empty whenever the referential rule holds.
    pub fn orphan_cards(&self) -> Result<Vec<String>> {
        let tables = self.tables()?;
        Ok(tables
            .tarjetas
            .values()
            .filter(|card| !tables.clientes.contains_key(&card.customer_id))
            .map(|card| card.customer_id.clone())
            .collect())
    }

    pub fn client_count(&self) -> Result<usize> {
        Ok(self.tables()?.clientes.len())
    }

    pub fn card_count(&self) -> Result<usize> {
        Ok(self.tables()?.tarjetas.len())
    }

    /// Snapshot of the persisted cards.
    pub fn cards(&self) -> Result<Vec<AnonymizedCard>> {
        Ok(self.tables()?.tarjetas.values().cloned().collect())
    }

    /// Snapshot of the persisted customers.
    pub fn clients(&self) -> Result<Vec<AcceptedClient>> {
        Ok(self.tables()?.clientes.values().cloned().collect())
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.tables().map(|_| ())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_customer_ids(&self) -> Result<HashSet<String>> {
        Ok(self.tables()?.clientes.keys().cloned().collect())
    }

    async fn insert_clients(&self, clients: &[AcceptedClient]) -> Result<InsertOutcome> {
        let mut tables = self.tables()?;

        if let Some(client) = clients.iter().find(|c| c.record.email.is_none()) {
            return Err(EtlError::Persistence(format!(
                "null value in correo for cod_cliente {}",
                client.customer_id
            )));
        }

        let mut outcome = InsertOutcome::default();
        for client in clients {
            let email = client.record.email.clone().unwrap_or_default();

            if tables.clientes.contains_key(&client.customer_id) || tables.emails.contains(&email)
            {
                outcome.ignored += 1;
                continue;
            }

            tables.emails.insert(email);
            tables
                .clientes
                .insert(client.customer_id.clone(), client.clone());
            outcome.inserted.push(client.customer_id.clone());
        }

        Ok(outcome)
    }

    async fn insert_cards(&self, cards: &[AnonymizedCard]) -> Result<InsertOutcome> {
        let mut tables = self.tables()?;

        // all-or-nothing: check the foreign key before touching the table
        if let Some(orphan) = cards
            .iter()
            .find(|card| !tables.clientes.contains_key(&card.customer_id))
        {
            return Err(EtlError::Persistence(format!(
                "insert into tarjetas violates foreign key: cod_cliente {} not in clientes",
                orphan.customer_id
            )));
        }

        let mut outcome = InsertOutcome::default();
        for card in cards {
            if tables.tarjetas.contains_key(&card.card_hash) {
                outcome.ignored += 1;
                continue;
            }
            tables.tarjetas.insert(card.card_hash.clone(), card.clone());
            outcome.inserted.push(card.customer_id.clone());
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ClientRecord;

    fn client(id: &str, email: &str) -> AcceptedClient {
        AcceptedClient {
            record: ClientRecord {
                customer_id: Some(id.to_owned()),
                email: Some(email.to_owned()),
                ..Default::default()
            },
            customer_id: id.to_owned(),
            document_valid: true,
            phone_valid: true,
        }
    }

    fn card(customer: &str, hash: &str) -> AnonymizedCard {
        AnonymizedCard {
            customer_id: customer.to_owned(),
            card_hash: hash.to_owned(),
            masked_number: "XXXX-XXXX-XXXX-0000".to_owned(),
            expiration: None,
            cvv_hash: None,
        }
    }

    #[tokio::test]
    async fn test_duplicates_are_ignored_not_errors() {
        let store = MemoryStore::new();
        let first = store
            .insert_clients(&[client("1", "a@x.es"), client("2", "b@x.es")])
            .await
            .unwrap();
        assert_eq!(first.inserted, vec!["1", "2"]);

        // same key, and a new key reusing an existing email
        let second = store
            .insert_clients(&[client("1", "a@x.es"), client("3", "b@x.es"), client("4", "d@x.es")])
            .await
            .unwrap();
        assert_eq!(second.inserted, vec!["4"]);
        assert_eq!(second.ignored, 2);
        assert_eq!(second.submitted(), 3);
    }

    #[tokio::test]
    async fn test_fetch_customer_ids() {
        let store = MemoryStore::new();
        store.insert_clients(&[client("007", "a@x.es")]).await.unwrap();
        let ids = store.fetch_customer_ids().await.unwrap();
        assert!(ids.contains("007"));
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_orphan_card_fails_whole_call() {
        let store = MemoryStore::new();
        store.insert_clients(&[client("1", "a@x.es")]).await.unwrap();

        let result = store.insert_cards(&[card("1", "h1"), card("9", "h2")]).await;
        assert!(matches!(result, Err(EtlError::Persistence(_))));
        assert_eq!(store.card_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_card_duplicates() {
        let store = MemoryStore::new();
        store.insert_clients(&[client("1", "a@x.es")]).await.unwrap();
        store.insert_cards(&[card("1", "h1")]).await.unwrap();
        let outcome = store
            .insert_cards(&[card("1", "h1"), card("1", "h2")])
            .await
            .unwrap();
        assert_eq!(outcome.inserted_count(), 1);
        assert_eq!(outcome.ignored, 1);
        assert!(store.orphan_cards().unwrap().is_empty());
    }
}
