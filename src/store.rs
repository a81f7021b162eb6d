//! Persistence gateway for accepted records.
//!
//! The pipeline only talks to the store through [`PersistenceGateway`]. Every
//! insert call runs in one transaction and is duplicate tolerant: rows whose
//! key already exists are ignored, and the caller gets back which customer ids
//! were actually inserted.
//!
//! - [`postgres::PgStore`]: the production store (sqlx, `ON CONFLICT DO NOTHING`)
//! - [`memory::MemoryStore`]: run-scoped store for offline runs and tests

pub mod memory;
pub mod postgres;

use crate::error::Result;
use crate::records::{AcceptedClient, AnonymizedCard};
use async_trait::async_trait;
use std::collections::HashSet;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Per-call outcome of a duplicate-tolerant insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Customer ids of the rows that were newly inserted, in submit order.
    pub inserted: Vec<String>,
    /// Rows skipped because their key already existed.
    pub ignored: usize,
}

impl InsertOutcome {
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }

    pub fn submitted(&self) -> usize {
        self.inserted.len() + self.ignored
    }
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Cheap connectivity probe.
    async fn ping(&self) -> Result<()>;

    /// Creates the `clientes` and `tarjetas` tables if they do not exist.
    async fn ensure_schema(&self) -> Result<()>;

    /// All customer ids currently persisted.
    async fn fetch_customer_ids(&self) -> Result<HashSet<String>>;

    /// Inserts customers in a single transaction, ignoring duplicates.
    async fn insert_clients(&self, clients: &[AcceptedClient]) -> Result<InsertOutcome>;

    /// Inserts cards in a single transaction, ignoring duplicates.
    async fn insert_cards(&self, cards: &[AnonymizedCard]) -> Result<InsertOutcome>;
}
