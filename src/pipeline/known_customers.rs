//! The set of customer ids cards may reference.
//!
//! The store is the source of truth. The set is seeded from it at batch start,
//! grows only by ids the store reports as newly inserted, and is re-read in
//! full before any card is filtered:
//!
//! ```text
//! Seeded ──extend_with_inserted──> ExtendedByInsert ──refresh──> Refreshed
//!    └────────────────────────refresh─────────────────────────────┘
//! ```
//!
//! Cards can only be filtered through a [`ReferentialFilter`], which is only
//! handed out in the `Refreshed` state.

use crate::error::{EtlError, Result};
use crate::store::{InsertOutcome, PersistenceGateway};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetState {
    Seeded,
    ExtendedByInsert,
    Refreshed,
}

#[derive(Debug, Clone)]
pub struct KnownCustomerSet {
    ids: HashSet<String>,
    state: SetState,
    version: u64,
}

impl KnownCustomerSet {
    /// A seeded set holding `ids`.
    pub fn from_ids(ids: HashSet<String>) -> Self {
        Self {
            ids,
            state: SetState::Seeded,
            version: 0,
        }
    }

    /// Seeds the set from the store. A store that cannot be read yields an
    /// empty set; the refresh before card processing gets another chance.
    pub async fn seed(store: &dyn PersistenceGateway) -> Self {
        match store.fetch_customer_ids().await {
            Ok(ids) => {
                tracing::info!(customers = ids.len(), "Known customers seeded from store");
                Self::from_ids(ids)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read existing customers, starting empty");
                Self::from_ids(HashSet::new())
            }
        }
    }

    /// Adds the ids the store reported as newly inserted. Ids that were
    /// submitted but ignored as duplicates are not in `outcome.inserted`.
    ///
    /// Returns how many ids were new to the set.
    pub fn extend_with_inserted(&mut self, outcome: &InsertOutcome) -> usize {
        let before = self.ids.len();
        self.ids.extend(outcome.inserted.iter().cloned());
        let added = self.ids.len() - before;

        self.state = SetState::ExtendedByInsert;
        if added > 0 {
            self.version += 1;
        }
        added
    }

    /// Replaces the set with the store's current contents.
    ///
    /// # Errors
    ///
    /// Returns the store error and leaves the set and its state unchanged, so
    /// a failed refresh never enables card filtering.
    pub async fn refresh(&mut self, store: &dyn PersistenceGateway) -> Result<()> {
        let ids = store.fetch_customer_ids().await?;
        tracing::info!(
            customers = ids.len(),
            local = self.ids.len(),
            "Known customers refreshed from store"
        );
        self.ids = ids;
        self.state = SetState::Refreshed;
        self.version += 1;
        Ok(())
    }

    /// Read-only membership view for card filtering.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::StaleCustomerSet`] unless the set is `Refreshed`.
    pub fn referential_filter(&self) -> Result<ReferentialFilter<'_>> {
        if self.state == SetState::Refreshed {
            Ok(ReferentialFilter {
                ids: &self.ids,
                version: self.version,
            })
        } else {
            Err(EtlError::StaleCustomerSet {
                version: self.version,
            })
        }
    }

    pub fn state(&self) -> SetState {
        self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Membership test against a refreshed [`KnownCustomerSet`].
#[derive(Debug, Clone, Copy)]
pub struct ReferentialFilter<'a> {
    ids: &'a HashSet<String>,
    version: u64,
}

impl ReferentialFilter<'_> {
    pub fn admits(&self, customer_id: &str) -> bool {
        self.ids.contains(customer_id)
    }

    /// Version of the set this filter was taken from.
    pub fn version(&self) -> u64 {
        self.version
    }
}
