//! Repository layer over the key/value store

pub mod accounts;
pub mod ledger;
pub mod store;

use std::sync::Arc;

use store::KeyValueStore;

/// Main repository struct holding the shared store
#[derive(Clone)]
pub struct Repository {
    pub store: Arc<dyn KeyValueStore>,
    pub ledger: ledger::LedgerRepository,
    pub accounts: accounts::AccountsRepository,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            ledger: ledger::LedgerRepository::new(store.clone()),
            accounts: accounts::AccountsRepository::new(store.clone()),
            store,
        }
    }

    /// Repository over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(store::MemoryStore::new()))
    }
}
