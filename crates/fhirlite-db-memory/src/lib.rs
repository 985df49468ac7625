//! In-memory storage backend for the FHIR Lite server.
//!
//! Every store uses a papaya lock-free `HashMap`, which gives per-record
//! atomicity and nothing more: cascades and batches built on top are
//! sequences of independent writes.
//!
//! # Example
//!
//! ```ignore
//! use fhirlite_db_memory::create_stores;
//!
//! let stores = create_stores();
//! let created = stores.patients.create(patient).await?;
//! ```

pub mod storage;
pub mod users;

use std::sync::Arc;

pub use fhirlite_storage::{ResourceStore, StorageError, StoredResource, Stores};
pub use storage::InMemoryStore;
pub use users::InMemoryUserStore;

/// One empty in-memory store per resource kind.
pub fn create_stores() -> Stores {
    Stores {
        patients: Arc::new(InMemoryStore::new()),
        encounters: Arc::new(InMemoryStore::new()),
        observations: Arc::new(InMemoryStore::new()),
    }
}
