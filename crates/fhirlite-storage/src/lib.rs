//! # fhirlite-storage
//!
//! Record-store abstraction for the FHIR Lite server.
//!
//! This crate defines the traits and types every storage backend implements.
//! It does not contain any implementations; those live in separate crates.
//!
//! ## Overview
//!
//! [`ResourceStore`] is the capability set the resource service depends on,
//! one instance per resource kind:
//! - get by id
//! - create, update (full replace) and delete
//! - search with a kind-specific filter
//!
//! [`Stores`] bundles one store per kind and answers whether a reference
//! points at an existing record.
//!
//! ## Example
//!
//! ```ignore
//! use fhirlite_core::{Patient, PatientSearch};
//! use fhirlite_storage::{ResourceStore, StorageResult, StoredResource};
//!
//! async fn smiths(store: &dyn ResourceStore<Patient>) -> StorageResult<Vec<StoredResource<Patient>>> {
//!     let filter = PatientSearch {
//!         name: Some("smith".into()),
//!         ..PatientSearch::default()
//!     };
//!     store.search(&filter).await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::ResourceStore;
pub use types::{StoreOf, Stores, StoredResource};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore<R> = std::sync::Arc<dyn ResourceStore<R>>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use fhirlite_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::ResourceStore;
    pub use crate::types::{StoreOf, Stores, StoredResource};
    pub use crate::{DynStore, StorageResult};
}
