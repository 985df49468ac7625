//! The record-store capability set.

use async_trait::async_trait;
use fhirlite_core::{FhirResource, ResourceId};

use crate::StorageResult;
use crate::types::StoredResource;

/// Persistent records of one resource kind.
///
/// Implementations must be thread-safe and give per-record atomicity.
/// Nothing spans records: there are no transactions and no optimistic
/// concurrency tokens, so concurrent updates of one record are
/// last-write-wins.
///
/// # Example
///
/// ```ignore
/// use fhirlite_core::{Patient, ResourceId};
/// use fhirlite_storage::{ResourceStore, StorageError, StoredResource};
///
/// async fn get_patient(
///     store: &dyn ResourceStore<Patient>,
///     id: &ResourceId,
/// ) -> Result<StoredResource<Patient>, StorageError> {
///     store
///         .get(id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Patient", id.as_str()))
/// }
/// ```
#[async_trait]
pub trait ResourceStore<R: FhirResource>: Send + Sync {
    /// Reads a record by id. Returns `None` if it does not exist.
    async fn get(&self, id: &ResourceId) -> StorageResult<Option<StoredResource<R>>>;

    /// Inserts a new record, stamping both timestamps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the id is taken.
    async fn create(&self, resource: R) -> StorageResult<StoredResource<R>>;

    /// Replaces an existing record, keeping its `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn update(&self, resource: R) -> StorageResult<StoredResource<R>>;

    /// Removes a record. Returns whether anything was removed.
    async fn delete(&self, id: &ResourceId) -> StorageResult<bool>;

    /// Every record matching `filter`, oldest first.
    async fn search(&self, filter: &R::Search) -> StorageResult<Vec<StoredResource<R>>>;

    async fn exists(&self, id: &ResourceId) -> StorageResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}
