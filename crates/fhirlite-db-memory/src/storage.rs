use async_trait::async_trait;
use fhirlite_core::{FhirResource, ResourceId, SearchFilter};
use fhirlite_storage::{ResourceStore, StorageError, StorageResult, StoredResource};
use papaya::HashMap as PapayaHashMap;

/// In-memory records of one resource kind, keyed by id.
#[derive(Debug)]
pub struct InMemoryStore<R: FhirResource> {
    data: PapayaHashMap<ResourceId, StoredResource<R>>,
}

impl<R: FhirResource> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            data: PapayaHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: FhirResource> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: FhirResource> ResourceStore<R> for InMemoryStore<R> {
    async fn get(&self, id: &ResourceId) -> StorageResult<Option<StoredResource<R>>> {
        Ok(self.data.pin().get(id).cloned())
    }

    async fn create(&self, resource: R) -> StorageResult<StoredResource<R>> {
        let id = resource.id().clone();
        let stored = StoredResource::new(resource);
        let guard = self.data.pin();
        match guard.try_insert(id.clone(), stored) {
            Ok(inserted) => Ok(inserted.clone()),
            Err(_) => Err(StorageError::already_exists(R::KIND.as_str(), id.as_str())),
        }
    }

    async fn update(&self, resource: R) -> StorageResult<StoredResource<R>> {
        let id = resource.id().clone();
        let guard = self.data.pin();
        // Atomic read-modify-write keeps created_at from the record being replaced.
        guard
            .update(id.clone(), |existing| existing.replaced_by(resource.clone()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(R::KIND.as_str(), id.as_str()))
    }

    async fn delete(&self, id: &ResourceId) -> StorageResult<bool> {
        Ok(self.data.pin().remove(id).is_some())
    }

    async fn search(&self, filter: &R::Search) -> StorageResult<Vec<StoredResource<R>>> {
        let guard = self.data.pin();
        let mut matches: Vec<StoredResource<R>> = guard
            .values()
            .filter(|stored| filter.matches(&stored.resource))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.resource.id().cmp(b.resource.id()))
        });
        Ok(matches)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
