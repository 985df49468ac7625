//! Per-kind resource orchestration.
//!
//! Every operation checks the caller's role before it touches a store, so a
//! denied request has no side effect. Writes decode the inbound document,
//! optionally verify the resources it references, and then hit the store
//! once per record: there are no cross-record transactions, which makes
//! cascades best-effort and concurrent updates last-write-wins.

use fhirlite_api::ApiError;
use fhirlite_auth::{Action, User, authorize};
use fhirlite_core::{
    CodecOptions, Encounter, FhirResource, Observation, ObservationSearch, Patient, ResourceId,
    ResourceKind, SearchFilter, SearchParams,
};
use fhirlite_storage::{DynStore, StoreOf, StoredResource, Stores};
use serde_json::Value;

use crate::config::ReferentialIntegrity;

/// Orchestrates CRUD and search for resources of type `R`.
#[derive(Clone)]
pub struct ResourceService<R: FhirResource> {
    store: DynStore<R>,
    stores: Stores,
    options: CodecOptions,
    integrity: ReferentialIntegrity,
}

impl<R: FhirResource> ResourceService<R>
where
    Stores: StoreOf<R>,
{
    pub fn new(stores: Stores, options: CodecOptions, integrity: ReferentialIntegrity) -> Self {
        Self {
            store: stores.of::<R>().clone(),
            stores,
            options,
            integrity,
        }
    }
}

impl<R: FhirResource> ResourceService<R> {
    /// Decode and store a new resource under a generated id.
    pub async fn create(&self, user: &User, document: Value) -> Result<StoredResource<R>, ApiError> {
        authorize(user.role, Action::Create, R::KIND)?;

        let resource = R::decode(document, ResourceId::generate(), &self.options)?;
        self.check_references(&resource).await?;

        let stored = self.store.create(resource).await?;
        tracing::info!(
            resource_type = %R::KIND,
            id = %stored.resource.id(),
            user = %user.email,
            "resource created"
        );
        Ok(stored)
    }

    pub async fn read(&self, user: &User, id: &str) -> Result<StoredResource<R>, ApiError> {
        authorize(user.role, Action::Read, R::KIND)?;
        let id = ResourceId::parse(id)?;

        self.store
            .get(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("{} not found", R::KIND)))
    }

    /// Replace the resource stored under `id` with `document`.
    pub async fn update(
        &self,
        user: &User,
        id: &str,
        document: Value,
    ) -> Result<StoredResource<R>, ApiError> {
        authorize(user.role, Action::Update, R::KIND)?;
        let id = ResourceId::parse(id)?;

        if let Some(body_id) = document.get("id").and_then(Value::as_str) {
            if body_id != id.as_str() {
                return Err(ApiError::bad_request(format!(
                    "Resource id '{body_id}' does not match URL id '{id}'"
                )));
            }
        }

        let resource = R::decode(document, id, &self.options)?;
        self.check_references(&resource).await?;

        let stored = self.store.update(resource).await?;
        tracing::info!(
            resource_type = %R::KIND,
            id = %stored.resource.id(),
            user = %user.email,
            "resource updated"
        );
        Ok(stored)
    }

    /// Delete by id. Deleting an Encounter also deletes its Observations.
    ///
    /// Dependents go first, so a failed cascade leaves the Encounter in
    /// place and the delete can be retried.
    pub async fn delete(&self, user: &User, id: &str) -> Result<(), ApiError> {
        authorize(user.role, Action::Delete, R::KIND)?;
        let id = ResourceId::parse(id)?;

        let not_found = || ApiError::not_found(format!("{} not found", R::KIND));
        if !self.store.exists(&id).await? {
            return Err(not_found());
        }

        let cascaded = match R::KIND {
            ResourceKind::Encounter => self.delete_observations_of(&id).await?,
            ResourceKind::Patient | ResourceKind::Observation => 0,
        };
        if !self.store.delete(&id).await? {
            return Err(not_found());
        }
        tracing::info!(
            resource_type = %R::KIND,
            id = %id,
            user = %user.email,
            cascaded,
            "resource deleted"
        );
        Ok(())
    }

    /// All stored resources matching `params`, oldest first.
    pub async fn search(
        &self,
        user: &User,
        params: &SearchParams,
    ) -> Result<Vec<StoredResource<R>>, ApiError> {
        authorize(user.role, Action::Search, R::KIND)?;
        let filter = R::Search::from_params(params)?;

        let found = self.store.search(&filter).await?;
        tracing::debug!(resource_type = %R::KIND, ?filter, total = found.len(), "search");
        Ok(found)
    }

    fn checks_references(&self) -> bool {
        match R::KIND {
            ResourceKind::Observation => true,
            ResourceKind::Encounter => self.integrity == ReferentialIntegrity::All,
            ResourceKind::Patient => false,
        }
    }

    async fn check_references(&self, resource: &R) -> Result<(), ApiError> {
        if !self.checks_references() {
            return Ok(());
        }
        for reference in resource.references() {
            if !self.stores.contains(&reference).await? {
                tracing::info!(
                    resource_type = %R::KIND,
                    reference = %reference,
                    "referenced resource does not exist"
                );
                return Err(ApiError::not_found(format!(
                    "Referenced {} not found",
                    reference.kind
                )));
            }
        }
        Ok(())
    }

    async fn delete_observations_of(&self, encounter: &ResourceId) -> Result<usize, ApiError> {
        let dependents = self
            .stores
            .observations
            .search(&ObservationSearch::for_encounter(encounter.clone()))
            .await?;
        let mut removed = 0;
        for observation in dependents {
            if self.stores.observations.delete(observation.resource.id()).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// One service per resource kind over a shared set of stores.
#[derive(Clone)]
pub struct Services {
    pub patients: ResourceService<Patient>,
    pub encounters: ResourceService<Encounter>,
    pub observations: ResourceService<Observation>,
}

impl Services {
    pub fn new(stores: Stores, options: CodecOptions, integrity: ReferentialIntegrity) -> Self {
        Self {
            patients: ResourceService::new(stores.clone(), options, integrity),
            encounters: ResourceService::new(stores.clone(), options, integrity),
            observations: ResourceService::new(stores, options, integrity),
        }
    }

    /// The service for resources of type `R`.
    pub fn of<R>(&self) -> &ResourceService<R>
    where
        Self: ServiceOf<R>,
        R: FhirResource,
    {
        self.service_of()
    }
}

pub trait ServiceOf<R: FhirResource> {
    fn service_of(&self) -> &ResourceService<R>;
}

impl ServiceOf<Patient> for Services {
    fn service_of(&self) -> &ResourceService<Patient> {
        &self.patients
    }
}

impl ServiceOf<Encounter> for Services {
    fn service_of(&self) -> &ResourceService<Encounter> {
        &self.encounters
    }
}

impl ServiceOf<Observation> for Services {
    fn service_of(&self) -> &ResourceService<Observation> {
        &self.observations
    }
}
