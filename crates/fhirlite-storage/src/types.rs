//! Stored-record envelope and the per-kind store bundle.

use fhirlite_core::{Encounter, FhirReference, FhirResource, Observation, Patient, ResourceKind};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{DynStore, StorageResult};

/// A decoded resource together with the timestamps set by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResource<R> {
    pub resource: R,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl<R: FhirResource> StoredResource<R> {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(resource: R) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            resource,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the resource and bumps `updated_at`.
    #[must_use]
    pub fn replaced_by(&self, resource: R) -> Self {
        Self {
            resource,
            created_at: self.created_at,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Outbound document with `meta.lastUpdated` set from `updated_at`.
    ///
    /// `lastUpdated` is owned by the store; any value sent by the client is replaced.
    pub fn to_document(&self) -> Value {
        let mut document = self.resource.encode();
        let Ok(last_updated) = self.updated_at.format(&Rfc3339) else {
            return document;
        };
        if let Value::Object(map) = &mut document {
            let meta = map.entry("meta").or_insert_with(|| json!({}));
            if let Value::Object(meta) = meta {
                meta.insert("lastUpdated".to_string(), Value::String(last_updated));
            }
        }
        document
    }
}

/// One store per resource kind.
#[derive(Clone)]
pub struct Stores {
    pub patients: DynStore<Patient>,
    pub encounters: DynStore<Encounter>,
    pub observations: DynStore<Observation>,
}

impl Stores {
    /// Whether the record a reference points at exists.
    pub async fn contains(&self, reference: &FhirReference) -> StorageResult<bool> {
        match reference.kind {
            ResourceKind::Patient => self.patients.exists(&reference.id).await,
            ResourceKind::Encounter => self.encounters.exists(&reference.id).await,
            ResourceKind::Observation => self.observations.exists(&reference.id).await,
        }
    }

    /// The store holding resources of type `R`.
    pub fn of<R>(&self) -> &DynStore<R>
    where
        Self: StoreOf<R>,
        R: FhirResource,
    {
        self.store_of()
    }
}

/// Static selection of a kind's store from [`Stores`].
pub trait StoreOf<R: FhirResource> {
    fn store_of(&self) -> &DynStore<R>;
}

impl StoreOf<Patient> for Stores {
    fn store_of(&self) -> &DynStore<Patient> {
        &self.patients
    }
}

impl StoreOf<Encounter> for Stores {
    fn store_of(&self) -> &DynStore<Encounter> {
        &self.encounters
    }
}

impl StoreOf<Observation> for Stores {
    fn store_of(&self) -> &DynStore<Observation> {
        &self.observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirlite_core::{CodecOptions, ResourceId};

    fn patient(doc: Value) -> Patient {
        Patient::decode(doc, ResourceId::parse("p1").unwrap(), &CodecOptions::default()).unwrap()
    }

    #[test]
    fn replacement_keeps_created_at() {
        let first = StoredResource::new(patient(json!({"resourceType": "Patient"})));
        let second = first.replaced_by(patient(json!({"resourceType": "Patient", "gender": "female"})));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.resource.document.gender.as_deref(), Some("female"));
    }

    #[test]
    fn document_carries_last_updated() {
        let stored = StoredResource::new(patient(json!({"resourceType": "Patient"})));
        let doc = stored.to_document();
        assert_eq!(doc["id"], "p1");
        assert!(doc["meta"]["lastUpdated"].is_string());
    }

    #[test]
    fn last_updated_comes_from_the_store() {
        let stored = StoredResource::new(patient(json!({
            "resourceType": "Patient",
            "meta": {"lastUpdated": "2020-01-01T00:00:00Z", "source": "import"}
        })));
        let doc = stored.to_document();
        let expected = stored.updated_at.format(&Rfc3339).unwrap();
        assert_eq!(doc["meta"]["lastUpdated"], expected);
        assert_eq!(doc["meta"]["source"], "import");
    }
}
