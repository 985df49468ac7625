pub mod encounter;
pub mod observation;
pub mod patient;

use serde_json::Value;

pub use encounter::{Encounter, EncounterDocument, EncounterFields, EncounterSearch, EncounterStatus};
pub use observation::{
    Observation, ObservationDocument, ObservationFields, ObservationSearch, ObservationStatus,
};
pub use patient::{AdministrativeGender, Patient, PatientDocument, PatientFields, PatientSearch};

use crate::codec::{CodecOptions, FhirResource};
use crate::error::{CoreError, Result};
use crate::fhir::ResourceKind;
use crate::id::ResourceId;

/// Any resource kind known to the server, selected by `resourceType`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyResource {
    Patient(Patient),
    Encounter(Encounter),
    Observation(Observation),
}

impl AnyResource {
    /// Read the kind tag of a document without decoding it.
    pub fn kind_of(document: &Value) -> Result<ResourceKind> {
        match document.get("resourceType") {
            Some(Value::String(tag)) => tag.parse(),
            Some(other) => Err(CoreError::unsupported_resource_type(other.to_string())),
            None => Err(CoreError::invalid_resource("resourceType is required")),
        }
    }

    pub fn decode(document: Value, id: ResourceId, options: &CodecOptions) -> Result<Self> {
        Ok(match Self::kind_of(&document)? {
            ResourceKind::Patient => Self::Patient(Patient::decode(document, id, options)?),
            ResourceKind::Encounter => Self::Encounter(Encounter::decode(document, id, options)?),
            ResourceKind::Observation => {
                Self::Observation(Observation::decode(document, id, options)?)
            }
        })
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Patient(_) => ResourceKind::Patient,
            Self::Encounter(_) => ResourceKind::Encounter,
            Self::Observation(_) => ResourceKind::Observation,
        }
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            Self::Patient(r) => r.id(),
            Self::Encounter(r) => r.id(),
            Self::Observation(r) => r.id(),
        }
    }

    pub fn encode(&self) -> Value {
        match self {
            Self::Patient(r) => r.encode(),
            Self::Encounter(r) => r.encode(),
            Self::Observation(r) => r.encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_resource_type() {
        let options = CodecOptions::default();
        let doc = json!({"resourceType": "Encounter", "status": "planned"});
        let decoded = AnyResource::decode(doc, ResourceId::generate(), &options).unwrap();
        assert_eq!(decoded.kind(), ResourceKind::Encounter);
        assert_eq!(decoded.encode()["status"], "planned");
    }

    #[test]
    fn rejects_unknown_or_missing_kind() {
        assert!(matches!(
            AnyResource::kind_of(&json!({"resourceType": "Condition"})),
            Err(CoreError::UnsupportedResourceType(_))
        ));
        assert!(matches!(
            AnyResource::kind_of(&json!({"status": "final"})),
            Err(CoreError::InvalidResource { .. })
        ));
    }
}
