//! # fhirlite-core
//!
//! Resource model for the FHIR Lite server: the three supported resource
//! kinds, their canonical documents, the fields extracted from them for
//! search, and the reference parser that resolves cross-resource pointers.

pub mod codec;
pub mod datatypes;
pub mod error;
pub mod fhir;
pub mod id;
pub mod reference;
pub mod resources;
pub mod search;
pub mod temporal;

pub use codec::{CodecOptions, FhirResource};
pub use error::{CoreError, ErrorCategory, Result};
pub use fhir::{FHIR_VERSION, ResourceKind};
pub use id::{ResourceId, generate_id, validate_id};
pub use reference::{FhirReference, MalformedReferencePolicy, UnresolvableReference, parse_reference};
pub use resources::{
    AdministrativeGender, AnyResource, Encounter, EncounterSearch, EncounterStatus, Observation,
    ObservationSearch, ObservationStatus, Patient, PatientSearch,
};
pub use search::{SearchFilter, SearchParams};
pub use temporal::now_utc;
