use serde::Serialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;

use crate::codec::{
    CodecOptions, FhirResource, code_vocabulary, open_document, overlay, take_field, to_json,
};
use crate::datatypes::{CodeableConcept, Period, Quantity, Reference};
use crate::error::Result;
use crate::fhir::ResourceKind;
use crate::id::ResourceId;
use crate::reference::FhirReference;
use crate::resources::encounter::normalize_instant;
use crate::search::{SearchFilter, SearchParams, date_param, reference_param, string_param};
use crate::temporal::format_instant;

code_vocabulary! {
    pub enum ObservationStatus {
        Registered => "registered",
        Preliminary => "preliminary",
        Final => "final",
        Amended => "amended",
        Corrected => "corrected",
        Cancelled => "cancelled",
        EnteredInError => "entered-in-error",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDocument {
    pub resource_type: ResourceKind,
    pub id: ResourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_instant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFields {
    pub status: Option<ObservationStatus>,
    /// Code of the first coding.
    pub code: Option<String>,
    pub subject_patient_id: Option<ResourceId>,
    pub encounter_id: Option<ResourceId>,
    pub effective: Option<OffsetDateTime>,
    pub value_quantity_value: Option<f64>,
    pub value_quantity_unit: Option<String>,
    pub value_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub fields: ObservationFields,
    pub document: ObservationDocument,
}

impl FhirResource for Observation {
    const KIND: ResourceKind = ResourceKind::Observation;
    type Fields = ObservationFields;
    type Search = ObservationSearch;

    fn decode(document: Value, id: ResourceId, options: &CodecOptions) -> Result<Self> {
        let mut map = open_document(document, Self::KIND)?;
        let mut document = ObservationDocument {
            resource_type: Self::KIND,
            id,
            status: take_field(&mut map, "status"),
            code: take_field(&mut map, "code"),
            subject: take_field(&mut map, "subject"),
            encounter: take_field(&mut map, "encounter"),
            effective_date_time: take_field(&mut map, "effectiveDateTime"),
            effective_instant: take_field(&mut map, "effectiveInstant"),
            effective_period: take_field(&mut map, "effectivePeriod"),
            value_quantity: take_field(&mut map, "valueQuantity"),
            value_string: take_field(&mut map, "valueString"),
            extra: map,
        };

        let policy = options.on_malformed_reference;
        let subject_patient_id = policy.resolve(
            document.subject.as_ref().and_then(|r| r.reference.as_deref()),
            ResourceKind::Patient,
        )?;
        let encounter_id = policy.resolve(
            document.encounter.as_ref().and_then(|r| r.reference.as_deref()),
            ResourceKind::Encounter,
        )?;

        // Explicit date-time first, then instant, then the start of a period.
        let effective = normalize_instant(&mut document.effective_date_time)
            .or_else(|| normalize_instant(&mut document.effective_instant))
            .or_else(|| {
                document
                    .effective_period
                    .as_mut()
                    .and_then(|p| normalize_instant(&mut p.start))
            });

        let quantity = document.value_quantity.as_ref();
        let fields = ObservationFields {
            status: document.status.as_deref().map(ObservationStatus::from_code),
            code: document
                .code
                .as_ref()
                .and_then(|c| c.first_code())
                .map(str::to_string),
            subject_patient_id,
            encounter_id,
            effective,
            value_quantity_value: quantity.and_then(|q| q.value.as_ref()).and_then(|v| v.as_f64()),
            value_quantity_unit: quantity.and_then(|q| q.unit.clone()),
            value_string: document.value_string.clone(),
        };
        Ok(Self { fields, document })
    }

    fn encode(&self) -> Value {
        let f = &self.fields;
        let mut base = Map::new();
        base.insert("resourceType".into(), json!(Self::KIND));
        base.insert("id".into(), json!(self.document.id));
        if let Some(status) = f.status {
            base.insert("status".into(), json!(status.as_str()));
        }
        if let Some(code) = &f.code {
            base.insert("code".into(), json!(CodeableConcept::from_code(code)));
        }
        if let Some(subject) = &f.subject_patient_id {
            base.insert(
                "subject".into(),
                json!(Reference::to(format!("{}/{subject}", ResourceKind::Patient))),
            );
        }
        if let Some(encounter) = &f.encounter_id {
            base.insert(
                "encounter".into(),
                json!(Reference::to(format!("{}/{encounter}", ResourceKind::Encounter))),
            );
        }
        if let Some(effective) = f.effective.as_ref().and_then(format_instant) {
            base.insert("effectiveDateTime".into(), json!(effective));
        }
        if f.value_quantity_value.is_some() || f.value_quantity_unit.is_some() {
            let mut quantity = Map::new();
            if let Some(value) = f.value_quantity_value {
                quantity.insert("value".into(), json!(value));
            }
            if let Some(unit) = &f.value_quantity_unit {
                quantity.insert("unit".into(), json!(unit));
            }
            base.insert("valueQuantity".into(), Value::Object(quantity));
        }
        if let Some(value) = &f.value_string {
            base.insert("valueString".into(), json!(value));
        }
        overlay(base, to_json(&self.document))
    }

    fn id(&self) -> &ResourceId {
        &self.document.id
    }

    fn fields(&self) -> &ObservationFields {
        &self.fields
    }

    fn references(&self) -> Vec<FhirReference> {
        let subject = self
            .fields
            .subject_patient_id
            .iter()
            .map(|id| FhirReference::new(ResourceKind::Patient, id.clone()));
        let encounter = self
            .fields
            .encounter_id
            .iter()
            .map(|id| FhirReference::new(ResourceKind::Encounter, id.clone()));
        subject.chain(encounter).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSearch {
    pub code: Option<String>,
    pub subject: Option<ResourceId>,
    pub encounter: Option<ResourceId>,
    /// Inclusive lower bound on the effective time.
    pub date: Option<OffsetDateTime>,
}

impl ObservationSearch {
    /// Observations recorded during one encounter.
    pub fn for_encounter(encounter: ResourceId) -> Self {
        Self {
            encounter: Some(encounter),
            ..Self::default()
        }
    }
}

impl SearchFilter<Observation> for ObservationSearch {
    fn from_params(params: &SearchParams) -> Result<Self> {
        Ok(Self {
            code: string_param(params, "code"),
            subject: reference_param(params, "subject", ResourceKind::Patient)?,
            encounter: reference_param(params, "encounter", ResourceKind::Encounter)?,
            date: date_param(params, "date")?,
        })
    }

    fn matches(&self, observation: &Observation) -> bool {
        let f = &observation.fields;
        if let Some(code) = &self.code {
            if f.code.as_ref() != Some(code) {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if f.subject_patient_id.as_ref() != Some(subject) {
                return false;
            }
        }
        if let Some(encounter) = &self.encounter {
            if f.encounter_id.as_ref() != Some(encounter) {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if !f.effective.is_some_and(|effective| effective >= *date) {
                return false;
            }
        }
        true
    }
}
