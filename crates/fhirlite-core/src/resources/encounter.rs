use serde::Serialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;

use crate::codec::{
    CodecOptions, FhirResource, code_vocabulary, open_document, overlay, take_field, to_json,
};
use crate::datatypes::{CodeableConcept, Coding, Period, Reference};
use crate::error::Result;
use crate::fhir::ResourceKind;
use crate::id::ResourceId;
use crate::reference::FhirReference;
use crate::search::{SearchFilter, SearchParams, date_param, reference_param, string_param};
use crate::temporal::{format_instant, parse_instant};

code_vocabulary! {
    pub enum EncounterStatus {
        Planned => "planned",
        Arrived => "arrived",
        Triaged => "triaged",
        InProgress => "in-progress",
        OnLeave => "onleave",
        Finished => "finished",
        Cancelled => "cancelled",
        EnteredInError => "entered-in-error",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterDocument {
    pub resource_type: ResourceKind,
    pub id: ResourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class: Option<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<Vec<CodeableConcept>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncounterFields {
    pub status: Option<EncounterStatus>,
    pub class_code: Option<String>,
    pub subject_patient_id: Option<ResourceId>,
    pub period_start: Option<OffsetDateTime>,
    pub period_end: Option<OffsetDateTime>,
    /// Code of the first coding of the first reason.
    pub reason_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub fields: EncounterFields,
    pub document: EncounterDocument,
}

impl FhirResource for Encounter {
    const KIND: ResourceKind = ResourceKind::Encounter;
    type Fields = EncounterFields;
    type Search = EncounterSearch;

    fn decode(document: Value, id: ResourceId, options: &CodecOptions) -> Result<Self> {
        let mut map = open_document(document, Self::KIND)?;
        let mut document = EncounterDocument {
            resource_type: Self::KIND,
            id,
            status: take_field(&mut map, "status"),
            class: take_field(&mut map, "class"),
            subject: take_field(&mut map, "subject"),
            period: take_field(&mut map, "period"),
            reason_code: take_field(&mut map, "reasonCode"),
            extra: map,
        };

        let subject_patient_id = options.on_malformed_reference.resolve(
            document.subject.as_ref().and_then(|s| s.reference.as_deref()),
            ResourceKind::Patient,
        )?;

        // Normalize period bounds to RFC 3339 in the stored document.
        let mut period_start = None;
        let mut period_end = None;
        if let Some(period) = document.period.as_mut() {
            period_start = normalize_instant(&mut period.start);
            period_end = normalize_instant(&mut period.end);
        }

        let fields = EncounterFields {
            status: document.status.as_deref().map(EncounterStatus::from_code),
            class_code: document.class.as_ref().and_then(|c| c.code.clone()),
            subject_patient_id,
            period_start,
            period_end,
            reason_code: document
                .reason_code
                .as_ref()
                .and_then(|reasons| reasons.first())
                .and_then(|reason| reason.first_code())
                .map(str::to_string),
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
        if let Some(code) = &f.class_code {
            base.insert("class".into(), json!(Coding::code(code)));
        }
        if let Some(subject) = &f.subject_patient_id {
            base.insert(
                "subject".into(),
                json!(Reference::to(format!("{}/{subject}", ResourceKind::Patient))),
            );
        }
        if f.period_start.is_some() || f.period_end.is_some() {
            let period = Period {
                start: f.period_start.as_ref().and_then(format_instant),
                end: f.period_end.as_ref().and_then(format_instant),
                ..Period::default()
            };
            base.insert("period".into(), json!(period));
        }
        if let Some(code) = &f.reason_code {
            base.insert("reasonCode".into(), json!([CodeableConcept::from_code(code)]));
        }
        overlay(base, to_json(&self.document))
    }

    fn id(&self) -> &ResourceId {
        &self.document.id
    }

    fn fields(&self) -> &EncounterFields {
        &self.fields
    }

    fn references(&self) -> Vec<FhirReference> {
        self.fields
            .subject_patient_id
            .iter()
            .map(|id| FhirReference::new(ResourceKind::Patient, id.clone()))
            .collect()
    }
}

/// Parse a timestamp in place, rewriting it in canonical form when valid.
pub(crate) fn normalize_instant(slot: &mut Option<String>) -> Option<OffsetDateTime> {
    let parsed = slot.as_deref().and_then(|raw| parse_instant(raw).ok())?;
    if let Some(text) = format_instant(&parsed) {
        *slot = Some(text);
    }
    Some(parsed)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncounterSearch {
    pub status: Option<String>,
    pub subject: Option<ResourceId>,
    /// Inclusive lower bound on `period.start`.
    pub date: Option<OffsetDateTime>,
}

impl SearchFilter<Encounter> for EncounterSearch {
    fn from_params(params: &SearchParams) -> Result<Self> {
        Ok(Self {
            status: string_param(params, "status"),
            subject: reference_param(params, "subject", ResourceKind::Patient)?,
            date: date_param(params, "date")?,
        })
    }

    fn matches(&self, encounter: &Encounter) -> bool {
        let f = &encounter.fields;
        if let Some(status) = &self.status {
            if f.status.map(|s| s.as_str()) != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if f.subject_patient_id.as_ref() != Some(subject) {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if !f.period_start.is_some_and(|start| start >= *date) {
                return false;
            }
        }
        true
    }
}
