use serde::Serialize;
use serde_json::{Map, Value, json};
use time::Date;

use crate::codec::{
    CodecOptions, FhirResource, code_vocabulary, open_document, overlay, take_field, to_json,
};
use crate::datatypes::{HumanName, Identifier};
use crate::error::Result;
use crate::fhir::ResourceKind;
use crate::id::ResourceId;
use crate::reference::FhirReference;
use crate::search::{SearchFilter, SearchParams, contains_ignore_case, string_param};
use crate::temporal::{format_date, parse_date};

/// Separator between given names in the indexed `name_given` field.
pub const GIVEN_NAME_SEPARATOR: &str = ", ";

code_vocabulary! {
    pub enum AdministrativeGender {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

/// Canonical Patient document: recognized elements plus everything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDocument {
    pub resource_type: ResourceKind,
    pub id: ResourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Vec<Identifier>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<HumanName>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientFields {
    pub identifier_value: Option<String>,
    pub name_family: Option<String>,
    /// All given names of the first name entry, joined with `", "`.
    pub name_given: Option<String>,
    pub gender: Option<AdministrativeGender>,
    pub birth_date: Option<Date>,
}

impl PatientFields {
    pub fn extract(doc: &PatientDocument) -> Self {
        let first_name = doc.name.as_ref().and_then(|names| names.first());
        Self {
            identifier_value: doc
                .identifier
                .as_ref()
                .and_then(|ids| ids.first())
                .and_then(|id| id.value.clone()),
            name_family: first_name.and_then(|n| n.family.clone()),
            name_given: first_name
                .and_then(|n| n.given.as_ref())
                .filter(|given| !given.is_empty())
                .map(|given| given.join(GIVEN_NAME_SEPARATOR)),
            gender: doc.gender.as_deref().map(AdministrativeGender::from_code),
            birth_date: doc.birth_date.as_deref().and_then(|d| parse_date(d).ok()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub fields: PatientFields,
    pub document: PatientDocument,
}

impl FhirResource for Patient {
    const KIND: ResourceKind = ResourceKind::Patient;
    type Fields = PatientFields;
    type Search = PatientSearch;

    fn decode(document: Value, id: ResourceId, _options: &CodecOptions) -> Result<Self> {
        let mut map = open_document(document, Self::KIND)?;
        let document = PatientDocument {
            resource_type: Self::KIND,
            id,
            identifier: take_field(&mut map, "identifier"),
            name: take_field(&mut map, "name"),
            gender: take_field(&mut map, "gender"),
            birth_date: take_field(&mut map, "birthDate"),
            extra: map,
        };
        let fields = PatientFields::extract(&document);
        Ok(Self { fields, document })
    }

    fn encode(&self) -> Value {
        let f = &self.fields;
        let mut base = Map::new();
        base.insert("resourceType".into(), json!(Self::KIND));
        base.insert("id".into(), json!(self.document.id));
        if let Some(value) = &f.identifier_value {
            base.insert("identifier".into(), json!([{ "value": value }]));
        }
        if f.name_family.is_some() || f.name_given.is_some() {
            let mut name = HumanName {
                family: f.name_family.clone(),
                ..HumanName::default()
            };
            name.given = f
                .name_given
                .as_ref()
                .map(|g| g.split(GIVEN_NAME_SEPARATOR).map(str::to_string).collect());
            base.insert("name".into(), json!([name]));
        }
        if let Some(gender) = f.gender {
            base.insert("gender".into(), json!(gender.as_str()));
        }
        if let Some(birth_date) = f.birth_date.as_ref().and_then(format_date) {
            base.insert("birthDate".into(), json!(birth_date));
        }
        overlay(base, to_json(&self.document))
    }

    fn id(&self) -> &ResourceId {
        &self.document.id
    }

    fn fields(&self) -> &PatientFields {
        &self.fields
    }

    fn references(&self) -> Vec<FhirReference> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientSearch {
    /// Case-insensitive substring of the family or given names.
    pub name: Option<String>,
    /// Case-insensitive substring of the first identifier value.
    pub identifier: Option<String>,
}

impl SearchFilter<Patient> for PatientSearch {
    fn from_params(params: &SearchParams) -> Result<Self> {
        Ok(Self {
            name: string_param(params, "name"),
            identifier: string_param(params, "identifier"),
        })
    }

    fn matches(&self, patient: &Patient) -> bool {
        let f = &patient.fields;
        if let Some(name) = &self.name {
            let hit = contains_ignore_case(f.name_family.as_deref(), name)
                || contains_ignore_case(f.name_given.as_deref(), name);
            if !hit {
                return false;
            }
        }
        if let Some(identifier) = &self.identifier {
            if !contains_ignore_case(f.identifier_value.as_deref(), identifier) {
                return false;
            }
        }
        true
    }
}
