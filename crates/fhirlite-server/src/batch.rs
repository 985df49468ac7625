//! `$submit-bundle`: create every resource in a Bundle, one at a time.
//!
//! Entries are independent. Each goes through the same create path as a
//! standalone request and is committed on its own; an entry that fails is
//! logged and skipped, and entries already stored stay stored.

use fhirlite_api::ApiError;
use fhirlite_auth::{Action, AuthError, User, allowed};
use fhirlite_core::{AnyResource, FhirResource, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::service::Services;

/// A resource created from a bundle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEntry {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub status: String,
    pub created: Vec<CreatedEntry>,
}

/// Create the resources of `bundle` in entry order.
///
/// # Errors
///
/// Fails before any entry is processed if the caller may not create
/// resources or the body is not a Bundle with at least one entry. Failures
/// of individual entries are not errors.
pub async fn submit_bundle(
    services: &Services,
    user: &User,
    bundle: Value,
) -> Result<BatchResult, ApiError> {
    if !allowed(user.role, Action::Create) {
        tracing::info!(role = %user.role, "bundle submission denied");
        return Err(AuthError::forbidden("Insufficient permissions").into());
    }

    let Value::Object(mut bundle) = bundle else {
        return Err(ApiError::bad_request("Bundle must be a JSON object"));
    };
    match bundle.get("resourceType") {
        None => {}
        Some(Value::String(tag)) if tag == "Bundle" => {}
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "Expected resourceType 'Bundle', found {other}"
            )));
        }
    }
    let entries = match bundle.remove("entry") {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => return Err(ApiError::bad_request("Bundle must contain entries")),
    };

    let total = entries.len();
    let mut created = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let resource = match entry {
            Value::Object(mut entry) => entry.remove("resource").filter(|r| !r.is_null()),
            _ => None,
        };
        let Some(resource) = resource else {
            tracing::debug!(index, "bundle entry without resource skipped");
            continue;
        };

        match create_entry(services, user, resource).await {
            Ok((kind, id)) => created.push(CreatedEntry {
                resource_type: kind.to_string(),
                id: id.into_inner(),
            }),
            Err(err) => {
                tracing::warn!(index, user = %user.email, error = %err, "bundle entry skipped");
            }
        }
    }

    tracing::info!(
        user = %user.email,
        entries = total,
        created = created.len(),
        "bundle processed"
    );
    Ok(BatchResult {
        status: "success".to_string(),
        created,
    })
}

async fn create_entry(
    services: &Services,
    user: &User,
    resource: Value,
) -> Result<(ResourceKind, ResourceId), ApiError> {
    let kind = AnyResource::kind_of(&resource)?;
    let id = match kind {
        ResourceKind::Patient => services.patients.create(user, resource).await?.resource.id().clone(),
        ResourceKind::Encounter => {
            services.encounters.create(user, resource).await?.resource.id().clone()
        }
        ResourceKind::Observation => {
            services.observations.create(user, resource).await?.resource.id().clone()
        }
    };
    Ok((kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferentialIntegrity;
    use fhirlite_auth::Role;
    use fhirlite_core::{CodecOptions, SearchParams};
    use fhirlite_db_memory::create_stores;
    use serde_json::json;

    fn services() -> Services {
        Services::new(
            create_stores(),
            CodecOptions::default(),
            ReferentialIntegrity::ObservationOnly,
        )
    }

    fn clinician() -> User {
        User::new("clinician@fhir.com", "hash", Role::Clinician)
    }

    #[tokio::test]
    async fn failed_entry_does_not_roll_back_others() {
        let services = services();
        let user = clinician();
        let bundle = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Patient", "name": [{"family": "First"}]}},
                {"resource": {"name": [{"family": "NoType"}]}},
                {"resource": {"resourceType": "Patient", "name": [{"family": "Third"}]}}
            ]
        });

        let result = submit_bundle(&services, &user, bundle).await.unwrap();
        assert_eq!(result.status, "success");
        assert_eq!(result.created.len(), 2);
        assert!(result.created.iter().all(|c| c.resource_type == "Patient"));

        let stored = services
            .patients
            .search(&user, &SearchParams::new())
            .await
            .unwrap();
        let mut families: Vec<_> = stored
            .iter()
            .filter_map(|s| s.resource.fields.name_family.clone())
            .collect();
        families.sort();
        assert_eq!(families, vec!["First", "Third"]);
    }

    #[tokio::test]
    async fn unresolvable_and_unsupported_entries_are_skipped() {
        let services = services();
        let user = clinician();
        let patient = services
            .patients
            .create(&user, json!({"resourceType": "Patient"}))
            .await
            .unwrap();
        let pid = patient.resource.id().as_str();

        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Observation", "subject": {"reference": format!("Patient/{pid}")}}},
                {"resource": {"resourceType": "Observation", "subject": {"reference": "Patient/ghost"}}},
                {"fullUrl": "urn:uuid:no-resource"},
                {"resource": {"resourceType": "Medication"}}
            ]
        });
        let result = submit_bundle(&services, &user, bundle).await.unwrap();
        assert_eq!(result.created.len(), 1);
        assert_eq!(result.created[0].resource_type, "Observation");
    }

    #[tokio::test]
    async fn read_only_user_is_rejected_up_front() {
        let services = services();
        let reader = User::new("readonly@fhir.com", "hash", Role::ReadOnly);
        let bundle = json!({"entry": [{"resource": {"resourceType": "Patient"}}]});
        let err = submit_bundle(&services, &reader, bundle).await.unwrap_err();
        assert_eq!(err, ApiError::forbidden("Insufficient permissions"));
        assert!(services
            .patients
            .search(&reader, &SearchParams::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn malformed_bundles_are_bad_requests() {
        let services = services();
        let user = clinician();
        for body in [
            json!({"resourceType": "Bundle", "entry": []}),
            json!({"resourceType": "Bundle"}),
            json!({"resourceType": "Bundle", "entry": {"resource": {}}}),
        ] {
            let err = submit_bundle(&services, &user, body).await.unwrap_err();
            assert_eq!(err, ApiError::bad_request("Bundle must contain entries"));
        }
        let err = submit_bundle(&services, &user, json!({"resourceType": "Patient", "entry": [{}]}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        let err = submit_bundle(&services, &user, json!([1])).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
