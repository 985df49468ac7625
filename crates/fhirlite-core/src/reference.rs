//! Reference parsing for cross-resource pointers.
//!
//! A reference such as `{"reference": "Patient/abc-123"}` is resolved to the
//! id of the target resource. Accepted forms:
//! - Relative: `Patient/123`
//! - Versioned: `Patient/123/_history/1` (version is ignored)
//! - Absolute URL whose path ends in `Patient/123`
//!
//! Contained (`#id`) and URN (`urn:uuid:...`) references never name a
//! stored resource and count as malformed.
//!
//! What happens to a malformed reference is decided by
//! [`MalformedReferencePolicy`]: either it is dropped (treated as absent)
//! or decoding fails with [`CoreError::MalformedReference`].
//!
//! ```
//! use fhirlite_core::reference::{MalformedReferencePolicy, parse_reference};
//! use fhirlite_core::ResourceKind;
//!
//! let r = parse_reference("Patient/abc-123", ResourceKind::Patient).unwrap();
//! assert_eq!(r.id.as_str(), "abc-123");
//!
//! let lenient = MalformedReferencePolicy::DropSilently;
//! assert_eq!(lenient.resolve(Some("nonsense"), ResourceKind::Patient).unwrap(), None);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::fhir::ResourceKind;
use crate::id::ResourceId;

/// A successfully parsed local reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FhirReference {
    pub kind: ResourceKind,
    pub id: ResourceId,
}

impl FhirReference {
    pub fn new(kind: ResourceKind, id: ResourceId) -> Self {
        Self { kind, id }
    }

    /// Returns the reference as a relative string (Type/id).
    pub fn to_relative(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }
}

impl fmt::Display for FhirReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_relative())
    }
}

/// Why a reference could not be resolved to a local resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvableReference {
    /// A contained reference (starts with `#`)
    Contained(String),
    /// A URN reference (`urn:uuid:xxx` or `urn:oid:xxx`)
    Urn(String),
    /// Points at a different resource kind than the field allows
    WrongKind { expected: ResourceKind, found: String },
    /// A malformed or invalid reference
    Invalid(String),
}

impl fmt::Display for UnresolvableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contained(id) => write!(f, "contained reference: #{id}"),
            Self::Urn(urn) => write!(f, "URN reference: {urn}"),
            Self::WrongKind { expected, found } => {
                write!(f, "expected a {expected} reference, found {found}")
            }
            Self::Invalid(reason) => write!(f, "invalid reference: {reason}"),
        }
    }
}

impl std::error::Error for UnresolvableReference {}

/// Parse a reference string that must point at a resource of kind `expected`.
pub fn parse_reference(
    reference: &str,
    expected: ResourceKind,
) -> std::result::Result<FhirReference, UnresolvableReference> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(UnresolvableReference::Invalid(
            "empty reference".to_string(),
        ));
    }

    if let Some(contained_id) = reference.strip_prefix('#') {
        return Err(UnresolvableReference::Contained(contained_id.to_string()));
    }

    if reference.starts_with("urn:") {
        return Err(UnresolvableReference::Urn(reference.to_string()));
    }

    // Drop the version suffix, then take the last two path segments.
    let path = match reference.find("/_history/") {
        Some(pos) => &reference[..pos],
        None => reference,
    };
    let mut segments = path.rsplit('/');
    let id = segments.next().unwrap_or_default();
    let resource_type = segments.next().ok_or_else(|| {
        UnresolvableReference::Invalid(format!(
            "reference must contain at least Type/id: {reference}"
        ))
    })?;

    if resource_type != expected.as_str() {
        return Err(UnresolvableReference::WrongKind {
            expected,
            found: resource_type.to_string(),
        });
    }

    if id.is_empty() {
        return Err(UnresolvableReference::Invalid(
            "resource id cannot be empty".to_string(),
        ));
    }

    let id = ResourceId::parse(id)
        .map_err(|_| UnresolvableReference::Invalid(format!("invalid resource id: {id}")))?;

    Ok(FhirReference::new(expected, id))
}

/// What the codec does with a reference it cannot resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedReferencePolicy {
    /// Treat the reference as absent and keep decoding.
    #[default]
    DropSilently,
    /// Fail the decode with a validation error.
    Reject,
}

impl MalformedReferencePolicy {
    /// Resolve an optional reference string into the referenced id.
    ///
    /// Missing and empty references are absent under both policies.
    pub fn resolve(
        self,
        reference: Option<&str>,
        expected: ResourceKind,
    ) -> Result<Option<ResourceId>> {
        let Some(raw) = reference.filter(|r| !r.trim().is_empty()) else {
            return Ok(None);
        };
        match parse_reference(raw, expected) {
            Ok(parsed) => Ok(Some(parsed.id)),
            Err(reason) => match self {
                Self::DropSilently => {
                    tracing::debug!(reference = %raw, %reason, "dropping unresolvable reference");
                    Ok(None)
                }
                Self::Reject => Err(CoreError::malformed_reference(raw, reason.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_relative_reference() {
        let r = parse_reference("Patient/abc-123", ResourceKind::Patient).unwrap();
        assert_eq!(r.kind, ResourceKind::Patient);
        assert_eq!(r.id.as_str(), "abc-123");
    }

    #[test]
    fn test_versioned_reference() {
        let r = parse_reference("Encounter/e1/_history/2", ResourceKind::Encounter).unwrap();
        assert_eq!(r.id.as_str(), "e1");
    }

    #[test]
    fn test_absolute_url_reference() {
        let r = parse_reference(
            "http://localhost:8000/fhir/Patient/123",
            ResourceKind::Patient,
        )
        .unwrap();
        assert_eq!(r.id.as_str(), "123");
    }

    #[test]
    fn test_contained_reference() {
        let result = parse_reference("#contained-id", ResourceKind::Patient);
        assert!(
            matches!(result, Err(UnresolvableReference::Contained(id)) if id == "contained-id")
        );
    }

    #[test]
    fn test_urn_reference() {
        let result = parse_reference(
            "urn:uuid:550e8400-e29b-41d4-a716-446655440000",
            ResourceKind::Patient,
        );
        assert!(matches!(result, Err(UnresolvableReference::Urn(_))));
    }

    #[test]
    fn test_wrong_kind() {
        let result = parse_reference("Encounter/123", ResourceKind::Patient);
        assert!(matches!(
            result,
            Err(UnresolvableReference::WrongKind { expected: ResourceKind::Patient, found }) if found == "Encounter"
        ));
    }

    #[test]
    fn test_invalid_forms() {
        for raw in ["", "  ", "Patient/", "Patient123", "Patient/has space", "Patient/a_b"] {
            let result = parse_reference(raw, ResourceKind::Patient);
            assert!(result.is_err(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_to_relative_and_display() {
        let r = FhirReference::new(ResourceKind::Patient, ResourceId::parse("123").unwrap());
        assert_eq!(r.to_relative(), "Patient/123");
        assert_eq!(format!("{r}"), "Patient/123");
    }

    #[test]
    fn drop_silently_never_raises() {
        let policy = MalformedReferencePolicy::DropSilently;
        assert_eq!(
            policy
                .resolve(Some("Patient/abc-123"), ResourceKind::Patient)
                .unwrap()
                .map(ResourceId::into_inner),
            Some("abc-123".to_string())
        );
        for raw in [None, Some(""), Some("not a reference"), Some("Patient/"), Some("#x")] {
            assert_eq!(policy.resolve(raw, ResourceKind::Patient).unwrap(), None);
        }
    }

    #[test]
    fn reject_raises_on_malformed_only() {
        let policy = MalformedReferencePolicy::Reject;
        assert_eq!(policy.resolve(None, ResourceKind::Patient).unwrap(), None);
        assert_eq!(policy.resolve(Some(""), ResourceKind::Patient).unwrap(), None);
        assert!(policy.resolve(Some("Patient/ok"), ResourceKind::Patient).unwrap().is_some());
        let err = policy
            .resolve(Some("not a reference"), ResourceKind::Patient)
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedReference { .. }));
    }

    #[test]
    fn policy_serde_is_kebab_case() {
        let p: MalformedReferencePolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(p, MalformedReferencePolicy::Reject);
        assert_eq!(
            serde_json::to_string(&MalformedReferencePolicy::DropSilently).unwrap(),
            "\"drop-silently\""
        );
    }
}
