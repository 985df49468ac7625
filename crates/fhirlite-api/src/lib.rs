//! # fhirlite-api
//!
//! Wire types shared by the HTTP layer: the error mapper that turns every
//! failure into an `OperationOutcome`, the FHIR JSON response wrapper, and
//! the Bundle and CapabilityStatement documents.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use fhirlite_core::CoreError;
use fhirlite_storage::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Media type of every FHIR JSON body.
pub const FHIR_JSON: &str = "application/fhir+json";

fn fhir_json_body<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_else(|_| {
        let fallback = OperationOutcome::single("error", "exception", "Serialization failure");
        serde_json::to_vec(&fallback).unwrap_or_else(|_| b"{}".to_vec())
    })
}

/// Minimal FHIR OperationOutcome representation for API error responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String, // always "OperationOutcome"
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcomeIssue {
    /// FHIR issue severity: fatal | error | warning | information
    pub severity: String,
    /// FHIR issue type code (subset used): invalid | not-found | conflict | forbidden | login | not-supported | exception
    pub code: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    pub fn single(severity: &str, code: &str, diagnostics: impl Into<String>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![OperationOutcomeIssue {
                severity: severity.to_string(),
                code: code.to_string(),
                diagnostics: Some(diagnostics.into()),
            }],
        }
    }

    /// Diagnostics of the first issue, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        self.issue.first().and_then(|i| i.diagnostics.as_deref())
    }
}

// -------------------------
// Error mapper
// -------------------------

/// High-level API errors mapped to HTTP responses and FHIR OperationOutcome
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    #[must_use]
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    #[must_use]
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    #[must_use]
    pub fn unsupported_media_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedMediaType(msg.into())
    }
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// FHIR issue type code reported for this error.
    pub fn issue_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid",
            ApiError::Unauthorized(_) => "login",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not-found",
            ApiError::Conflict(_) => "conflict",
            ApiError::UnsupportedMediaType(_) => "not-supported",
            ApiError::Internal(_) => "exception",
        }
    }

    /// The message without the variant prefix.
    pub fn diagnostics(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    pub fn to_operation_outcome(&self) -> OperationOutcome {
        OperationOutcome::single("error", self.issue_code(), self.diagnostics())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidId(_) => ApiError::bad_request("Invalid ID format"),
            CoreError::JsonError(e) => ApiError::internal(format!("JSON error: {e}")),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { resource_type, .. } => {
                ApiError::not_found(format!("{resource_type} not found"))
            }
            StorageError::AlreadyExists { resource_type, id } => {
                ApiError::conflict(format!("{resource_type}/{id} already exists"))
            }
            StorageError::Internal { message } => ApiError::internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal error while handling request");
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON));
        if matches!(self, ApiError::Unauthorized(_)) {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        let body = fhir_json_body(&self.to_operation_outcome());
        (status, headers, body).into_response()
    }
}


// -------------------------
// API Response Wrapper
// -------------------------

#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value,
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn created(value: T) -> Self {
        Self::new(value, StatusCode::CREATED)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Adds a `Location` header; values that are not valid header text are skipped.
    pub fn with_location(self, location: &str) -> Self {
        match HeaderValue::from_str(location) {
            Ok(value) => self.with_header(header::LOCATION, value),
            Err(_) => self,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = fhir_json_body(&self.value);
        let mut headers = HeaderMap::new();
        // Always set FHIR JSON content type
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON));
        for (n, v) in self.headers.into_iter() {
            headers.insert(n, v);
        }
        (self.status, headers, body).into_response()
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_response_ok_sets_status_and_content_type() {
        let payload = json!({"resourceType": "Patient"});
        let resp = ApiResponse::ok(payload).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert_eq!(content_type, &HeaderValue::from_static(FHIR_JSON));
    }

    #[test]
    fn created_response_carries_location() {
        let payload = json!({"resourceType": "Patient", "id": "p1"});
        let resp = ApiResponse::created(payload)
            .with_location("/fhir/Patient/p1")
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            &HeaderValue::from_static("/fhir/Patient/p1")
        );
    }

    #[test]
    fn invalid_location_is_skipped() {
        let resp = ApiResponse::created(json!({}))
            .with_location("bad\nvalue")
            .into_response();
        assert!(resp.headers().get(header::LOCATION).is_none());
    }
}

// -------------------------
// Content Negotiation
// -------------------------
/// Validate Content-Type for requests with bodies: require application/fhir+json or application/json
pub fn validate_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    if let Some(ct) = headers.get(header::CONTENT_TYPE) {
        let val = ct.to_str().unwrap_or("").to_ascii_lowercase();
        let allowed = val.starts_with(FHIR_JSON) || val.starts_with("application/json");
        if !allowed {
            return Err(ApiError::unsupported_media_type(format!(
                "Unsupported Content-Type: {val}. Only application/fhir+json or application/json are supported."
            )));
        }
    }
    Ok(())
}


// -------------------------
// FHIR Bundle Types
// -------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl", skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<BundleEntrySearch>,
}

/// Search component of a Bundle entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleEntrySearch {
    /// "match" for search results
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub link: Vec<BundleLink>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn searchset(total: u64, entries: Vec<BundleEntry>, links: Vec<BundleLink>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            bundle_type: "searchset".to_string(),
            total: Some(total),
            link: links,
            entry: entries,
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Wrap the full set of matching documents in a searchset Bundle.
///
/// There is no paging: `total` always equals the number of entries.
pub fn bundle_from_search(
    resources_json: Vec<JsonValue>,
    base_url: &str,
    resource_type: &str,
    query_suffix: Option<&str>,
) -> Bundle {
    let entries: Vec<BundleEntry> = resources_json
        .into_iter()
        .map(|res| {
            let full_url = res
                .get("id")
                .and_then(|v| v.as_str())
                .map(|id| join_url(base_url, &format!("{resource_type}/{id}")));
            BundleEntry {
                full_url,
                resource: Some(res),
                search: Some(BundleEntrySearch {
                    mode: "match".to_string(),
                }),
            }
        })
        .collect();

    let mut self_url = join_url(base_url, resource_type);
    if let Some(query) = query_suffix.filter(|q| !q.is_empty()) {
        self_url.push('?');
        self_url.push_str(query);
    }
    let links = vec![BundleLink {
        relation: "self".to_string(),
        url: self_url,
    }];
    Bundle::searchset(entries.len() as u64, entries, links)
}


// -------------------------
// CapabilityStatement Types
// -------------------------
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityStatement {
    #[serde(rename = "resourceType")]
    pub resource_type: String, // always "CapabilityStatement"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<CapabilityStatementSoftware>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<CapabilityStatementImplementation>,
    #[serde(rename = "fhirVersion")]
    pub fhir_version: String,
    pub format: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub rest: Vec<CapabilityStatementRest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityStatementSoftware {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityStatementImplementation {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityStatementRest {
    pub mode: String, // "server" or "client"
    #[serde(default)]
    pub resource: Vec<CapabilityStatementRestResource>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub operation: Vec<CapabilityStatementRestOperation>,
}

/// Operation definition in CapabilityStatement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityStatementRestOperation {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityStatementRestResource {
    #[serde(rename = "type")]
    pub type_: String, // Resource type name, e.g., "Patient"
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub interaction: Vec<ResourceInteraction>,
    #[serde(rename = "searchParam", skip_serializing_if = "Vec::is_empty", default)]
    pub search_param: Vec<SearchParam>,
}

impl CapabilityStatementRestResource {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_: type_name.into(),
            interaction: Vec::new(),
            search_param: Vec::new(),
        }
    }

    pub fn with_interactions(mut self, codes: &[&str]) -> Self {
        self.interaction = codes
            .iter()
            .map(|c| ResourceInteraction {
                code: c.to_string(),
            })
            .collect();
        self
    }

    pub fn with_search_params(mut self, params: Vec<SearchParam>) -> Self {
        self.search_param = params;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceInteraction {
    pub code: String, // e.g., "read", "search-type", "create", etc.
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParam {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String, // FHIR search parameter type, e.g., "token", "string"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl SearchParam {
    pub fn new(name: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_: type_.into(),
            documentation: None,
        }
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }
}

// -------------------------
// CapabilityStatement Builder
// -------------------------
#[derive(Debug, Default, Clone)]
pub struct CapabilityStatementBuilder {
    date: Option<String>,
    publisher: Option<String>,
    software: Option<CapabilityStatementSoftware>,
    implementation: Option<CapabilityStatementImplementation>,
    fhir_version: String,
    resources: Vec<CapabilityStatementRestResource>,
    operations: Vec<CapabilityStatementRestOperation>,
}

impl CapabilityStatementBuilder {
    pub fn new(fhir_version: impl Into<String>) -> Self {
        Self {
            fhir_version: fhir_version.into(),
            ..Self::default()
        }
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn software(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.software = Some(CapabilityStatementSoftware {
            name: name.into(),
            version: Some(version.into()),
        });
        self
    }

    pub fn implementation(mut self, description: impl Into<String>, url: impl Into<String>) -> Self {
        self.implementation = Some(CapabilityStatementImplementation {
            description: description.into(),
            url: Some(url.into()),
        });
        self
    }

    pub fn add_resource(
        mut self,
        type_name: impl Into<String>,
        interactions: &[&str],
        search_params: Vec<SearchParam>,
    ) -> Self {
        let r = CapabilityStatementRestResource::new(type_name)
            .with_interactions(interactions)
            .with_search_params(search_params);
        self.resources.push(r);
        self
    }

    pub fn add_operation(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.operations.push(CapabilityStatementRestOperation {
            name: name.into(),
            definition: definition.into(),
        });
        self
    }

    pub fn build(self) -> CapabilityStatement {
        CapabilityStatement {
            resource_type: "CapabilityStatement".to_string(),
            status: "active".to_string(),
            date: self.date,
            publisher: self.publisher,
            kind: "instance".to_string(),
            software: self.software,
            implementation: self.implementation,
            fhir_version: self.fhir_version,
            format: vec![FHIR_JSON.to_string()],
            rest: vec![CapabilityStatementRest {
                mode: "server".to_string(),
                resource: self.resources,
                operation: self.operations,
            }],
        }
    }
}
