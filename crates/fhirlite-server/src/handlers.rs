use axum::{
    Json,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use fhirlite_api::{ApiError, ApiResponse, CapabilityStatement, bundle_from_search, validate_content_type};
use fhirlite_auth::{AccessToken, BearerAuth, UserProfile};
use fhirlite_core::{FhirResource, SearchParams};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::batch::{self, BatchResult};
use crate::server::AppState;
use crate::service::{ServiceOf, Services};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "FHIR Lite Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    // The in-memory stores are ready as soon as the router exists.
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

pub async fn metadata(State(state): State<AppState>) -> ApiResponse<CapabilityStatement> {
    ApiResponse::ok(state.capability.as_ref().clone())
}

// ---- Resource interactions ----

/// Parse a request body as a JSON document, honoring Content-Type.
fn json_body(headers: &HeaderMap, body: &Bytes) -> Result<Value, ApiError> {
    validate_content_type(headers)?;
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body is required"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))
}

fn search_params(query: Option<&str>) -> SearchParams {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

pub async fn create<R>(
    State(state): State<AppState>,
    BearerAuth(user): BearerAuth,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<Value>, ApiError>
where
    R: FhirResource,
    Services: ServiceOf<R>,
{
    let document = json_body(&headers, &body)?;
    let stored = state.services.of::<R>().create(&user, document).await?;
    let location = format!("/fhir/{}/{}", R::KIND, stored.resource.id());
    Ok(ApiResponse::created(stored.to_document()).with_location(&location))
}

pub async fn read<R>(
    State(state): State<AppState>,
    BearerAuth(user): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError>
where
    R: FhirResource,
    Services: ServiceOf<R>,
{
    let stored = state.services.of::<R>().read(&user, &id).await?;
    Ok(ApiResponse::ok(stored.to_document()))
}

pub async fn update<R>(
    State(state): State<AppState>,
    BearerAuth(user): BearerAuth,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<Value>, ApiError>
where
    R: FhirResource,
    Services: ServiceOf<R>,
{
    let document = json_body(&headers, &body)?;
    let stored = state.services.of::<R>().update(&user, &id, document).await?;
    Ok(ApiResponse::ok(stored.to_document()))
}

pub async fn delete<R>(
    State(state): State<AppState>,
    BearerAuth(user): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError>
where
    R: FhirResource,
    Services: ServiceOf<R>,
{
    state.services.of::<R>().delete(&user, &id).await?;
    Ok(ApiResponse::ok(json!({"deleted": true})))
}

pub async fn search<R>(
    State(state): State<AppState>,
    BearerAuth(user): BearerAuth,
    RawQuery(query): RawQuery,
) -> Result<ApiResponse<Value>, ApiError>
where
    R: FhirResource,
    Services: ServiceOf<R>,
{
    let params = search_params(query.as_deref());
    let found = state.services.of::<R>().search(&user, &params).await?;
    let documents = found.iter().map(|s| s.to_document()).collect();
    let bundle = bundle_from_search(
        documents,
        &state.fhir_base_url,
        R::KIND.as_str(),
        query.as_deref(),
    );
    let value = serde_json::to_value(bundle)
        .map_err(|e| ApiError::internal(format!("failed to serialize bundle: {e}")))?;
    Ok(ApiResponse::ok(value))
}

pub async fn submit_bundle(
    State(state): State<AppState>,
    BearerAuth(user): BearerAuth,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<BatchResult>, ApiError> {
    let bundle = json_body(&headers, &body)?;
    let result = batch::submit_bundle(&state.services, &user, bundle).await?;
    Ok(ApiResponse::ok(result))
}

pub async fn unknown_fhir_route(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Unsupported resource type or route: {}", uri.path()))
}

// ---- Authentication ----

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AccessToken>, ApiError> {
    let request: LoginRequest = serde_json::from_value(json_body(&headers, &body)?)
        .map_err(|e| ApiError::bad_request(format!("Invalid login request: {e}")))?;
    let token = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(token))
}

pub async fn me(BearerAuth(user): BearerAuth) -> Json<UserProfile> {
    Json(user.profile())
}
