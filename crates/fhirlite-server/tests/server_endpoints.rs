mod common;

use common::{start_server, test_config};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn service_endpoints_and_metadata_need_no_token() {
    let mut config = test_config();
    config.bootstrap.users.clear();
    let server = start_server(&config).await;
    let client = &server.client;

    let resp = client.get(format!("{}/", server.base)).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "FHIR Lite Server");
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{}/healthz", server.base)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{}/readyz", server.base)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");

    let resp = client.get(server.fhir("metadata")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/fhir+json")
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["resourceType"], "CapabilityStatement");
    assert_eq!(body["status"], "active");
    assert_eq!(body["implementation"]["url"], "http://fhir.test/fhir");
    assert_eq!(body["rest"][0]["resource"].as_array().unwrap().len(), 3);

    server.stop().await;
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let mut config = test_config();
    config.bootstrap.users.clear();
    let server = start_server(&config).await;

    let resp = server
        .client
        .get(format!("{}/healthz", server.base))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-me");

    let resp = server
        .client
        .get(format!("{}/healthz", server.base))
        .send()
        .await
        .unwrap();
    assert!(!resp.headers()["x-request-id"].is_empty());

    server.stop().await;
}

#[tokio::test]
async fn resource_routes_require_a_bearer_token() {
    let mut config = test_config();
    config.bootstrap.users.clear();
    let server = start_server(&config).await;

    let resp = server.client.get(server.fhir("Patient")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()["www-authenticate"], "Bearer");
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["resourceType"], "OperationOutcome");
    assert_eq!(outcome["issue"][0]["severity"], "error");
    assert_eq!(outcome["issue"][0]["code"], "login");

    let resp = server
        .client
        .get(server.fhir("Patient/p1"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["issue"][0]["diagnostics"], "Could not validate credentials");

    server.stop().await;
}

#[tokio::test]
async fn unknown_resource_type_is_not_found() {
    let mut config = test_config();
    config.bootstrap.users.clear();
    let server = start_server(&config).await;

    let resp = server.client.get(server.fhir("Medication")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["issue"][0]["code"], "not-found");

    server.stop().await;
}
