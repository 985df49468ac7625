mod common;

use common::{FHIR_JSON, start_server, test_config};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn submit_bundle_keeps_entries_before_and_after_a_failure() {
    let server = start_server(&test_config()).await;
    let token = server.token("clinician@fhir.com", "clinician123").await;

    let bundle = json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {"resource": {"resourceType": "Patient", "name": [{"family": "Alpha"}]}},
            {"resource": {"resourceType": "Observation", "subject": {"reference": "Patient/nobody"}}},
            {"resource": {"resourceType": "Patient", "name": [{"family": "Omega"}]}}
        ]
    });
    let resp = server
        .client
        .post(server.fhir("$submit-bundle"))
        .bearer_auth(&token)
        .header("content-type", FHIR_JSON)
        .json(&bundle)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    let created = body["created"].as_array().unwrap();
    assert_eq!(created.len(), 2);
    for entry in created {
        assert_eq!(entry["resourceType"], "Patient");
        let id = entry["id"].as_str().unwrap();
        let resp = server.get(&token, &format!("Patient/{id}")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let observations: Value = server.get(&token, "Observation").await.json().await.unwrap();
    assert_eq!(observations["total"], 0);

    server.stop().await;
}

#[tokio::test]
async fn submit_bundle_rejects_empty_bundles_and_readers() {
    let server = start_server(&test_config()).await;
    let clinician = server.token("clinician@fhir.com", "clinician123").await;
    let reader = server.token("readonly@fhir.com", "readonly123").await;

    let resp = server
        .client
        .post(server.fhir("$submit-bundle"))
        .bearer_auth(&clinician)
        .header("content-type", FHIR_JSON)
        .json(&json!({"resourceType": "Bundle", "entry": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["resourceType"], "OperationOutcome");
    assert_eq!(outcome["issue"][0]["diagnostics"], "Bundle must contain entries");

    let resp = server
        .client
        .post(server.fhir("$submit-bundle"))
        .bearer_auth(&reader)
        .header("content-type", FHIR_JSON)
        .json(&json!({"resourceType": "Bundle", "entry": [{"resource": {"resourceType": "Patient"}}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let patients: Value = server.get(&reader, "Patient").await.json().await.unwrap();
    assert_eq!(patients["total"], 0);

    server.stop().await;
}
