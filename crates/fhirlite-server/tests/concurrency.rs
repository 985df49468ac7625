mod common;

use common::{FHIR_JSON, start_server, test_config};
use futures_util::future::join_all;
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_leave_one_complete_version() {
    let server = start_server(&test_config()).await;
    let token = server.token("admin@fhir.com", "admin123").await;
    let id = server
        .create_ok(&token, "Patient", &json!({"resourceType": "Patient"}))
        .await;

    let writers = (0..16).map(|n| {
        let url = server.fhir(&format!("Patient/{id}"));
        let client = server.client.clone();
        let token = token.clone();
        let id = id.clone();
        async move {
            let body = json!({
                "resourceType": "Patient",
                "id": id,
                "name": [{"family": format!("Writer{n}"), "given": [format!("G{n}")]}]
            });
            client
                .put(url)
                .bearer_auth(token)
                .header("content-type", FHIR_JSON)
                .json(&body)
                .send()
                .await
                .unwrap()
                .status()
        }
    });
    let statuses = join_all(writers).await;
    assert!(statuses.iter().all(|s| *s == StatusCode::OK));

    let current: Value = server
        .get(&token, &format!("Patient/{id}"))
        .await
        .json()
        .await
        .unwrap();
    let family = current["name"][0]["family"].as_str().unwrap();
    let given = current["name"][0]["given"][0].as_str().unwrap();
    // Whichever write won, its fields were stored together.
    let n = family.strip_prefix("Writer").unwrap();
    assert_eq!(given, format!("G{n}"));

    let bundle: Value = server.get(&token, "Patient").await.json().await.unwrap();
    assert_eq!(bundle["total"], 1);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_ids() {
    let server = start_server(&test_config()).await;
    let token = server.token("clinician@fhir.com", "clinician123").await;

    let (server_ref, token_ref) = (&server, token.as_str());
    let creates = (0..20).map(move |n| {
        let body = json!({"resourceType": "Patient", "name": [{"family": format!("P{n}")}]});
        async move { server_ref.create_ok(token_ref, "Patient", &body).await }
    });
    let mut ids = join_all(creates).await;
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);

    let bundle: Value = server.get(&token, "Patient").await.json().await.unwrap();
    assert_eq!(bundle["total"], 20);

    server.stop().await;
}
