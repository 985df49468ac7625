#![allow(dead_code)]

use fhirlite_auth::Role;
use fhirlite_server::{AppConfig, SeedUser, build_app};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const FHIR_JSON: &str = "application/fhir+json";

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn fhir(&self, path: &str) -> String {
        format!("{}/fhir/{}", self.base, path.trim_start_matches('/'))
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Log in and return the bearer token.
    pub async fn token(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(format!("{}/auth/login", self.base))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "login as {email}");
        let body: Value = resp.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create(&self, token: &str, kind: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.fhir(kind))
            .bearer_auth(token)
            .header("content-type", FHIR_JSON)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Create a resource that must succeed and return its id.
    pub async fn create_ok(&self, token: &str, kind: &str, body: &Value) -> String {
        let resp = self.create(token, kind, body).await;
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let created: Value = resp.json().await.unwrap();
        created["id"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.fhir(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }
}

pub fn seed(email: &str, password: &str, role: Role) -> SeedUser {
    SeedUser {
        email: email.into(),
        password: password.into(),
        role,
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.secret_key = "integration-test-secret".into();
    config.server.base_url = Some("http://fhir.test".into());
    config.bootstrap.users = vec![
        seed("admin@fhir.com", "admin123", Role::Admin),
        seed("clinician@fhir.com", "clinician123", Role::Clinician),
        seed("readonly@fhir.com", "readonly123", Role::ReadOnly),
    ];
    config
}

pub async fn start_server(config: &AppConfig) -> TestServer {
    let app = build_app(config).await.expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        shutdown: Some(tx),
        handle: Some(handle),
    }
}
