use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, Method, Request, Response, header},
    middleware,
    routing::{get, post},
};
use fhirlite_api::CapabilityStatement;
use fhirlite_auth::{AuthState, DynUserStore, JwtService};
use fhirlite_core::{Encounter, Observation, Patient};
use fhirlite_db_memory::{InMemoryUserStore, create_stores};
use fhirlite_storage::Stores;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    bootstrap, config::AppConfig, handlers, metadata,
    middleware::{self as app_middleware, RequestId},
    service::Services,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: AuthState,
    pub capability: Arc<CapabilityStatement>,
    pub fhir_base_url: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    pub fn new(cfg: &AppConfig, stores: Stores, users: DynUserStore) -> Self {
        let jwt = JwtService::new(&cfg.auth.secret_key, cfg.auth.algorithm, cfg.token_ttl());
        Self {
            services: Services::new(
                stores,
                cfg.fhir.codec_options(),
                cfg.fhir.referential_integrity,
            ),
            auth: AuthState::new(Arc::new(jwt), users),
            capability: Arc::new(metadata::capability_statement(cfg)),
            fhir_base_url: cfg.fhir_base_url(),
        }
    }
}

/// Build the router over fresh in-memory stores, seeding configured users.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let users: DynUserStore = Arc::new(InMemoryUserStore::new());
    bootstrap::seed_users(users.as_ref(), &cfg.bootstrap.users).await?;
    let state = AppState::new(cfg, create_stores(), users);
    Ok(router(state, cfg))
}

/// The full route table and middleware stack over `state`.
pub fn router(state: AppState, cfg: &AppConfig) -> Router {
    let fhir = Router::new()
        .route("/metadata", get(handlers::metadata))
        .route("/$submit-bundle", post(handlers::submit_bundle))
        .route(
            "/Patient",
            get(handlers::search::<Patient>).post(handlers::create::<Patient>),
        )
        .route(
            "/Patient/{id}",
            get(handlers::read::<Patient>)
                .put(handlers::update::<Patient>)
                .delete(handlers::delete::<Patient>),
        )
        .route(
            "/Encounter",
            get(handlers::search::<Encounter>).post(handlers::create::<Encounter>),
        )
        .route(
            "/Encounter/{id}",
            get(handlers::read::<Encounter>)
                .put(handlers::update::<Encounter>)
                .delete(handlers::delete::<Encounter>),
        )
        .route(
            "/Observation",
            get(handlers::search::<Observation>).post(handlers::create::<Observation>),
        )
        .route(
            "/Observation/{id}",
            get(handlers::read::<Observation>)
                .put(handlers::update::<Observation>)
                .delete(handlers::delete::<Observation>),
        )
        .fallback(handlers::unknown_fhir_route);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/auth/login", post(handlers::login))
        .route("/auth/me", get(handlers::me))
        .nest("/fhir", fhir)
        .with_state(state)
        // Middleware stack (outermost last): compression -> trace -> request id -> cors -> body limit
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<RequestId>()
                        .and_then(|id| id.0.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(cors_layer(&cfg.cors.origins))
        .layer(axum::extract::DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers(Any)
}

pub struct FhirLiteServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<FhirLiteServer> {
        let app = build_app(&self.config).await?;
        Ok(FhirLiteServer {
            addr: self.addr,
            app,
        })
    }
}

impl FhirLiteServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
