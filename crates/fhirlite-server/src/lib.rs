pub mod batch;
pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod metadata;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod service;

pub use batch::{BatchResult, CreatedEntry, submit_bundle};
pub use config::{AppConfig, FhirSettings, ReferentialIntegrity, SeedUser, ServerConfig};
pub use observability::{LogLevelHandle, init_tracing};
pub use server::{AppState, FhirLiteServer, ServerBuilder, build_app, router};
pub use service::{ResourceService, ServiceOf, Services};
