use std::net::SocketAddr;

use fhirlite_auth::{JwtAlgorithm, Role};
use fhirlite_core::{CodecOptions, MalformedReferencePolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fhir: FhirSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Users seeded at startup
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if let Some(base) = &self.server.base_url {
            url::Url::parse(base).map_err(|e| format!("server.base_url is not a valid URL: {e}"))?;
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        let v = self.fhir.version.to_ascii_uppercase();
        if !["R4", "4.0.1"].contains(&v.as_str()) {
            return Err("fhir.version must be R4".into());
        }
        if self.auth.secret_key.trim().is_empty() {
            return Err("auth.secret_key must be set".into());
        }
        if self.auth.access_token_expire_minutes <= 0 {
            return Err("auth.access_token_expire_minutes must be > 0".into());
        }
        for user in &self.bootstrap.users {
            if user.email.trim().is_empty() || user.password.is_empty() {
                return Err("bootstrap.users entries need an email and a password".into());
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Returns the base URL for the server.
    /// If `base_url` is configured, returns that; otherwise computes from host:port.
    pub fn base_url(&self) -> String {
        self.server
            .base_url
            .clone()
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }

    pub fn fhir_base_url(&self) -> String {
        format!("{}/fhir", self.base_url())
    }

    pub fn token_ttl(&self) -> time::Duration {
        time::Duration::minutes(self.auth.access_token_expire_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL used in links and `fullUrl`s.
    /// If not set, defaults to http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Which writes verify that the resources they reference exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferentialIntegrity {
    /// Observation create/update only.
    #[default]
    ObservationOnly,
    /// Encounter writes also check their subject.
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirSettings {
    #[serde(default = "default_fhir_version")]
    pub version: String,
    #[serde(default = "default_publisher")]
    pub publisher: String,
    #[serde(default)]
    pub on_malformed_reference: MalformedReferencePolicy,
    #[serde(default)]
    pub referential_integrity: ReferentialIntegrity,
}

fn default_fhir_version() -> String {
    "R4".into()
}
fn default_publisher() -> String {
    "FHIR Lite Server".into()
}

impl Default for FhirSettings {
    fn default() -> Self {
        Self {
            version: default_fhir_version(),
            publisher: default_publisher(),
            on_malformed_reference: MalformedReferencePolicy::default(),
            referential_integrity: ReferentialIntegrity::default(),
        }
    }
}

impl FhirSettings {
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            on_malformed_reference: self.on_malformed_reference,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC key for bearer tokens; required.
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub algorithm: JwtAlgorithm,
    #[serde(default = "default_token_minutes")]
    pub access_token_expire_minutes: i64,
}

fn default_token_minutes() -> i64 {
    30
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            algorithm: JwtAlgorithm::default(),
            access_token_expire_minutes: default_token_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any.
    #[serde(default)]
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// A user account created at startup unless the email is already taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub email: String,
    /// Plain text; hashed before storage.
    pub password: String,
    pub role: Role,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("fhirlite.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., FHIRLITE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("FHIRLITE")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.origins"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
