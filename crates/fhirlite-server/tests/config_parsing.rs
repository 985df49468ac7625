use std::{env, fs};

use fhirlite_auth::Role;
use fhirlite_core::MalformedReferencePolicy;
use fhirlite_server::ReferentialIntegrity;
use fhirlite_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("fhirlite.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
base_url = "https://fhir.example.org/"

[fhir]
on_malformed_reference = "reject"
referential_integrity = "all"

[auth]
secret_key = "file-secret"
access_token_expire_minutes = 5

[logging]
level = "debug"

[[bootstrap.users]]
email = "admin@fhir.com"
password = "admin123"
role = "admin"

[[bootstrap.users]]
email = "readonly@fhir.com"
password = "readonly123"
role = "read_only"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.fhir_base_url(), "https://fhir.example.org/fhir");
    assert_eq!(cfg.fhir.on_malformed_reference, MalformedReferencePolicy::Reject);
    assert_eq!(cfg.fhir.referential_integrity, ReferentialIntegrity::All);
    assert_eq!(cfg.token_ttl(), time::Duration::minutes(5));
    assert_eq!(cfg.bootstrap.users.len(), 2);
    assert_eq!(cfg.bootstrap.users[1].role, Role::ReadOnly);

    // 2) Env overrides win over the file
    unsafe {
        env::set_var("FHIRLITE__SERVER__PORT", "9091");
        env::set_var("FHIRLITE__CORS__ORIGINS", "https://a.example,https://b.example");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.server.port, 9091);
    assert_eq!(
        cfg_env.cors.origins,
        vec!["https://a.example".to_string(), "https://b.example".to_string()]
    );
    unsafe {
        env::remove_var("FHIRLITE__SERVER__PORT");
        env::remove_var("FHIRLITE__CORS__ORIGINS");
    }

    // 3) A missing secret is a validation error
    let invalid_path = dir.path().join("invalid.toml");
    fs::write(&invalid_path, "[server]\nport = 8000\n").expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("secret_key"));

    // 4) An unknown role is rejected while deserializing
    let bad_role = dir.path().join("bad_role.toml");
    fs::write(
        &bad_role,
        "[auth]\nsecret_key = \"x\"\n\n[[bootstrap.users]]\nemail = \"a@b.c\"\npassword = \"p\"\nrole = \"superuser\"\n",
    )
    .expect("write toml");
    let err = load_config(bad_role.to_str()).expect_err("expected deserialize error");
    assert!(err.contains("deserialize"));
}
