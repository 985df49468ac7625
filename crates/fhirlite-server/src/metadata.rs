use fhirlite_api::{CapabilityStatement, CapabilityStatementBuilder, SearchParam};
use fhirlite_core::{FHIR_VERSION, ResourceKind};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::AppConfig;

const INTERACTIONS: &[&str] = &["read", "update", "delete", "create", "search-type"];

fn search_params(kind: ResourceKind) -> Vec<SearchParam> {
    match kind {
        ResourceKind::Patient => vec![
            SearchParam::new("name", "string")
                .with_documentation("Case-insensitive match on family or given names"),
            SearchParam::new("identifier", "token"),
        ],
        ResourceKind::Encounter => vec![
            SearchParam::new("status", "token"),
            SearchParam::new("subject", "reference"),
            SearchParam::new("date", "date")
                .with_documentation("Period start on or after the given date"),
        ],
        ResourceKind::Observation => vec![
            SearchParam::new("code", "token"),
            SearchParam::new("subject", "reference"),
            SearchParam::new("encounter", "reference"),
            SearchParam::new("date", "date")
                .with_documentation("Effective time on or after the given date"),
        ],
    }
}

/// The CapabilityStatement served at `/fhir/metadata`, dated at startup.
pub fn capability_statement(cfg: &AppConfig) -> CapabilityStatement {
    let date = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    let mut builder = CapabilityStatementBuilder::new(FHIR_VERSION)
        .date(date)
        .publisher(cfg.fhir.publisher.clone())
        .software("FHIR Lite Server", env!("CARGO_PKG_VERSION"))
        .implementation("FHIR Lite REST endpoint", cfg.fhir_base_url());
    for kind in ResourceKind::ALL {
        builder = builder.add_resource(kind.as_str(), INTERACTIONS, search_params(kind));
    }
    builder
        .add_operation(
            "submit-bundle",
            format!("{}/OperationDefinition/submit-bundle", cfg.fhir_base_url()),
        )
        .build()
}
