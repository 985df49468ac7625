use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// FHIR release served by this system.
pub const FHIR_VERSION: &str = "4.0.1";

/// Resource kinds modeled by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Patient,
    Encounter,
    Observation,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Patient,
        ResourceKind::Encounter,
        ResourceKind::Observation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Encounter => "Encounter",
            ResourceKind::Observation => "Observation",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceKind::Patient),
            "Encounter" => Ok(ResourceKind::Encounter),
            "Observation" => Ok(ResourceKind::Observation),
            other => Err(CoreError::unsupported_resource_type(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_agree() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.to_string().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("patient".parse::<ResourceKind>().is_err());
        assert!(matches!(
            "Condition".parse::<ResourceKind>(),
            Err(CoreError::UnsupportedResourceType(t)) if t == "Condition"
        ));
    }

    #[test]
    fn test_serde_uses_type_name() {
        let json = serde_json::to_string(&ResourceKind::Observation).unwrap();
        assert_eq!(json, "\"Observation\"");
    }
}
