//! Search filters.
//!
//! Each kind's filter is built from query parameters and evaluated as a pure
//! predicate over stored entities. Parameters combine with AND; an absent
//! parameter places no constraint. Unknown parameters are ignored.

use std::collections::HashMap;
use std::fmt::Debug;

use time::OffsetDateTime;

use crate::error::{CoreError, Result};
use crate::fhir::ResourceKind;
use crate::id::ResourceId;
use crate::temporal::parse_instant;

pub type SearchParams = HashMap<String, String>;

pub trait SearchFilter<R>: Debug + Default + Clone + Send + Sync {
    fn from_params(params: &SearchParams) -> Result<Self>;

    fn matches(&self, resource: &R) -> bool;
}

/// Non-empty, trimmed value of a string parameter.
pub(crate) fn string_param(params: &SearchParams, name: &str) -> Option<String> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Inclusive lower bound given as a date or date-time.
pub(crate) fn date_param(params: &SearchParams, name: &str) -> Result<Option<OffsetDateTime>> {
    string_param(params, name)
        .map(|raw| {
            parse_instant(&raw)
                .map_err(|_| CoreError::invalid_search_parameter(name, format!("invalid date '{raw}'")))
        })
        .transpose()
}

/// Reference parameter given as `Kind/id` or a bare id.
pub(crate) fn reference_param(
    params: &SearchParams,
    name: &str,
    kind: ResourceKind,
) -> Result<Option<ResourceId>> {
    let Some(raw) = string_param(params, name) else {
        return Ok(None);
    };
    let prefix = format!("{kind}/");
    let id = raw.strip_prefix(&prefix).unwrap_or(&raw);
    ResourceId::parse(id)
        .map(Some)
        .map_err(|_| CoreError::invalid_search_parameter(name, format!("invalid reference '{raw}'")))
}

/// Case-insensitive substring match.
pub(crate) fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}
