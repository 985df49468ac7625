//! Resource codec: canonical JSON document <-> typed entity with extracted fields.
//!
//! Decoding never fails on malformed content except for a `resourceType`
//! that does not match the expected kind (and, under
//! [`MalformedReferencePolicy::Reject`], an unresolvable reference).
//! Recognized elements that do not have the expected shape stay in the
//! document's residual map untouched and their extracted field is absent.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::fhir::ResourceKind;
use crate::id::ResourceId;
use crate::reference::{FhirReference, MalformedReferencePolicy};
use crate::search::SearchFilter;

/// Options that change how documents are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecOptions {
    #[serde(default)]
    pub on_malformed_reference: MalformedReferencePolicy,
}

/// A resource kind the server stores and indexes.
pub trait FhirResource: Clone + Debug + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Scalar fields derived from the document for indexed search.
    type Fields: Clone + Debug + PartialEq + Send + Sync;

    /// Search filter evaluated against stored entities.
    type Search: SearchFilter<Self>;

    /// Decode a canonical document, assigning `id` to it.
    fn decode(document: Value, id: ResourceId, options: &CodecOptions) -> Result<Self>;

    /// Produce the outbound document.
    ///
    /// A base is synthesized from the extracted fields and the canonical
    /// document is laid over it, so stored values win on conflict.
    fn encode(&self) -> Value;

    fn id(&self) -> &ResourceId;

    fn fields(&self) -> &Self::Fields;

    /// Local resources this one points at.
    fn references(&self) -> Vec<FhirReference>;
}

/// Check the kind tag and unwrap the document's top-level object.
///
/// `id` and `resourceType` are removed; the codec writes them back itself.
pub(crate) fn open_document(document: Value, expected: ResourceKind) -> Result<Map<String, Value>> {
    let Value::Object(mut map) = document else {
        return Err(CoreError::invalid_resource(format!(
            "{expected} document must be a JSON object"
        )));
    };
    match map.remove("resourceType") {
        Some(Value::String(found)) if found == expected.as_str() => {}
        Some(Value::String(found)) => return Err(CoreError::kind_mismatch(expected.as_str(), found)),
        Some(other) => {
            return Err(CoreError::kind_mismatch(expected.as_str(), other.to_string()));
        }
        None => return Err(CoreError::kind_mismatch(expected.as_str(), "<missing>")),
    }
    map.remove("id");
    Ok(map)
}

/// Take a recognized element out of `map` if it has the expected shape.
///
/// Elements that fail to deserialize stay in `map` so they are re-emitted
/// verbatim. JSON `null` is treated as absent and dropped, at this level and
/// for the typed members of the datatypes in [`crate::datatypes`]
/// (`"family": null` decodes to `None` and is not re-emitted). Nulls inside
/// untyped `extra` members are kept.
pub(crate) fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    match map.get(key) {
        None => return None,
        Some(Value::Null) => {
            map.remove(key);
            return None;
        }
        Some(_) => {}
    }
    let value = map.get(key).cloned()?;
    match serde_json::from_value(value) {
        Ok(parsed) => {
            map.remove(key);
            Some(parsed)
        }
        Err(err) => {
            tracing::debug!(element = key, error = %err, "keeping unrecognized element shape verbatim");
            None
        }
    }
}

/// Lay `document` over `base`; non-null document values replace base values.
pub(crate) fn overlay(base: Map<String, Value>, document: Value) -> Value {
    let mut merged = base;
    if let Value::Object(doc) = document {
        for (key, value) in doc {
            if !value.is_null() {
                merged.insert(key, value);
            }
        }
    }
    Value::Object(merged)
}

/// Serialize a value that cannot fail to serialize (plain data, string keys).
pub(crate) fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Declares a closed code vocabulary whose unrecognized codes decode to `Unknown`.
macro_rules! code_vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unknown,
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+ $name::Unknown];

            /// Permissive decode: anything outside the vocabulary is `Unknown`.
            pub fn from_code(code: &str) -> Self {
                match code {
                    $($code => $name::$variant,)+
                    _ => $name::Unknown,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                    $name::Unknown => "unknown",
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use code_vocabulary;
