use thiserror::Error;

/// Core error types for resource decoding and validation
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    #[error("Resource type mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: String, found: String },

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid FHIR date/time: {0}")]
    InvalidDateTime(String),

    #[error("Malformed reference '{reference}': {reason}")]
    MalformedReference { reference: String, reason: String },

    #[error("Invalid resource data: {message}")]
    InvalidResource { message: String },

    #[error("Invalid search parameter '{name}': {message}")]
    InvalidSearchParameter { name: String, message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    #[must_use]
    pub fn unsupported_resource_type(resource_type: impl Into<String>) -> Self {
        Self::UnsupportedResourceType(resource_type.into())
    }

    #[must_use]
    pub fn kind_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::KindMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    #[must_use]
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    #[must_use]
    pub fn invalid_date_time(value: impl Into<String>) -> Self {
        Self::InvalidDateTime(value.into())
    }

    #[must_use]
    pub fn malformed_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_search_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSearchParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Every core error is caused by the caller's input except serialization failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::JsonError(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedResourceType(_) | Self::KindMismatch { .. } => {
                ErrorCategory::ResourceType
            }
            Self::InvalidId(_)
            | Self::InvalidDateTime(_)
            | Self::MalformedReference { .. }
            | Self::InvalidResource { .. }
            | Self::InvalidSearchParameter { .. } => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ResourceType,
    Validation,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceType => write!(f, "resource_type"),
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
