//! Authentication and authorization error types.

use std::fmt;

use axum::response::{IntoResponse, Response};
use fhirlite_api::ApiError;

/// Errors that can occur while authenticating a caller or authorizing an action.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password at login.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("User is inactive")]
    InactiveUser,

    /// The request lacks usable credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The bearer token is malformed, badly signed or names an unknown user.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// The bearer token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The authenticated user's role does not permit the action.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// The user store failed.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::InactiveUser
                | Self::Unauthorized { .. }
                | Self::InvalidToken { .. }
                | Self::TokenExpired
        )
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCredentials | Self::InactiveUser | Self::Unauthorized { .. } => {
                ErrorCategory::Authentication
            }
            Self::InvalidToken { .. } | Self::TokenExpired => ErrorCategory::Token,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of auth errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    Token,
    Infrastructure,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InactiveUser => {
                ApiError::unauthorized(err.to_string())
            }
            AuthError::Unauthorized { message } => ApiError::unauthorized(message),
            AuthError::InvalidToken { .. } => {
                ApiError::unauthorized("Could not validate credentials")
            }
            AuthError::TokenExpired => ApiError::unauthorized("Token has expired"),
            AuthError::Forbidden { message } => ApiError::forbidden(message),
            AuthError::Storage { message } | AuthError::Internal { message } => {
                ApiError::internal(message)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_authentication_error() {
            tracing::debug!(category = %self.category(), error = %self, "authentication rejected");
        }
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    #[test]
    fn authentication_failures_are_401_with_challenge() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::InactiveUser,
            AuthError::invalid_token("bad signature"),
            AuthError::TokenExpired,
            AuthError::unauthorized("Missing Authorization header"),
        ] {
            let resp = err.into_response();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
        }
    }

    #[test]
    fn messages_match_login_contract() {
        let api: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(api.diagnostics(), "Invalid credentials");
        let api: ApiError = AuthError::InactiveUser.into();
        assert_eq!(api.diagnostics(), "User is inactive");
        let api: ApiError = AuthError::invalid_token("whatever").into();
        assert_eq!(api.diagnostics(), "Could not validate credentials");
    }

    #[test]
    fn forbidden_maps_to_403() {
        let resp = AuthError::forbidden("Insufficient permissions").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(!resp.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn categories() {
        assert_eq!(AuthError::TokenExpired.category(), ErrorCategory::Token);
        assert_eq!(
            AuthError::forbidden("x").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
