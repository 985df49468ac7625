//! # fhirlite-auth
//!
//! Authentication and authorization for the FHIR Lite server.
//!
//! This crate provides:
//! - the role/action authorization matrix ([`policy`])
//! - the user record and its store contract ([`user`])
//! - Argon2 password hashing ([`password`])
//! - HMAC-signed bearer tokens ([`token`])
//! - the axum bearer-token extractor and login flow ([`middleware`])

pub mod error;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod token;
pub mod user;

pub use error::{AuthError, ErrorCategory};
pub use middleware::{AuthState, BearerAuth};
pub use password::{hash_password, verify_password};
pub use policy::{Action, Role, allowed, authorize};
pub use token::{AccessToken, JwtAlgorithm, JwtError, JwtService, TokenClaims};
pub use user::{DynUserStore, User, UserProfile, UserStore};

/// Type alias for auth results.
pub type AuthResult<T> = Result<T, AuthError>;
