//! Bearer token authentication extractor and the login flow.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use fhirlite_auth::{AuthState, BearerAuth};
//!
//! async fn whoami(BearerAuth(user): BearerAuth) -> String {
//!     format!("Hello, {}!", user.email)
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::AuthResult;
use crate::error::AuthError;
use crate::password::verify_password;
use crate::token::{AccessToken, JwtService};
use crate::user::{DynUserStore, User};

/// State required for authentication.
///
/// Include it in the application state and expose it to [`BearerAuth`]
/// through `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtService>,
    pub users: DynUserStore,
}

impl AuthState {
    pub fn new(jwt: Arc<JwtService>, users: DynUserStore) -> Self {
        Self { jwt, users }
    }

    /// Exchange an email and password for a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<AccessToken> {
        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::info!(user = %email, "login with unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))?;
        match verified {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(user = %email, "login with wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::warn!(user = %email, error = %e, "stored password hash is unreadable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        if !user.is_active {
            tracing::info!(user = %email, "login by inactive user");
            return Err(AuthError::InactiveUser);
        }

        let token = self.jwt.issue(&user)?;
        tracing::info!(user = %user.email, role = %user.role, "user logged in");
        Ok(token)
    }

    /// Resolve a bearer token to the active user it was issued to.
    pub async fn authenticate(&self, token: &str) -> AuthResult<User> {
        let claims = self.jwt.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "failed to verify token");
            AuthError::from(e)
        })?;

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user = %claims.sub, "token subject no longer exists");
                AuthError::invalid_token("Unknown user")
            })?;

        if !user.is_active {
            tracing::warn!(user = %user.email, "inactive user presented a token");
            return Err(AuthError::InactiveUser);
        }
        Ok(user)
    }
}

/// Axum extractor yielding the authenticated, active [`User`].
///
/// # Errors
///
/// Rejects with `AuthError` (401 with an OperationOutcome) if the header is
/// missing or malformed, the token is invalid or expired, or the user is
/// unknown or inactive.
pub struct BearerAuth(pub User);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::unauthorized("Not authenticated"))?
            .to_str()
            .map_err(|_| AuthError::unauthorized("Could not validate credentials"))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthorized("Could not validate credentials"))?;

        let user = auth_state.authenticate(token).await?;
        tracing::debug!(user = %user.email, role = %user.role, "token validated");
        Ok(BearerAuth(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::hash_password;
    use crate::policy::Role;
    use crate::token::JwtAlgorithm;
    use crate::user::UserStore;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use std::sync::Mutex;
    use time::Duration;
    use tower::ServiceExt;

    #[derive(Default)]
    struct VecUserStore(Mutex<Vec<User>>);

    #[async_trait]
    impl UserStore for VecUserStore {
        async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
            Ok(self.0.lock().unwrap().iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
            Ok(self.0.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn create(&self, user: User) -> AuthResult<User> {
            self.0.lock().unwrap().push(user.clone());
            Ok(user)
        }
    }

    async fn state() -> AuthState {
        let users = Arc::new(VecUserStore::default());
        users
            .create(User::new(
                "clinician@fhir.com",
                hash_password("clinician123").unwrap(),
                Role::Clinician,
            ))
            .await
            .unwrap();
        users
            .create(
                User::new("gone@fhir.com", hash_password("gone123").unwrap(), Role::Admin)
                    .deactivated(),
            )
            .await
            .unwrap();
        let jwt = Arc::new(JwtService::new(
            "test-secret",
            JwtAlgorithm::HS256,
            Duration::minutes(30),
        ));
        AuthState::new(jwt, users)
    }

    #[tokio::test]
    async fn login_and_authenticate() {
        let state = state().await;
        let token = state.login("clinician@fhir.com", "clinician123").await.unwrap();
        let user = state.authenticate(&token.access_token).await.unwrap();
        assert_eq!(user.email, "clinician@fhir.com");
        assert_eq!(user.role, Role::Clinician);
    }

    #[tokio::test]
    async fn login_failures() {
        let state = state().await;
        assert!(matches!(
            state.login("clinician@fhir.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            state.login("nobody@fhir.com", "clinician123").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            state.login("gone@fhir.com", "gone123").await,
            Err(AuthError::InactiveUser)
        ));
    }

    #[tokio::test]
    async fn token_for_deactivated_user_is_rejected() {
        let state = state().await;
        let gone = state.users.find_by_email("gone@fhir.com").await.unwrap().unwrap();
        let token = state.jwt.issue(&gone).unwrap();
        assert!(matches!(
            state.authenticate(&token.access_token).await,
            Err(AuthError::InactiveUser)
        ));
    }

    #[tokio::test]
    async fn extractor_rejects_missing_and_bad_headers() {
        let state = state().await;
        let app = Router::new()
            .route("/me", get(|BearerAuth(user): BearerAuth| async move { user.email }))
            .with_state(state.clone());

        let resp = app
            .clone()
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .clone()
            .oneshot(
                Request::get("/me")
                    .header(AUTHORIZATION, "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let token = state.login("clinician@fhir.com", "clinician123").await.unwrap();
        let resp = app
            .oneshot(
                Request::get("/me")
                    .header(AUTHORIZATION, format!("Bearer {}", token.access_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
