use async_trait::async_trait;
use fhirlite_auth::{AuthError, AuthResult, User, UserStore};
use papaya::HashMap as PapayaHashMap;

/// User accounts keyed by email.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    by_email: PapayaHashMap<String, User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.by_email.pin().get(email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        Ok(self
            .by_email
            .pin()
            .values()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn create(&self, user: User) -> AuthResult<User> {
        let guard = self.by_email.pin();
        match guard.try_insert(user.email.clone(), user) {
            Ok(inserted) => {
                tracing::debug!(user = %inserted.email, role = %inserted.role, "user created");
                Ok(inserted.clone())
            }
            Err(rejected) => Err(AuthError::storage(format!(
                "User {} already exists",
                rejected.not_inserted.email
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirlite_auth::Role;

    #[tokio::test]
    async fn create_and_find() {
        let store = InMemoryUserStore::new();
        let user = store
            .create(User::new("admin@fhir.com", "h", Role::Admin))
            .await
            .unwrap();

        let by_email = store.find_by_email("admin@fhir.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_id = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "admin@fhir.com");
        assert!(store.find_by_email("other@fhir.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store
            .create(User::new("admin@fhir.com", "h", Role::Admin))
            .await
            .unwrap();
        let err = store
            .create(User::new("admin@fhir.com", "h2", Role::ReadOnly))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Storage { .. }));
    }
}
