//! Registration logic.

use std::sync::Arc;

use chrono::Utc;
use heron::core::{
    DataStore, HeronResult, IdentityProfile, IdentityProvider, RegisterType, StoreError, User,
    UserKey,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::identity::local_part;

/// Whether a registration created the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationKind {
    /// A user was created.
    New,
    /// The email was already registered; its token is reused.
    Existing,
}

/// Body of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// Session token for `Authorization: Bearer`.
    pub token: String,
    /// New or existing account.
    #[serde(rename = "type")]
    pub kind: RegistrationKind,
}

/// The user service's collaborators.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn DataStore>,
    google: Arc<dyn IdentityProvider>,
    apple: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}

impl UserService {
    /// Wires the store and one provider per register type.
    #[must_use]
    pub fn new(
        store: Arc<dyn DataStore>,
        google: Arc<dyn IdentityProvider>,
        apple: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            google,
            apple,
        }
    }

    /// The data store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// The provider for `register_type`.
    #[must_use]
    pub fn provider(&self, register_type: RegisterType) -> &dyn IdentityProvider {
        match register_type {
            RegisterType::Google => self.google.as_ref(),
            RegisterType::Apple => self.apple.as_ref(),
        }
    }

    /// Creates the user for `profile` unless its email is known.
    ///
    /// A known email only refreshes `lastLoginDate`; the stored token is
    /// returned unchanged.
    pub async fn register(
        &self,
        register_type: RegisterType,
        profile: IdentityProfile,
    ) -> HeronResult<Registration> {
        if let Some(existing) = self.store.find_user(UserKey::Email(&profile.email)).await? {
            return self.log_in(existing).await;
        }

        let user = new_user(register_type, profile);
        let token = user.token.clone();
        match self.store.save_user(user.clone()).await {
            Ok(()) => {
                info!(uid = %user.uid, register_type = register_type.as_str(), "user registered");
                Ok(Registration {
                    token,
                    kind: RegistrationKind::New,
                })
            }
            // Lost a race with a concurrent registration of the same email.
            Err(StoreError::Conflict { .. }) => {
                match self.store.find_user(UserKey::Email(&user.email)).await? {
                    Some(existing) => self.log_in(existing).await,
                    None => Err(StoreError::Conflict { key: user.email }.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn log_in(&self, mut user: User) -> HeronResult<Registration> {
        user.last_login_date = Utc::now();
        let token = user.token.clone();
        debug!(uid = %user.uid, "existing user logged in");
        self.store.update_user(user).await?;
        Ok(Registration {
            token,
            kind: RegistrationKind::Existing,
        })
    }
}

fn new_user(register_type: RegisterType, profile: IdentityProfile) -> User {
    let now = Utc::now();
    User {
        uid: Uuid::new_v4().to_string(),
        register_type,
        register_date: now,
        last_login_date: now,
        username: local_part(&profile.email).to_string(),
        email: profile.email,
        name: profile.name,
        picture: profile.picture,
        social_medias: Vec::new(),
        token: Uuid::new_v4().simple().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AppleIdentity;
    use crate::store::MemoryStore;

    fn service() -> (Arc<MemoryStore>, UserService) {
        let store = Arc::new(MemoryStore::new());
        store.connect();
        let service = UserService::new(store.clone(), Arc::new(AppleIdentity), Arc::new(AppleIdentity));
        (store, service)
    }

    fn profile(email: &str) -> IdentityProfile {
        IdentityProfile {
            email: email.to_string(),
            name: "Ada".to_string(),
            picture: Some("https://example.com/ada.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_new_then_existing_keeps_token() {
        let (store, service) = service();
        let first = service
            .register(RegisterType::Google, profile("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(first.kind, RegistrationKind::New);

        let stored = store.find_user(UserKey::Token(&first.token)).await.unwrap().unwrap();
        assert_eq!(stored.username, "ada");
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.register_type, RegisterType::Google);

        let second = service
            .register(RegisterType::Google, profile("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(second.kind, RegistrationKind::Existing);
        assert_eq!(second.token, first.token);
        assert_eq!(store.len(), 1);

        let refreshed = store.find_user(UserKey::Id(&stored.uid)).await.unwrap().unwrap();
        assert!(refreshed.last_login_date >= stored.last_login_date);
        assert_eq!(refreshed.register_date, stored.register_date);
    }

    #[test]
    fn test_registration_wire_form() {
        let body = serde_json::to_value(Registration {
            token: "abc".to_string(),
            kind: RegistrationKind::New,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "token": "abc", "type": "new" }));
    }
}
