//! Test fixtures shared across Heron crates.
//!
//! ```
//! use heron_core::fixtures::{self, FixtureStore};
//!
//! let store = FixtureStore::with_users([fixtures::user("u-1", "ada@example.com", "t-1")]);
//! assert_eq!(store.len(), 1);
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::store::{DataStore, StoreError, StoreResult, StoreState, UserKey};
use crate::user::{RegisterType, User};

/// A Google-registered user whose name and username derive from the
/// email's local part.
#[must_use]
pub fn user(uid: &str, email: &str, token: &str) -> User {
    let local = email.split('@').next().unwrap_or(email);
    let now = Utc::now();
    User {
        uid: uid.to_string(),
        register_type: RegisterType::Google,
        register_date: now,
        last_login_date: now,
        email: email.to_string(),
        name: local.to_string(),
        username: local.to_string(),
        picture: None,
        social_medias: Vec::new(),
        token: token.to_string(),
    }
}

/// A [`DataStore`] over a plain vector, with a settable connection state,
/// a lookup counter and an outage switch for id lookups.
#[derive(Debug)]
pub struct FixtureStore {
    users: RwLock<Vec<User>>,
    state: RwLock<StoreState>,
    lookups: AtomicUsize,
    id_lookups_fail: AtomicBool,
}

impl Default for FixtureStore {
    fn default() -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            state: RwLock::new(StoreState::Connected),
            lookups: AtomicUsize::new(0),
            id_lookups_fail: AtomicBool::new(false),
        }
    }
}

impl FixtureStore {
    /// A connected, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A connected store holding `users`.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        store.users.write().extend(users);
        store
    }

    /// Overrides the reported connection state.
    pub fn set_state(&self, state: StoreState) {
        *self.state.write() = state;
    }

    /// Makes lookups by uid fail with [`StoreError::Unavailable`]. Token
    /// and email lookups keep working.
    pub fn fail_id_lookups(&self, fail: bool) {
        self.id_lookups_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of `find_user` calls so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns true if no user is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl DataStore for FixtureStore {
    fn state(&self) -> StoreState {
        *self.state.read()
    }

    async fn find_user(&self, key: UserKey<'_>) -> StoreResult<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if matches!(key, UserKey::Id(_)) && self.id_lookups_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        let users = self.users.read();
        let found = users.iter().find(|u| match key {
            UserKey::Id(id) => u.uid == id,
            UserKey::Token(token) => u.token == token,
            UserKey::Email(email) => u.email == email,
        });
        Ok(found.cloned())
    }

    async fn save_user(&self, user: User) -> StoreResult<()> {
        let mut users = self.users.write();
        if users.iter().any(|u| u.uid == user.uid || u.email == user.email) {
            return Err(StoreError::Conflict { key: user.uid });
        }
        users.push(user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> StoreResult<()> {
        let mut users = self.users.write();
        let slot = users
            .iter_mut()
            .find(|u| u.uid == user.uid)
            .ok_or_else(|| StoreError::Missing {
                key: user.uid.clone(),
            })?;
        *slot = user;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_by_each_key() {
        let store = FixtureStore::with_users([user("u-1", "ada@example.com", "t-1")]);
        assert!(store.find_user(UserKey::Id("u-1")).await.unwrap().is_some());
        assert!(store.find_user(UserKey::Token("t-1")).await.unwrap().is_some());
        assert!(store
            .find_user(UserKey::Email("ada@example.com"))
            .await
            .unwrap()
            .is_some());
        assert!(store.find_user(UserKey::Id("u-2")).await.unwrap().is_none());
        assert_eq!(store.lookups(), 4);
    }

    #[tokio::test]
    async fn test_save_rejects_duplicate_email() {
        let store = FixtureStore::with_users([user("u-1", "ada@example.com", "t-1")]);
        let err = store
            .save_user(user("u-2", "ada@example.com", "t-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = FixtureStore::new();
        let err = store.update_user(user("u-9", "x@y.z", "t")).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[tokio::test]
    async fn test_failing_id_lookups() {
        let store = FixtureStore::with_users([user("u-1", "ada@example.com", "t-1")]);
        store.fail_id_lookups(true);
        let err = store.find_user(UserKey::Id("u-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.find_user(UserKey::Token("t-1")).await.unwrap().is_some());

        store.fail_id_lookups(false);
        assert!(store.find_user(UserKey::Id("u-1")).await.unwrap().is_some());
    }

    #[test]
    fn test_state_override() {
        let store = FixtureStore::new();
        assert_eq!(store.state(), StoreState::Connected);
        store.set_state(StoreState::Connecting);
        assert_eq!(store.state(), StoreState::Connecting);
    }
}
