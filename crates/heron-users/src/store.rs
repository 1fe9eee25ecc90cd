//! In-memory user store.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use heron::core::{DataStore, StoreError, StoreResult, StoreState, User, UserKey};
use parking_lot::RwLock;
use tracing::info;

/// A [`DataStore`] over concurrent maps.
///
/// Users are keyed by uid; email and token each have a unique index. The
/// store starts [`StoreState::NotStarted`] and only serves the readiness
/// gate once [`connect`](Self::connect) ran.
#[derive(Debug)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    by_email: DashMap<String, String>,
    by_token: DashMap<String, String>,
    state: RwLock<StoreState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty, unconnected store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_email: DashMap::new(),
            by_token: DashMap::new(),
            state: RwLock::new(StoreState::NotStarted),
        }
    }

    /// Marks the store connected.
    pub fn connect(&self) {
        *self.state.write() = StoreState::Connecting;
        info!("connecting to user store");
        *self.state.write() = StoreState::Connected;
        info!("user store connected");
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no user is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn lookup(&self, key: UserKey<'_>) -> Option<User> {
        let uid = match key {
            UserKey::Id(uid) => uid.to_string(),
            UserKey::Email(email) => self.by_email.get(email)?.value().clone(),
            UserKey::Token(token) => self.by_token.get(token)?.value().clone(),
        };
        self.users.get(&uid).map(|u| u.value().clone())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn state(&self) -> StoreState {
        *self.state.read()
    }

    async fn find_user(&self, key: UserKey<'_>) -> StoreResult<Option<User>> {
        Ok(self.lookup(key))
    }

    async fn save_user(&self, user: User) -> StoreResult<()> {
        if self.users.contains_key(&user.uid) {
            return Err(StoreError::Conflict { key: user.uid });
        }
        if self.by_token.contains_key(&user.token) {
            return Err(StoreError::Conflict { key: "token".to_string() });
        }
        // The email index is the point of uniqueness for registrations.
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Conflict { key: user.email }),
            Entry::Vacant(slot) => {
                slot.insert(user.uid.clone());
            }
        }
        self.by_token.insert(user.token.clone(), user.uid.clone());
        self.users.insert(user.uid.clone(), user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> StoreResult<()> {
        let Some(mut existing) = self.users.get_mut(&user.uid) else {
            return Err(StoreError::Missing { key: user.uid });
        };
        if existing.email != user.email {
            self.by_email.remove(&existing.email);
            self.by_email.insert(user.email.clone(), user.uid.clone());
        }
        if existing.token != user.token {
            self.by_token.remove(&existing.token);
            self.by_token.insert(user.token.clone(), user.uid.clone());
        }
        *existing = user;
        Ok(())
    }
}
