//! Process-local [`UserRepository`] for development runs without PostgreSQL
//! and for tests.
//!
//! Mirrors the storage constraints of the Diesel adapter: unique external
//! ids, unique usernames, profile removed with its user.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{UserListing, UserPersistenceError, UserRepository};
use crate::domain::{ExternalId, IdentitySnapshot, Profile, User, UserId};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    profiles: HashMap<UserId, Profile>,
}

impl Tables {
    fn by_external_id(&self, external_id: &ExternalId) -> Option<&User> {
        self.users
            .values()
            .find(|user| user.external_id() == external_id)
    }

    fn username_taken_by_other(&self, user: &User) -> bool {
        self.users
            .values()
            .any(|other| other.username() == user.username() && other.id() != user.id())
    }
}

/// In-memory user store guarded by a single lock.
#[derive(Default)]
pub struct InMemoryUserRepository {
    tables: Mutex<Tables>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile stored for `user_id`, if any.
    pub fn profile(&self, user_id: &UserId) -> Result<Option<Profile>, UserPersistenceError> {
        Ok(self.lock()?.profiles.get(user_id).cloned())
    }

    pub fn len(&self) -> Result<usize, UserPersistenceError> {
        Ok(self.lock()?.users.len())
    }

    pub fn is_empty(&self) -> Result<bool, UserPersistenceError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, UserPersistenceError> {
        self.tables
            .lock()
            .map_err(|_| UserPersistenceError::query("in-memory user store lock poisoned"))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.lock()?.by_external_id(external_id).cloned())
    }

    async fn create_with_profile(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<(), UserPersistenceError> {
        let mut tables = self.lock()?;
        if tables.by_external_id(user.external_id()).is_some() {
            return Err(UserPersistenceError::duplicate_external_id(
                user.external_id().as_str(),
            ));
        }
        if tables.username_taken_by_other(user) {
            return Err(UserPersistenceError::duplicate_username(
                user.username().as_str(),
            ));
        }
        if tables.users.contains_key(user.id()) || profile.user_id != *user.id() {
            return Err(UserPersistenceError::query(
                "user id already stored or profile owner mismatch",
            ));
        }
        tables.users.insert(*user.id(), user.clone());
        tables.profiles.insert(*user.id(), profile.clone());
        Ok(())
    }

    async fn update_mirrored_fields(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut tables = self.lock()?;
        let Some(current) = tables.by_external_id(&snapshot.external_id) else {
            return Ok(None);
        };
        let updated = User::new(
            *current.id(),
            current.external_id().clone(),
            snapshot.username.clone(),
            snapshot.image_url.clone(),
        );
        if tables.username_taken_by_other(&updated) {
            return Err(UserPersistenceError::duplicate_username(
                snapshot.username.as_str(),
            ));
        }
        tables.users.insert(*updated.id(), updated.clone());
        Ok(Some(updated))
    }

    async fn delete_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<bool, UserPersistenceError> {
        let mut tables = self.lock()?;
        let Some(id) = tables.by_external_id(external_id).map(|user| *user.id()) else {
            return Ok(false);
        };
        tables.users.remove(&id);
        tables.profiles.remove(&id);
        Ok(true)
    }

    async fn list(&self, offset: u64, limit: u32) -> Result<UserListing, UserPersistenceError> {
        let tables = self.lock()?;
        let mut users: Vec<&User> = tables.users.values().collect();
        users.sort_by(|a, b| {
            a.username()
                .as_str()
                .cmp(b.username().as_str())
                .then_with(|| a.id().as_uuid().cmp(b.id().as_uuid()))
        });
        let total = users.len() as u64;
        let window = users
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(UserListing {
            users: window,
            total,
        })
    }
}
