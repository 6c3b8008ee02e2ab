//! Driven port for local user and profile storage.
//!
//! Adapters must enforce uniqueness of `external_id` at the storage level and
//! report a losing concurrent create as
//! [`UserPersistenceError::DuplicateExternalId`]. That conflict is what
//! serialises writers for the same external id.

use async_trait::async_trait;

use crate::domain::{ExternalId, IdentitySnapshot, Profile, User};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another user already holds this external id.
        DuplicateExternalId { external_id: String } =>
            "a user is already linked to external id {external_id}",
        /// Another user already holds this username.
        DuplicateUsername { username: String } => "username {username} is already taken",
    }
}

/// One window of stored users plus the overall count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserListing {
    pub users: Vec<User>,
    pub total: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch the user linked to an identity provider account.
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Insert a user and its profile in one unit of work.
    ///
    /// Nothing is stored when either insert fails.
    async fn create_with_profile(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<(), UserPersistenceError>;

    /// Refresh username and image of the user linked to
    /// `snapshot.external_id`, returning `None` when no such user exists.
    ///
    /// Profile columns are left untouched.
    async fn update_mirrored_fields(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Remove the user (and, by cascade, its profile). Returns whether a row
    /// was deleted.
    async fn delete_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<bool, UserPersistenceError>;

    /// List users ordered by username.
    async fn list(&self, offset: u64, limit: u32) -> Result<UserListing, UserPersistenceError>;
}
