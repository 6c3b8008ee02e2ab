//! Driven port for the external identity provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ExternalId, IdentitySnapshot, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// Network or server-side failure.
        Transport { message: String } => "identity provider transport failed: {message}",
        /// The request exceeded its deadline.
        Timeout { message: String } => "identity provider request timed out: {message}",
        /// The provider throttled the request.
        RateLimited { message: String } => "identity provider rate limited the request: {message}",
        /// The provider has no such user.
        NotFound { external_id: String } => "identity provider has no user {external_id}",
        /// The provider refused the request.
        Rejected { message: String } => "identity provider rejected the request: {message}",
        /// The response did not match the expected shape.
        Decode { message: String } => "identity provider response could not be decoded: {message}",
    }
}

/// User record as held by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpUser {
    pub identity: IdentitySnapshot,
    pub public_metadata: Value,
}

/// One page of the provider's account listing.
///
/// `fetched` counts every record the provider returned, so callers can tell
/// an exhausted listing from a page whose accounts were all unusable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdpUserPage {
    /// Accounts that can be mirrored locally.
    pub users: Vec<IdpUser>,
    /// Accounts that cannot be mirrored, e.g. because they have no username.
    pub unmirrorable: Vec<ExternalId>,
    /// Raw number of records on the page.
    pub fetched: u64,
}

impl IdpUserPage {
    /// Page made only of mirrorable accounts.
    pub fn from_users(users: Vec<IdpUser>) -> Self {
        Self {
            fetched: u64::try_from(users.len()).unwrap_or(u64::MAX),
            users,
            unmirrorable: Vec::new(),
        }
    }

    /// True when the provider returned no records at all.
    pub fn is_exhausted(&self) -> bool {
        self.fetched == 0
    }

    /// Records on the page that are not in `users`.
    pub fn skipped(&self) -> u64 {
        let usable = u64::try_from(self.users.len()).unwrap_or(u64::MAX);
        self.fetched.saturating_sub(usable)
    }

    /// External ids of every identifiable account on the page.
    pub fn external_ids(&self) -> impl Iterator<Item = &ExternalId> {
        self.users
            .iter()
            .map(|user| &user.identity.external_id)
            .chain(self.unmirrorable.iter())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch the full provider-side record.
    async fn fetch_user(&self, external_id: &ExternalId) -> Result<IdpUser, IdentityProviderError>;

    /// Store the local id on the provider-side record.
    async fn set_external_link(
        &self,
        external_id: &ExternalId,
        local_id: &UserId,
    ) -> Result<(), IdentityProviderError>;

    /// Flag onboarding as complete in the provider's public metadata.
    async fn mark_onboarding_complete(
        &self,
        external_id: &ExternalId,
    ) -> Result<(), IdentityProviderError>;

    /// Undo the onboarding write-back: clear the stored local id and drop
    /// the onboarding flag from the public metadata.
    async fn revert_onboarding(
        &self,
        external_id: &ExternalId,
    ) -> Result<(), IdentityProviderError>;

    /// Page through provider-side users.
    async fn list_users(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<IdpUserPage, IdentityProviderError>;
}
