//! Driving port reconciling identity provider state with local users.

use async_trait::async_trait;

use crate::domain::{ExternalId, IdentitySnapshot, User, WebhookEvent};

/// Failures raised by the identity sync engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentitySyncError {
    /// The external id already has a local user.
    #[error("external id {external_id} is already linked to a local user")]
    AlreadyLinked { external_id: ExternalId },
    /// The mirrored username collides with a different local user.
    #[error("username {username} is already taken by another user")]
    UsernameTaken { username: String },
    /// Storage was unavailable or failed.
    #[error("identity storage failed: {message}")]
    Storage { message: String },
}

/// Why an event produced no change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A create arrived for a user that already exists.
    AlreadyExists,
    /// A delete arrived for a user that does not exist.
    NotFound,
    /// A delete event did not carry `deleted: true`.
    NotMarkedDeleted,
}

/// Result of applying one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(User),
    Updated(User),
    Deleted,
    Skipped(SkipReason),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentitySync: Send + Sync {
    /// Create the user and profile for a first-time onboarding.
    ///
    /// Fails with [`IdentitySyncError::AlreadyLinked`] when the external id
    /// already has a local user.
    async fn sync_from_onboarding(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<User, IdentitySyncError>;

    /// Apply a webhook event idempotently.
    async fn apply_event(&self, event: WebhookEvent) -> Result<SyncOutcome, IdentitySyncError>;

    /// Read the user currently linked to `external_id`.
    async fn find_linked(&self, external_id: &ExternalId)
    -> Result<Option<User>, IdentitySyncError>;
}
