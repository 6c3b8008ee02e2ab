//! Identity sync engine.
//!
//! Reconciles identity provider state with local users. Every operation
//! re-reads current state and is safe whether it arrives first, duplicated,
//! or out of order relative to other events for the same subject. Writers for
//! one external id are serialised by the repository's unique constraint: the
//! loser of a concurrent create sees `DuplicateExternalId` and falls back to
//! update-or-noop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    IdentitySync, IdentitySyncError, SkipReason, SyncOutcome, UserPersistenceError,
    UserRepository,
};
use crate::domain::{Error, ExternalId, IdentitySnapshot, Profile, User, WebhookEvent};

/// Result of a create attempt that tolerates an existing user.
enum CreateAttempt {
    Created(User),
    Existing(User),
}

/// Identity sync service backed by a [`UserRepository`].
#[derive(Clone)]
pub struct IdentitySyncService<R> {
    repo: Arc<R>,
}

impl<R> IdentitySyncService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> IdentitySyncService<R>
where
    R: UserRepository,
{
    fn map_persistence_error(error: UserPersistenceError) -> IdentitySyncError {
        match error {
            UserPersistenceError::DuplicateUsername { username } => {
                IdentitySyncError::UsernameTaken { username }
            }
            other => IdentitySyncError::Storage {
                message: other.to_string(),
            },
        }
    }

    async fn find(&self, external_id: &ExternalId) -> Result<Option<User>, IdentitySyncError> {
        self.repo
            .find_by_external_id(external_id)
            .await
            .map_err(Self::map_persistence_error)
    }

    async fn create_or_existing(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<CreateAttempt, IdentitySyncError> {
        if let Some(existing) = self.find(&snapshot.external_id).await? {
            return Ok(CreateAttempt::Existing(existing));
        }

        let user = User::from_snapshot(snapshot);
        let profile = Profile::initial_for(&user);
        match self.repo.create_with_profile(&user, &profile).await {
            Ok(()) => {
                info!(external_id = %user.external_id(), user_id = %user.id(), "created local user");
                Ok(CreateAttempt::Created(user))
            }
            Err(UserPersistenceError::DuplicateExternalId { .. }) => {
                debug!(external_id = %snapshot.external_id, "lost create race; re-reading");
                self.find(&snapshot.external_id)
                    .await?
                    .map(CreateAttempt::Existing)
                    .ok_or_else(|| IdentitySyncError::Storage {
                        message: format!(
                            "external id {} conflicted but no user was found",
                            snapshot.external_id
                        ),
                    })
            }
            Err(other) => Err(Self::map_persistence_error(other)),
        }
    }

    async fn apply_created(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<SyncOutcome, IdentitySyncError> {
        match self.create_or_existing(snapshot).await? {
            CreateAttempt::Created(user) => Ok(SyncOutcome::Created(user)),
            CreateAttempt::Existing(_) => {
                debug!(external_id = %snapshot.external_id, "user already exists; create is a no-op");
                Ok(SyncOutcome::Skipped(SkipReason::AlreadyExists))
            }
        }
    }

    async fn update_existing(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<Option<User>, IdentitySyncError> {
        self.repo
            .update_mirrored_fields(snapshot)
            .await
            .map_err(Self::map_persistence_error)
    }

    async fn apply_updated(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<SyncOutcome, IdentitySyncError> {
        if let Some(user) = self.update_existing(snapshot).await? {
            info!(external_id = %snapshot.external_id, "refreshed mirrored identity fields");
            return Ok(SyncOutcome::Updated(user));
        }

        debug!(external_id = %snapshot.external_id, "update for unknown user; creating");
        match self.create_or_existing(snapshot).await? {
            CreateAttempt::Created(user) => Ok(SyncOutcome::Created(user)),
            // A concurrent create won; apply the update on top of it.
            CreateAttempt::Existing(_) => self
                .update_existing(snapshot)
                .await?
                .map(SyncOutcome::Updated)
                .ok_or_else(|| IdentitySyncError::Storage {
                    message: format!("user {} vanished during update", snapshot.external_id),
                }),
        }
    }

    async fn apply_deleted(
        &self,
        external_id: &ExternalId,
        deleted: bool,
    ) -> Result<SyncOutcome, IdentitySyncError> {
        if !deleted {
            warn!(%external_id, "delete event without deleted flag; ignoring");
            return Ok(SyncOutcome::Skipped(SkipReason::NotMarkedDeleted));
        }

        let removed = self
            .repo
            .delete_by_external_id(external_id)
            .await
            .map_err(Self::map_persistence_error)?;
        if removed {
            info!(%external_id, "deleted local user");
            Ok(SyncOutcome::Deleted)
        } else {
            debug!(%external_id, "delete for unknown user is a no-op");
            Ok(SyncOutcome::Skipped(SkipReason::NotFound))
        }
    }
}

#[async_trait]
impl<R> IdentitySync for IdentitySyncService<R>
where
    R: UserRepository,
{
    async fn sync_from_onboarding(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<User, IdentitySyncError> {
        match self.create_or_existing(snapshot).await? {
            CreateAttempt::Created(user) => Ok(user),
            CreateAttempt::Existing(_) => Err(IdentitySyncError::AlreadyLinked {
                external_id: snapshot.external_id.clone(),
            }),
        }
    }

    async fn apply_event(&self, event: WebhookEvent) -> Result<SyncOutcome, IdentitySyncError> {
        match event {
            WebhookEvent::UserCreated(snapshot) => self.apply_created(&snapshot).await,
            WebhookEvent::UserUpdated(snapshot) => self.apply_updated(&snapshot).await,
            WebhookEvent::UserDeleted {
                external_id,
                deleted,
            } => self.apply_deleted(&external_id, deleted).await,
        }
    }

    async fn find_linked(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, IdentitySyncError> {
        self.find(external_id).await
    }
}

impl From<IdentitySyncError> for Error {
    fn from(error: IdentitySyncError) -> Self {
        match error {
            IdentitySyncError::AlreadyLinked { external_id } => {
                Error::conflict(format!("external id {external_id} is already linked"))
            }
            IdentitySyncError::UsernameTaken { username } => {
                Error::conflict(format!("username {username} is already taken"))
            }
            IdentitySyncError::Storage { message } => {
                Error::internal(format!("identity storage failed: {message}"))
            }
        }
    }
}

#[cfg(test)]
#[path = "identity_sync_tests.rs"]
mod tests;
