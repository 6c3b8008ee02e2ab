//! Onboarding orchestration for a freshly authenticated principal.
//!
//! The local create is committed before any write to the identity provider.
//! Local state is authoritative: a failed write-back is retried and logged but
//! never undoes the local user, and the next attempt resolves through
//! [`IdentitySyncError::AlreadyLinked`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::ports::{
    IdentityProvider, IdentityProviderError, IdentitySync, IdentitySyncError, OnboardingError,
    UserOnboarding,
};
use crate::domain::{Error, Principal, User};

/// Retry schedule for the identity provider write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBackPolicy {
    attempts: u32,
    backoff: Duration,
}

impl WriteBackPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

    /// Build a policy; `attempts` is raised to at least one. The delay before
    /// retry `n` is `backoff * n`.
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for WriteBackPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_BACKOFF)
    }
}

/// Onboarding service combining the identity provider and the sync engine.
#[derive(Clone)]
pub struct OnboardingService<I, S> {
    idp: Arc<I>,
    sync: Arc<S>,
    write_back: WriteBackPolicy,
}

impl<I, S> OnboardingService<I, S> {
    pub fn new(idp: Arc<I>, sync: Arc<S>) -> Self {
        Self {
            idp,
            sync,
            write_back: WriteBackPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_write_back_policy(mut self, policy: WriteBackPolicy) -> Self {
        self.write_back = policy;
        self
    }
}

impl<I, S> OnboardingService<I, S>
where
    I: IdentityProvider,
    S: IdentitySync,
{
    async fn create_or_link(&self, principal: &Principal) -> Result<User, OnboardingError> {
        let external_id = &principal.external_id;
        let idp_user = self.idp.fetch_user(external_id).await.map_err(|source| {
            error!(%external_id, error = %source, "failed to fetch identity provider user");
            OnboardingError::from(source)
        })?;

        match self.sync.sync_from_onboarding(&idp_user.identity).await {
            Ok(user) => Ok(user),
            Err(IdentitySyncError::AlreadyLinked { .. }) => {
                info!(%external_id, "user already linked; returning existing record");
                self.sync
                    .find_linked(external_id)
                    .await?
                    .ok_or_else(|| OnboardingError::LinkedUserMissing {
                        external_id: external_id.clone(),
                    })
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn write_back_once(&self, user: &User) -> Result<(), IdentityProviderError> {
        self.idp
            .set_external_link(user.external_id(), user.id())
            .await?;
        self.idp.mark_onboarding_complete(user.external_id()).await
    }

    /// Write the link and onboarding flag to the identity provider.
    ///
    /// Returns whether the write-back eventually succeeded.
    async fn write_back(&self, user: &User) -> bool {
        let attempts = self.write_back.attempts();
        for attempt in 1..=attempts {
            match self.write_back_once(user).await {
                Ok(()) => return true,
                Err(err) if attempt < attempts => {
                    warn!(
                        external_id = %user.external_id(),
                        attempt,
                        error = %err,
                        "identity provider write-back failed; retrying"
                    );
                    tokio::time::sleep(self.write_back.backoff() * attempt).await;
                }
                Err(err) => {
                    error!(
                        external_id = %user.external_id(),
                        user_id = %user.id(),
                        attempts,
                        error = %err,
                        "identity provider write-back exhausted; local user kept"
                    );
                }
            }
        }
        false
    }
}

#[async_trait]
impl<I, S> UserOnboarding for OnboardingService<I, S>
where
    I: IdentityProvider,
    S: IdentitySync,
{
    async fn onboard(&self, principal: &Principal) -> Result<User, OnboardingError> {
        if principal.onboarding_complete {
            return Err(OnboardingError::OnboardingAlreadyComplete {
                external_id: principal.external_id.clone(),
            });
        }

        let user = self.create_or_link(principal).await?;
        if self.write_back(&user).await {
            info!(external_id = %user.external_id(), user_id = %user.id(), "onboarding complete");
        }
        Ok(user)
    }
}

impl From<OnboardingError> for Error {
    fn from(error: OnboardingError) -> Self {
        match error {
            OnboardingError::OnboardingAlreadyComplete { .. } => {
                Error::conflict("onboarding already completed")
            }
            OnboardingError::IdpCommunication { source } => {
                Error::internal(format!("identity provider communication failed: {source}"))
            }
            OnboardingError::Sync(inner) => inner.into(),
            OnboardingError::LinkedUserMissing { external_id } => {
                Error::internal(format!("linked user for {external_id} is missing"))
            }
        }
    }
}

#[cfg(test)]
#[path = "user_onboarding_tests.rs"]
mod tests;
