//! Driving port for first-time onboarding of an authenticated principal.
//!
//! Inbound adapters resolve the principal from the bearer token and hand it
//! over; fetching the provider record, creating the local user, and writing
//! the link back all live behind this port.

use async_trait::async_trait;

use crate::domain::{ExternalId, Principal, User};

use super::{IdentityProviderError, IdentitySyncError};

/// Failures raised while onboarding a principal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    /// The principal's claims already mark onboarding as complete.
    #[error("onboarding already completed for {external_id}")]
    OnboardingAlreadyComplete { external_id: ExternalId },
    /// The identity provider could not be reached or refused the request.
    #[error("identity provider communication failed: {source}")]
    IdpCommunication {
        #[source]
        source: IdentityProviderError,
    },
    /// Local user creation failed.
    #[error(transparent)]
    Sync(#[from] IdentitySyncError),
    /// The external id was reported as linked but no local user was found.
    #[error("external id {external_id} is linked but its local user is missing")]
    LinkedUserMissing { external_id: ExternalId },
}

impl From<IdentityProviderError> for OnboardingError {
    fn from(source: IdentityProviderError) -> Self {
        Self::IdpCommunication { source }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserOnboarding: Send + Sync {
    /// Create (or return) the local user for the principal.
    async fn onboard(&self, principal: &Principal) -> Result<User, OnboardingError>;
}
