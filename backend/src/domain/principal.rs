//! Authenticated caller identity as asserted by a verified bearer token.

use super::{ExternalId, UserId};

/// Verified principal passed explicitly into use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Identity provider subject.
    pub external_id: ExternalId,
    /// Local id claim, present once the identity provider record is linked.
    pub local_id: Option<UserId>,
    /// Whether the token claims onboarding already finished.
    pub onboarding_complete: bool,
}

impl Principal {
    /// Principal for a subject that has not been onboarded yet.
    pub fn pending(external_id: ExternalId) -> Self {
        Self {
            external_id,
            local_id: None,
            onboarding_complete: false,
        }
    }
}

/// Why a principal may not use routes reserved for onboarded users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingRequired {
    #[error("user has not completed onboarding")]
    NotOnboarded,
    #[error("token claim 'echo_id' is missing or malformed")]
    MissingLocalId,
}

/// Principal of a caller that finished onboarding and carries a local id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardedPrincipal {
    pub external_id: ExternalId,
    pub local_id: UserId,
}

impl TryFrom<Principal> for OnboardedPrincipal {
    type Error = OnboardingRequired;

    fn try_from(principal: Principal) -> Result<Self, Self::Error> {
        if !principal.onboarding_complete {
            return Err(OnboardingRequired::NotOnboarded);
        }
        let local_id = principal
            .local_id
            .ok_or(OnboardingRequired::MissingLocalId)?;
        Ok(Self {
            external_id: principal.external_id,
            local_id,
        })
    }
}
