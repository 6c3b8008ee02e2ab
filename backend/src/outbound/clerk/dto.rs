//! Wire shapes of the Clerk backend API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::domain::ports::IdpUser;
use crate::domain::{ExternalId, IdentitySnapshot, Username};

#[derive(Debug, Deserialize)]
pub(super) struct ClerkUserDto {
    pub(super) id: String,
    #[serde(default)]
    pub(super) username: Option<String>,
    #[serde(default)]
    pub(super) image_url: Option<String>,
    #[serde(default)]
    pub(super) public_metadata: Value,
}

impl ClerkUserDto {
    pub(super) fn into_idp_user(self) -> Result<IdpUser, String> {
        let external_id =
            ExternalId::new(self.id).map_err(|err| format!("invalid user id: {err}"))?;
        let raw_username = self
            .username
            .ok_or_else(|| format!("user {external_id} has no username"))?;
        let username = Username::new(raw_username)
            .map_err(|err| format!("user {external_id} has an invalid username: {err}"))?;
        let image_url = self
            .image_url
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| Url::parse(&raw).ok());
        Ok(IdpUser {
            identity: IdentitySnapshot {
                external_id,
                username,
                image_url,
            },
            public_metadata: self.public_metadata,
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ExternalLinkDto<'a> {
    pub(super) external_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct MetadataPatchDto {
    pub(super) public_metadata: OnboardingMetadataDto,
}

/// Clerk merges metadata patches; a `null` value removes the key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OnboardingMetadataDto {
    pub(super) onboarding_complete: Option<bool>,
}
