//! Reqwest-backed Clerk client.
//!
//! Transport concerns only: authentication, timeouts, status mapping and
//! decoding into [`IdpUser`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use super::dto::{ClerkUserDto, ExternalLinkDto, MetadataPatchDto, OnboardingMetadataDto};
use crate::domain::ports::{IdentityProvider, IdentityProviderError, IdpUser, IdpUserPage};
use crate::domain::{ExternalId, UserId};

const USER_AGENT: &str = concat!("echo-backend/", env!("CARGO_PKG_VERSION"));

/// Client for the Clerk backend API, authenticated with the secret key.
pub struct ClerkHttpClient {
    client: Client,
    base_url: Url,
    secret_key: Zeroizing<String>,
}

impl ClerkHttpClient {
    /// Build a client whose requests give up after `timeout`.
    ///
    /// `base_url` is the versioned API root, e.g. `https://api.clerk.com/v1/`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        secret_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IdentityProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                IdentityProviderError::transport(format!(
                    "base url {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn patch_onboarding_flag(
        &self,
        external_id: &ExternalId,
        onboarding_complete: Option<bool>,
    ) -> Result<(), IdentityProviderError> {
        let url = self.endpoint(&["users", external_id.as_str(), "metadata"])?;
        let request = self.request(Method::PATCH, url).json(&MetadataPatchDto {
            public_metadata: OnboardingMetadataDto {
                onboarding_complete,
            },
        });
        self.send(request, Some(external_id)).await?;
        Ok(())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.secret_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Send and return the body of a successful response.
    async fn send(
        &self,
        request: RequestBuilder,
        subject: Option<&ExternalId>,
    ) -> Result<Vec<u8>, IdentityProviderError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?.to_vec();
        if status.is_success() {
            Ok(body)
        } else {
            Err(map_status_error(status, &body, subject))
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, IdentityProviderError> {
    serde_json::from_slice(body)
        .map_err(|err| IdentityProviderError::decode(format!("invalid Clerk JSON payload: {err}")))
}

#[async_trait]
impl IdentityProvider for ClerkHttpClient {
    async fn fetch_user(&self, external_id: &ExternalId) -> Result<IdpUser, IdentityProviderError> {
        let url = self.endpoint(&["users", external_id.as_str()])?;
        let body = self
            .send(self.request(Method::GET, url), Some(external_id))
            .await?;
        let dto: ClerkUserDto = decode(&body)?;
        dto.into_idp_user().map_err(IdentityProviderError::decode)
    }

    async fn set_external_link(
        &self,
        external_id: &ExternalId,
        local_id: &UserId,
    ) -> Result<(), IdentityProviderError> {
        let url = self.endpoint(&["users", external_id.as_str()])?;
        let local = local_id.to_string();
        let request = self
            .request(Method::PATCH, url)
            .json(&ExternalLinkDto { external_id: &local });
        self.send(request, Some(external_id)).await?;
        debug!(%external_id, local_id = %local, "stored external link");
        Ok(())
    }

    async fn mark_onboarding_complete(
        &self,
        external_id: &ExternalId,
    ) -> Result<(), IdentityProviderError> {
        self.patch_onboarding_flag(external_id, Some(true)).await
    }

    async fn revert_onboarding(
        &self,
        external_id: &ExternalId,
    ) -> Result<(), IdentityProviderError> {
        let url = self.endpoint(&["users", external_id.as_str()])?;
        let request = self
            .request(Method::PATCH, url)
            .json(&ExternalLinkDto { external_id: "" });
        self.send(request, Some(external_id)).await?;
        self.patch_onboarding_flag(external_id, None).await?;
        debug!(%external_id, "reverted onboarding write-back");
        Ok(())
    }

    async fn list_users(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<IdpUserPage, IdentityProviderError> {
        let mut url = self.endpoint(&["users"])?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("order_by", "created_at");
        let body = self.send(self.request(Method::GET, url), None).await?;
        let dtos: Vec<ClerkUserDto> = decode(&body)?;

        // One account without a username must not block the rest of the page.
        let mut page = IdpUserPage {
            fetched: u64::try_from(dtos.len()).unwrap_or(u64::MAX),
            ..IdpUserPage::default()
        };
        for dto in dtos {
            let raw_id = dto.id.clone();
            match dto.into_idp_user() {
                Ok(user) => page.users.push(user),
                Err(reason) => {
                    warn!(%reason, "skipping identity provider user");
                    if let Ok(external_id) = ExternalId::new(raw_id) {
                        page.unmirrorable.push(external_id);
                    }
                }
            }
        }
        Ok(page)
    }
}

fn map_transport_error(error: reqwest::Error) -> IdentityProviderError {
    if error.is_timeout() {
        IdentityProviderError::timeout(error.to_string())
    } else {
        IdentityProviderError::transport(error.to_string())
    }
}

fn map_status_error(
    status: StatusCode,
    body: &[u8],
    subject: Option<&ExternalId>,
) -> IdentityProviderError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };

    match (status, subject) {
        (StatusCode::NOT_FOUND, Some(external_id)) => {
            IdentityProviderError::not_found(external_id.as_str())
        }
        (StatusCode::TOO_MANY_REQUESTS, _) => IdentityProviderError::rate_limited(message),
        (StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT, _) => {
            IdentityProviderError::timeout(message)
        }
        _ if status.is_client_error() => IdentityProviderError::rejected(message),
        _ => IdentityProviderError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
#[path = "http_client_tests.rs"]
mod tests;
