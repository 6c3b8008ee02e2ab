//! Test doubles shared by unit tests and the `tests/` suites.
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::json;

use crate::domain::ports::{IdentityProvider, IdentityProviderError, IdpUser, IdpUserPage};
use crate::domain::{ExternalId, IdentitySnapshot, UserId};

pub use crate::outbound::memory::InMemoryUserRepository;

/// Provider-side account; `None` marks one that has no username.
type StubAccount = Option<IdpUser>;

#[derive(Default)]
struct ProviderState {
    accounts: BTreeMap<String, StubAccount>,
    links: Vec<(ExternalId, UserId)>,
    completed: Vec<ExternalId>,
    reverted: Vec<ExternalId>,
    write_back_failures: u32,
}

/// Identity provider double that records write-backs.
#[derive(Default)]
pub struct StubIdentityProvider {
    state: Mutex<ProviderState>,
}

impl StubIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider-side account.
    pub fn with_user(self, identity: IdentitySnapshot) -> Self {
        self.lock().accounts.insert(
            identity.external_id.as_str().to_owned(),
            Some(IdpUser {
                identity,
                public_metadata: json!({}),
            }),
        );
        self
    }

    /// Register a provider-side account that has no username.
    pub fn with_unmirrorable(self, external_id: ExternalId) -> Self {
        self.lock()
            .accounts
            .insert(external_id.as_str().to_owned(), None);
        self
    }

    /// Make the next `count` write-back calls fail with a transport error.
    pub fn fail_write_backs(&self, count: u32) {
        self.lock().write_back_failures = count;
    }

    /// `(external id, local id)` pairs stored via `set_external_link`.
    pub fn links(&self) -> Vec<(ExternalId, UserId)> {
        self.lock().links.clone()
    }

    /// External ids flagged as onboarded.
    pub fn completed(&self) -> Vec<ExternalId> {
        self.lock().completed.clone()
    }

    /// External ids whose onboarding write-back was reverted.
    pub fn reverted(&self) -> Vec<ExternalId> {
        self.lock().reverted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(state: &mut ProviderState) -> Result<(), IdentityProviderError> {
        if state.write_back_failures > 0 {
            state.write_back_failures -= 1;
            return Err(IdentityProviderError::transport("stubbed write-back failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn fetch_user(&self, external_id: &ExternalId) -> Result<IdpUser, IdentityProviderError> {
        match self.lock().accounts.get(external_id.as_str()) {
            Some(Some(user)) => Ok(user.clone()),
            Some(None) => Err(IdentityProviderError::decode(format!(
                "user {external_id} has no username"
            ))),
            None => Err(IdentityProviderError::not_found(external_id.as_str())),
        }
    }

    async fn set_external_link(
        &self,
        external_id: &ExternalId,
        local_id: &UserId,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.lock();
        Self::take_failure(&mut state)?;
        state.links.push((external_id.clone(), *local_id));
        Ok(())
    }

    async fn mark_onboarding_complete(
        &self,
        external_id: &ExternalId,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.lock();
        Self::take_failure(&mut state)?;
        if let Some(Some(user)) = state.accounts.get_mut(external_id.as_str()) {
            user.public_metadata = json!({"onboardingComplete": true});
        }
        state.completed.push(external_id.clone());
        Ok(())
    }

    async fn revert_onboarding(
        &self,
        external_id: &ExternalId,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.lock();
        let Some(account) = state.accounts.get_mut(external_id.as_str()) else {
            return Err(IdentityProviderError::not_found(external_id.as_str()));
        };
        if let Some(user) = account {
            user.public_metadata = json!({});
        }
        state.links.retain(|(linked, _)| linked != external_id);
        state.completed.retain(|done| done != external_id);
        state.reverted.push(external_id.clone());
        Ok(())
    }

    async fn list_users(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<IdpUserPage, IdentityProviderError> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let state = self.lock();
        let mut page = IdpUserPage::default();
        for (raw_id, account) in state.accounts.iter().skip(skip).take(limit as usize) {
            page.fetched += 1;
            match account {
                Some(user) => page.users.push(user.clone()),
                None => {
                    if let Ok(external_id) = ExternalId::new(raw_id.clone()) {
                        page.unmirrorable.push(external_id);
                    }
                }
            }
        }
        Ok(page)
    }
}
