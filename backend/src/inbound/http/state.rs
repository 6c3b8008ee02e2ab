//! Shared HTTP adapter state.
//!
//! Handlers receive this via `web::Data<HttpState>` and only depend on domain
//! ports, so tests can swap in mocks or in-memory implementations.

use std::sync::Arc;

use crate::domain::SignatureVerifier;
use crate::domain::ports::{IdentitySync, UserOnboarding, UsersQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub identity_sync: Arc<dyn IdentitySync>,
    pub onboarding: Arc<dyn UserOnboarding>,
    pub users: Arc<dyn UsersQuery>,
    pub webhook_verifier: Arc<SignatureVerifier>,
}

impl HttpState {
    pub fn new(
        identity_sync: Arc<dyn IdentitySync>,
        onboarding: Arc<dyn UserOnboarding>,
        users: Arc<dyn UsersQuery>,
        webhook_verifier: Arc<SignatureVerifier>,
    ) -> Self {
        Self {
            identity_sync,
            onboarding,
            users,
            webhook_verifier,
        }
    }
}
