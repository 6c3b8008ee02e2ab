//! Adapter and service wiring for [`HttpState`].

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use tracing::warn;

use echo_backend::domain::ports::UserRepository;
use echo_backend::domain::{
    IdentitySyncService, OnboardingService, SignatureVerifier, UsersQueryService,
};
use echo_backend::inbound::http::auth::BearerTokenVerifier;
use echo_backend::inbound::http::state::HttpState;
use echo_backend::outbound::clerk::ClerkHttpClient;
use echo_backend::outbound::memory::InMemoryUserRepository;
use echo_backend::outbound::persistence::DieselUserRepository;

use super::ServerConfig;

/// Shared application data handed to every worker.
#[derive(Clone)]
pub(crate) struct AppData {
    pub(crate) http_state: web::Data<HttpState>,
    pub(crate) bearer_verifier: web::Data<BearerTokenVerifier>,
}

fn wire<R>(
    repo: Arc<R>,
    idp: Arc<ClerkHttpClient>,
    webhook_verifier: Arc<SignatureVerifier>,
) -> HttpState
where
    R: UserRepository + 'static,
{
    let sync = Arc::new(IdentitySyncService::new(Arc::clone(&repo)));
    let onboarding = Arc::new(OnboardingService::new(idp, Arc::clone(&sync)));
    let users = Arc::new(UsersQueryService::new(repo));
    HttpState::new(sync, onboarding, users, webhook_verifier)
}

/// Build the handler state, choosing PostgreSQL when a pool is configured.
///
/// # Errors
/// Fails when the identity provider client or the token verifier cannot be
/// constructed.
pub(crate) fn build_app_data(config: &ServerConfig) -> std::io::Result<AppData> {
    let identity = &config.identity;
    let idp = Arc::new(
        ClerkHttpClient::new(
            identity.api_url.clone(),
            identity.secret_key.clone(),
            identity.http_timeout,
        )
        .map_err(|err| std::io::Error::other(format!("identity provider client: {err}")))?,
    );
    let webhook_verifier = Arc::new(SignatureVerifier::new(
        identity.webhook_secret.clone(),
        identity.webhook_tolerance,
        Arc::new(DefaultClock),
    ));
    let bearer_verifier = BearerTokenVerifier::rs256(&identity.jwt_public_key_pem)
        .map_err(|err| std::io::Error::other(format!("session token key: {err}")))?;

    let http_state = match &config.db_pool {
        Some(pool) => wire(
            Arc::new(DieselUserRepository::new(pool.clone())),
            idp,
            webhook_verifier,
        ),
        None => {
            warn!("no database configured; users are kept in process memory");
            wire(Arc::new(InMemoryUserRepository::new()), idp, webhook_verifier)
        }
    };

    Ok(AppData {
        http_state: web::Data::new(http_state),
        bearer_verifier: web::Data::new(bearer_verifier),
    })
}
