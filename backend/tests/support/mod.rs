//! Shared harness for the end-to-end HTTP suites.
//!
//! Wires the real domain services over the in-memory repository and the
//! stub identity provider, signs webhooks with a fixed secret and issues
//! RS256 session tokens from the fixture key pair.

#![allow(dead_code, reason = "each suite uses a different subset")]

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::{AUTHORIZATION, HeaderName};
use actix_web::test::TestRequest;
use actix_web::{App, web};
use chrono::Utc;
use echo_backend::Trace;
use echo_backend::domain::{
    DEFAULT_TOLERANCE, ExternalId, IdentitySnapshot, IdentitySyncService, OnboardingService,
    SignatureVerifier, UserId, Username, UsersQueryService, WebhookSigningSecret, WriteBackPolicy,
};
use echo_backend::inbound::http::auth::BearerTokenVerifier;
use echo_backend::inbound::http::health::{HealthState, live, ready};
use echo_backend::inbound::http::onboarding::onboard;
use echo_backend::inbound::http::state::HttpState;
use echo_backend::inbound::http::users::list_users;
use echo_backend::inbound::http::webhooks::{
    SVIX_ID_HEADER, SVIX_SIGNATURE_HEADER, SVIX_TIMESTAMP_HEADER, receive_webhook,
};
use echo_backend::test_support::{InMemoryUserRepository, StubIdentityProvider};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use mockable::DefaultClock;
use serde_json::{Value, json};

pub const WEBHOOK_URI: &str = "/api/v1/clerk/webhook";
pub const ONBOARDING_URI: &str = "/api/v1/clerk/onboarding";
pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

const JWT_PUBLIC_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/jwt_rs256_public.pem"
));
const JWT_PRIVATE_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/jwt_rs256_private.pem"
));

pub fn snapshot(external_id: &str, username: &str) -> IdentitySnapshot {
    IdentitySnapshot {
        external_id: ExternalId::new(external_id).expect("valid external id"),
        username: Username::new(username).expect("valid username"),
        image_url: None,
    }
}

/// Real services over in-memory adapters.
pub struct Harness {
    pub repo: Arc<InMemoryUserRepository>,
    pub idp: Arc<StubIdentityProvider>,
    state: HttpState,
    verifier: web::Data<BearerTokenVerifier>,
}

impl Harness {
    pub fn new(idp: StubIdentityProvider) -> Self {
        let repo = Arc::new(InMemoryUserRepository::new());
        let idp = Arc::new(idp);
        let sync = Arc::new(IdentitySyncService::new(Arc::clone(&repo)));
        let onboarding = Arc::new(
            OnboardingService::new(Arc::clone(&idp), Arc::clone(&sync))
                .with_write_back_policy(WriteBackPolicy::new(2, Duration::ZERO)),
        );
        let users = Arc::new(UsersQueryService::new(Arc::clone(&repo)));
        let secret = WebhookSigningSecret::from_encoded(WEBHOOK_SECRET).expect("fixture secret");
        let webhook_verifier = Arc::new(SignatureVerifier::new(
            secret,
            DEFAULT_TOLERANCE,
            Arc::new(DefaultClock),
        ));
        let verifier = BearerTokenVerifier::rs256(JWT_PUBLIC_PEM).expect("fixture public key");
        Self {
            repo,
            idp,
            state: HttpState::new(sync, onboarding, users, webhook_verifier),
            verifier: web::Data::new(verifier),
        }
    }

    /// Application with the same routes and middleware as the server binary.
    pub fn app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        let health = web::Data::new(HealthState::new());
        health.mark_ready();
        App::new()
            .app_data(health)
            .app_data(web::Data::new(self.state.clone()))
            .app_data(self.verifier.clone())
            .wrap(Trace)
            .service(
                web::scope("/api/v1")
                    .service(receive_webhook)
                    .service(onboard)
                    .service(list_users),
            )
            .service(ready)
            .service(live)
    }
}

/// A webhook POST signed at the current time.
pub fn signed_webhook(delivery_id: &str, event: &Value) -> TestRequest {
    let body = serde_json::to_string(event).expect("event serialises");
    let timestamp = Utc::now().timestamp().to_string();
    let signature = WebhookSigningSecret::from_encoded(WEBHOOK_SECRET)
        .expect("fixture secret")
        .sign(delivery_id, &timestamp, body.as_bytes())
        .expect("fixture secret signs");
    TestRequest::post()
        .uri(WEBHOOK_URI)
        .insert_header((SVIX_ID_HEADER, delivery_id))
        .insert_header((SVIX_TIMESTAMP_HEADER, timestamp))
        .insert_header((SVIX_SIGNATURE_HEADER, signature))
        .set_payload(body)
}

pub fn user_event(kind: &str, external_id: &str, username: &str) -> Value {
    json!({
        "type": kind,
        "object": "event",
        "data": {
            "id": external_id,
            "username": username,
            "image_url": format!("https://img.example.test/{username}.png"),
            "first_name": "Unused",
        },
    })
}

pub fn deleted_event(external_id: &str) -> Value {
    json!({
        "type": "user.deleted",
        "data": { "id": external_id, "deleted": true, "object": "user" },
    })
}

/// Claims carried by a session token issued by the identity provider.
pub struct TokenClaims<'a> {
    pub sub: &'a str,
    pub echo_id: Option<UserId>,
    pub onboarded: bool,
    pub expires_in: i64,
}

impl<'a> TokenClaims<'a> {
    pub fn fresh(sub: &'a str) -> Self {
        Self {
            sub,
            echo_id: None,
            onboarded: false,
            expires_in: 600,
        }
    }
}

pub fn bearer(claims: &TokenClaims<'_>) -> (HeaderName, String) {
    let mut body = json!({
        "sub": claims.sub,
        "onboarded": claims.onboarded,
        "exp": Utc::now().timestamp() + claims.expires_in,
    });
    if let Some(id) = claims.echo_id {
        body["echo_id"] = json!(id.to_string());
    }
    let key = EncodingKey::from_rsa_pem(JWT_PRIVATE_PEM.as_bytes()).expect("fixture private key");
    let token = encode(&Header::new(Algorithm::RS256), &body, &key).expect("token encodes");
    (AUTHORIZATION, format!("Bearer {token}"))
}
