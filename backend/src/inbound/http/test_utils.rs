//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::test::TestRequest;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use mockable::DefaultClock;
use serde_json::json;

use crate::domain::ports::{MockIdentitySync, MockUserOnboarding, MockUsersQuery};
use crate::domain::{DEFAULT_TOLERANCE, SignatureVerifier, UserId, WebhookSigningSecret};

use super::auth::BearerTokenVerifier;
use super::state::HttpState;
use super::webhooks::{SVIX_ID_HEADER, SVIX_SIGNATURE_HEADER, SVIX_TIMESTAMP_HEADER};

pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
pub const TOKEN_SECRET: &[u8] = b"http-test-token-secret";

pub fn signing_secret() -> WebhookSigningSecret {
    WebhookSigningSecret::from_encoded(WEBHOOK_SECRET).expect("fixture secret decodes")
}

pub fn webhook_verifier() -> SignatureVerifier {
    SignatureVerifier::new(signing_secret(), DEFAULT_TOLERANCE, Arc::new(DefaultClock))
}

/// Mock-backed state; expectations must be set before calling.
pub fn state_with(
    sync: MockIdentitySync,
    onboarding: MockUserOnboarding,
    users: MockUsersQuery,
) -> HttpState {
    HttpState::new(
        Arc::new(sync),
        Arc::new(onboarding),
        Arc::new(users),
        Arc::new(webhook_verifier()),
    )
}

/// A webhook POST signed with [`WEBHOOK_SECRET`] at the current time.
pub fn signed_webhook(uri: &str, body: &str) -> TestRequest {
    let id = "msg_test_delivery";
    let timestamp = Utc::now().timestamp().to_string();
    let signature = signing_secret()
        .sign(id, &timestamp, body.as_bytes())
        .expect("fixture secret signs");
    TestRequest::post()
        .uri(uri)
        .insert_header((SVIX_ID_HEADER, id))
        .insert_header((SVIX_TIMESTAMP_HEADER, timestamp))
        .insert_header((SVIX_SIGNATURE_HEADER, signature))
        .set_payload(body.to_owned())
}

pub fn bearer_verifier() -> BearerTokenVerifier {
    BearerTokenVerifier::hs256(TOKEN_SECRET)
}

/// `Authorization` header value for a token issued to `external_id`.
///
/// `local_id` becomes the `echo_id` claim when present.
pub fn bearer_header(
    external_id: &str,
    onboarded: bool,
    local_id: Option<UserId>,
) -> (actix_web::http::header::HeaderName, String) {
    let mut claims = json!({
        "sub": external_id,
        "onboarded": onboarded,
        "exp": Utc::now().timestamp() + 600,
    });
    if let Some(id) = local_id {
        claims["echo_id"] = json!(id.to_string());
    }
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(TOKEN_SECRET))
        .expect("token encodes");
    (AUTHORIZATION, format!("Bearer {token}"))
}
