//! Identity provider webhook endpoint.
//!
//! ```text
//! POST /api/v1/clerk/webhook
//! svix-id: msg_...
//! svix-timestamp: 1700000000
//! svix-signature: v1,<base64> [v1,<base64> ...]
//! ```
//!
//! The body is read as raw bytes because the signature covers the exact
//! payload. Verification and parsing failures are rejected here and never
//! reach the sync engine.

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::SyncOutcome;
use crate::domain::{Error, WebhookDelivery, WebhookEvent, WebhookParseError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::ErrorResponseBody;
use crate::inbound::http::state::HttpState;

pub const SVIX_ID_HEADER: &str = "svix-id";
pub const SVIX_TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SVIX_SIGNATURE_HEADER: &str = "svix-signature";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|value| value.to_str().ok())
}

fn map_parse_error(error: WebhookParseError) -> Error {
    match error {
        WebhookParseError::UnsupportedEventType { event_type } => {
            Error::invalid_request(format!("unsupported webhook event type: {event_type}"))
                .with_details(json!({ "code": "unsupported_event_type", "eventType": event_type }))
        }
        WebhookParseError::MalformedPayload { message } => {
            Error::invalid_request("malformed webhook payload")
                .with_details(json!({ "code": "malformed_payload", "reason": message }))
        }
    }
}

/// Receive an identity provider webhook delivery.
#[utoipa::path(
    post,
    path = "/api/v1/clerk/webhook",
    request_body(content = String, content_type = "application/json", description = "Raw signed event payload"),
    params(
        ("svix-id" = String, Header, description = "Delivery identifier"),
        ("svix-timestamp" = String, Header, description = "Unix timestamp of the delivery"),
        ("svix-signature" = String, Header, description = "Space separated v1 signatures"),
    ),
    responses(
        (status = 204, description = "Event applied or ignored as a duplicate"),
        (status = 400, description = "Malformed or unsupported event", body = ErrorResponseBody),
        (status = 401, description = "Signature invalid", body = ErrorResponseBody),
        (status = 409, description = "Mirrored username collides with another user", body = ErrorResponseBody),
        (status = 500, description = "Internal server error", body = ErrorResponseBody)
    ),
    tags = ["webhooks"],
    operation_id = "receiveIdentityWebhook",
    security([])
)]
#[post("/clerk/webhook")]
pub async fn receive_webhook(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let delivery = WebhookDelivery {
        id: header(&req, SVIX_ID_HEADER),
        timestamp: header(&req, SVIX_TIMESTAMP_HEADER),
        signatures: header(&req, SVIX_SIGNATURE_HEADER),
        body: &body,
    };
    if let Err(invalid) = state.webhook_verifier.verify(&delivery) {
        warn!(
            delivery_id = delivery.id.unwrap_or_default(),
            reason = %invalid.reason(),
            "rejected webhook delivery"
        );
        return Err(Error::unauthorized(invalid.to_string()));
    }

    let event = WebhookEvent::parse(&body).map_err(|error| {
        warn!(delivery_id = delivery.id.unwrap_or_default(), %error, "unparsable webhook event");
        map_parse_error(error)
    })?;
    let event_type = event.event_type();
    let external_id = event.external_id().clone();

    let outcome = state.identity_sync.apply_event(event).await?;
    match outcome {
        SyncOutcome::Skipped(reason) => {
            info!(%event_type, %external_id, ?reason, "webhook event skipped");
        }
        _ => info!(%event_type, %external_id, "webhook event applied"),
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
