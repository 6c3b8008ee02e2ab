//! Typed identity provider webhook events.
//!
//! Payloads have a top-level `type` such as `user.created` and a `data`
//! object whose shape depends on it. The type is read first, then `data` is
//! decoded into the matching variant. Unknown fields are ignored everywhere so
//! provider-side schema additions do not break parsing.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{ExternalId, IdentitySnapshot, Username};

/// Failure to turn a raw body into a [`WebhookEvent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookParseError {
    /// The event type is outside the supported set.
    #[error("unsupported webhook event type: {event_type}")]
    UnsupportedEventType { event_type: String },
    /// The body is not JSON or lacks required fields.
    #[error("malformed webhook payload: {message}")]
    MalformedPayload { message: String },
}

impl WebhookParseError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }
}

/// Closed set of supported event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookEventType {
    UserCreated,
    UserUpdated,
    UserDeleted,
}

impl WebhookEventType {
    /// Resolve a raw type, replacing `.` with `_` and upper-casing first.
    ///
    /// # Examples
    /// ```
    /// use echo_backend::domain::WebhookEventType;
    ///
    /// assert_eq!(
    ///     WebhookEventType::normalize("user.created"),
    ///     WebhookEventType::normalize("USER_CREATED"),
    /// );
    /// assert!(WebhookEventType::normalize("user.archived").is_err());
    /// ```
    pub fn normalize(raw: &str) -> Result<Self, WebhookParseError> {
        match raw.trim().replace('.', "_").to_uppercase().as_str() {
            "USER_CREATED" => Ok(Self::UserCreated),
            "USER_UPDATED" => Ok(Self::UserUpdated),
            "USER_DELETED" => Ok(Self::UserDeleted),
            _ => Err(WebhookParseError::UnsupportedEventType {
                event_type: raw.to_owned(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserCreated => "USER_CREATED",
            Self::UserUpdated => "USER_UPDATED",
            Self::UserDeleted => "USER_DELETED",
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified, decoded webhook event. Consumed once per delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    UserCreated(IdentitySnapshot),
    UserUpdated(IdentitySnapshot),
    UserDeleted {
        external_id: ExternalId,
        deleted: bool,
    },
}

#[derive(Deserialize)]
struct EnvelopeDto {
    #[serde(rename = "type")]
    event_type: Option<String>,
    data: Option<Value>,
}

#[derive(Deserialize)]
struct UserDataDto {
    id: String,
    username: String,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct DeletedDataDto {
    id: String,
    deleted: bool,
}

impl WebhookEvent {
    /// Decode a raw webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookParseError> {
        let envelope: EnvelopeDto = serde_json::from_slice(body)
            .map_err(|err| WebhookParseError::malformed(format!("invalid JSON envelope: {err}")))?;
        let raw_type = envelope
            .event_type
            .ok_or_else(|| WebhookParseError::malformed("missing field `type`"))?;
        let event_type = WebhookEventType::normalize(&raw_type)?;
        let data = envelope
            .data
            .ok_or_else(|| WebhookParseError::malformed("missing field `data`"))?;

        match event_type {
            WebhookEventType::UserCreated => Ok(Self::UserCreated(parse_snapshot(data)?)),
            WebhookEventType::UserUpdated => Ok(Self::UserUpdated(parse_snapshot(data)?)),
            WebhookEventType::UserDeleted => {
                let dto: DeletedDataDto = decode_data(data)?;
                Ok(Self::UserDeleted {
                    external_id: parse_external_id(dto.id)?,
                    deleted: dto.deleted,
                })
            }
        }
    }

    pub fn event_type(&self) -> WebhookEventType {
        match self {
            Self::UserCreated(_) => WebhookEventType::UserCreated,
            Self::UserUpdated(_) => WebhookEventType::UserUpdated,
            Self::UserDeleted { .. } => WebhookEventType::UserDeleted,
        }
    }

    /// Subject of the event.
    pub fn external_id(&self) -> &ExternalId {
        match self {
            Self::UserCreated(snapshot) | Self::UserUpdated(snapshot) => &snapshot.external_id,
            Self::UserDeleted { external_id, .. } => external_id,
        }
    }
}

fn decode_data<T: for<'de> Deserialize<'de>>(data: Value) -> Result<T, WebhookParseError> {
    serde_json::from_value(data)
        .map_err(|err| WebhookParseError::malformed(format!("invalid `data`: {err}")))
}

fn parse_snapshot(data: Value) -> Result<IdentitySnapshot, WebhookParseError> {
    let dto: UserDataDto = decode_data(data)?;
    let external_id = parse_external_id(dto.id)?;
    let username = Username::new(dto.username)
        .map_err(|err| WebhookParseError::malformed(format!("invalid `data.username`: {err}")))?;
    let image_url = dto.image_url.and_then(|raw| parse_image_url(&external_id, &raw));
    Ok(IdentitySnapshot {
        external_id,
        username,
        image_url,
    })
}

fn parse_external_id(raw: String) -> Result<ExternalId, WebhookParseError> {
    ExternalId::new(raw)
        .map_err(|err| WebhookParseError::malformed(format!("invalid `data.id`: {err}")))
}

fn parse_image_url(external_id: &ExternalId, raw: &str) -> Option<Url> {
    if raw.trim().is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(error) => {
            debug!(%external_id, %error, "ignoring unparsable image url");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn parse(value: &Value) -> Result<WebhookEvent, WebhookParseError> {
        let body = serde_json::to_vec(value).expect("serialise fixture");
        WebhookEvent::parse(&body)
    }

    #[rstest]
    #[case("user.created", WebhookEventType::UserCreated)]
    #[case("USER_CREATED", WebhookEventType::UserCreated)]
    #[case("User.Updated", WebhookEventType::UserUpdated)]
    #[case("user_deleted", WebhookEventType::UserDeleted)]
    fn normalises_event_types(#[case] raw: &str, #[case] expected: WebhookEventType) {
        assert_eq!(WebhookEventType::normalize(raw), Ok(expected));
    }

    #[rstest]
    #[case("user.archived")]
    #[case("session.created")]
    #[case("")]
    fn rejects_unknown_event_types(#[case] raw: &str) {
        assert_eq!(
            WebhookEventType::normalize(raw),
            Err(WebhookParseError::UnsupportedEventType {
                event_type: raw.to_owned()
            })
        );
    }

    #[rstest]
    fn parses_created_event_ignoring_unknown_fields() {
        let event = parse(&json!({
            "object": "event",
            "type": "user.created",
            "data": {
                "id": "user_29w83sxmDNGwOuEthce5gg56FcC",
                "username": "ada",
                "image_url": "https://img.clerk.com/ada.png",
                "email_addresses": [{ "email_address": "ada@example.test" }],
                "public_metadata": {}
            }
        }))
        .expect("created event parses");

        let WebhookEvent::UserCreated(snapshot) = event else {
            panic!("expected a created event");
        };
        assert_eq!(snapshot.external_id.as_str(), "user_29w83sxmDNGwOuEthce5gg56FcC");
        assert_eq!(snapshot.username.as_str(), "ada");
        assert_eq!(
            snapshot.image_url.as_ref().map(Url::as_str),
            Some("https://img.clerk.com/ada.png")
        );
    }

    #[rstest]
    fn parses_updated_event_without_image() {
        let event = parse(&json!({
            "type": "USER_UPDATED",
            "data": { "id": "user_1", "username": "grace", "image_url": null }
        }))
        .expect("updated event parses");

        assert_eq!(event.event_type(), WebhookEventType::UserUpdated);
        assert_eq!(event.external_id().as_str(), "user_1");
        let WebhookEvent::UserUpdated(snapshot) = event else {
            panic!("expected an updated event");
        };
        assert!(snapshot.image_url.is_none());
    }

    #[rstest]
    fn parses_deleted_event() {
        let event = parse(&json!({
            "type": "user.deleted",
            "data": { "id": "user_1", "deleted": true, "object": "user" }
        }))
        .expect("deleted event parses");

        assert_eq!(
            event,
            WebhookEvent::UserDeleted {
                external_id: ExternalId::new("user_1").expect("valid id"),
                deleted: true,
            }
        );
    }

    #[rstest]
    fn invalid_image_url_is_dropped() {
        let event = parse(&json!({
            "type": "user.created",
            "data": { "id": "user_1", "username": "ada", "image_url": "not a url" }
        }))
        .expect("event still parses");

        let WebhookEvent::UserCreated(snapshot) = event else {
            panic!("expected a created event");
        };
        assert!(snapshot.image_url.is_none());
    }

    #[rstest]
    #[case::missing_username(json!({ "type": "user.created", "data": { "id": "user_1" } }))]
    #[case::blank_username(json!({ "type": "user.updated", "data": { "id": "user_1", "username": "  " } }))]
    #[case::missing_deleted_flag(json!({ "type": "user.deleted", "data": { "id": "user_1" } }))]
    #[case::missing_id(json!({ "type": "user.deleted", "data": { "deleted": true } }))]
    #[case::missing_data(json!({ "type": "user.created" }))]
    #[case::missing_type(json!({ "data": { "id": "user_1", "username": "ada" } }))]
    #[case::data_not_object(json!({ "type": "user.created", "data": "user_1" }))]
    fn rejects_malformed_payloads(#[case] payload: Value) {
        let error = parse(&payload).expect_err("payload is malformed");
        assert!(
            matches!(error, WebhookParseError::MalformedPayload { .. }),
            "expected MalformedPayload, got {error:?}"
        );
    }

    #[rstest]
    fn unsupported_type_wins_over_missing_data() {
        let error = parse(&json!({ "type": "user.archived" })).expect_err("unsupported");
        assert!(matches!(error, WebhookParseError::UnsupportedEventType { .. }));
    }

    #[rstest]
    fn rejects_non_json_bodies() {
        let error = WebhookEvent::parse(b"not json").expect_err("not JSON");
        assert!(matches!(error, WebhookParseError::MalformedPayload { .. }));
    }
}
