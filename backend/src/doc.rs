//! OpenAPI document for the HTTP surface.
//!
//! Served by Swagger UI in debug builds and printed by the `openapi-dump`
//! binary.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::error::ErrorResponseBody;
use crate::inbound::http::schemas::{ErrorCodeSchema, UserPageSchema};
use crate::inbound::http::users::UserResponse;

/// Registers the identity provider session token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Session token issued by the identity provider."))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Echo identity sync API",
        description = "Identity provider webhooks, first-login onboarding and user listing."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::webhooks::receive_webhook,
        crate::inbound::http::onboarding::onboard,
        crate::inbound::http::users::list_users,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorResponseBody, ErrorCodeSchema, UserResponse, UserPageSchema)),
    tags(
        (name = "webhooks", description = "Signed identity provider events"),
        (name = "onboarding", description = "First sign-in account linking"),
        (name = "users", description = "Local user directory"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
