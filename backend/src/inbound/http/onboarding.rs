//! Onboarding endpoint invoked by a client after its first sign-in.
//!
//! ```text
//! POST /api/v1/clerk/onboarding
//! Authorization: Bearer <session token>
//! ```

use actix_web::{HttpResponse, post, web};

use crate::domain::Principal;
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::ErrorResponseBody;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::UserResponse;

/// Create or link the local user for the authenticated principal.
///
/// Repeated calls before the client refreshes its token return the same
/// user.
#[utoipa::path(
    post,
    path = "/api/v1/clerk/onboarding",
    responses(
        (status = 201, description = "Local user created or already linked", body = UserResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponseBody),
        (status = 409, description = "Onboarding already completed", body = ErrorResponseBody),
        (status = 500, description = "Identity provider unreachable or internal failure", body = ErrorResponseBody)
    ),
    tags = ["onboarding"],
    operation_id = "onboardUser",
    security(("BearerToken" = []))
)]
#[post("/clerk/onboarding")]
pub async fn onboard(
    state: web::Data<HttpState>,
    principal: Principal,
) -> ApiResult<HttpResponse> {
    let user = state.onboarding.onboard(&principal).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}
