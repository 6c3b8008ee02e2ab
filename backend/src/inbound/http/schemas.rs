//! OpenAPI schema definitions for types that do not derive `ToSchema`.
//!
//! Domain types and the `pagination` crate stay free of utoipa. The wrappers
//! here mirror their serialised shape for documentation only.

use utoipa::ToSchema;

use crate::inbound::http::users::UserResponse;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Authentication failed or is missing.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The request conflicts with current state.
    #[schema(rename = "conflict")]
    Conflict,
    /// A dependency is temporarily unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for `pagination::Page<UserResponse>`.
#[derive(ToSchema)]
#[schema(as = UserPage)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct UserPageSchema {
    /// Link to the preceding window; null on the first page.
    #[schema(example = "https://api.example.test/api/v1/users?offset=0&limit=10")]
    previous: Option<String>,
    /// Link to the following window; null on the last page.
    #[schema(example = "https://api.example.test/api/v1/users?offset=20&limit=10")]
    next: Option<String>,
    #[schema(example = 10)]
    offset: u64,
    #[schema(example = 10)]
    limit: u32,
    #[schema(example = 25)]
    total: u64,
    items: Vec<UserResponse>,
}
