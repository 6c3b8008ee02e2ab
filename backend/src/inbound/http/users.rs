//! Users API handlers.
//!
//! ```text
//! GET /api/v1/users?offset=0&limit=20
//! ```

use actix_web::{HttpRequest, get, web};
use pagination::{InvalidPageParameter, Page, PageParams};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::domain::{Error, OnboardedPrincipal, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::ErrorResponseBody;
use crate::inbound::http::schemas::UserPageSchema;
use crate::inbound::http::state::HttpState;

/// Public representation of a local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
    #[schema(example = "user_29w83sxmDNGwOuEthce5gg56FcC")]
    pub external_id: String,
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "https://img.clerk.com/ada.png")]
    pub image_url: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            external_id: user.external_id().to_string(),
            username: user.username().to_string(),
            image_url: user.image_url().map(|url| url.to_string()),
        }
    }
}

pub(crate) fn map_page_error(error: InvalidPageParameter) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "parameter": error.parameter(),
        "code": "invalid_page_parameter",
    }))
}

/// Absolute URL of the request, used as the base for page links.
pub(crate) fn request_url(req: &HttpRequest) -> Result<Url, Error> {
    let info = req.connection_info();
    let raw = format!("{}://{}{}", info.scheme(), info.host(), req.uri());
    Url::parse(&raw).map_err(|err| Error::internal(format!("unparsable request url {raw}: {err}")))
}

/// List local users ordered by username.
///
/// Only callers that finished onboarding may list users.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use echo_backend::inbound::http::users::list_users;
///
/// let app = App::new().service(list_users);
/// ```
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(
        ("offset" = Option<u64>, Query, description = "Zero-based index of the first item"),
        ("limit" = Option<u32>, Query, description = "Window size, 1 to 50 (default 20)"),
    ),
    responses(
        (status = 200, description = "One page of users", body = UserPageSchema),
        (status = 400, description = "Invalid page parameter", body = ErrorResponseBody),
        (status = 401, description = "Unauthorised", body = ErrorResponseBody),
        (status = 403, description = "Onboarding not completed", body = ErrorResponseBody),
        (status = 500, description = "Internal server error", body = ErrorResponseBody)
    ),
    tags = ["users"],
    operation_id = "listUsers",
    security(("BearerToken" = []))
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    _principal: OnboardedPrincipal,
    req: HttpRequest,
) -> ApiResult<web::Json<Page<UserResponse>>> {
    let params = PageParams::from_query(req.query_string()).map_err(map_page_error)?;
    let url = request_url(&req)?;
    let listing = state.users.list_users(params).await?;
    let items = listing.users.iter().map(UserResponse::from).collect();
    Ok(web::Json(Page::encode(params, listing.total, items, &url)))
}

#[cfg(test)]
mod tests;
