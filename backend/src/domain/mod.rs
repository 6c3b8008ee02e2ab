//! Domain primitives, services and ports for identity sync.
//!
//! Purpose: keep identity reconciliation independent of transport and
//! storage. Inbound adapters call the driving ports in [`ports`]; outbound
//! adapters implement the driven ones.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable identifiers.
//! - User, ExternalId, Username, IdentitySnapshot, Profile, Principal,
//!   OnboardedPrincipal.
//! - SignatureVerifier: webhook authenticity checks.
//! - WebhookEvent: typed webhook payloads.
//! - IdentitySyncService, OnboardingService, UsersQueryService,
//!   IdentityBackfill, OnboardingRevert.

pub mod error;
pub mod identity_backfill;
pub mod identity_sync;
pub mod onboarding_revert;
pub mod ports;
pub mod principal;
pub mod profile;
pub mod trace_id;
pub mod user;
pub mod user_onboarding;
pub mod users_query;
pub mod webhook_event;
pub mod webhook_signature;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identity_backfill::{BackfillReport, IdentityBackfill};
pub use self::identity_sync::IdentitySyncService;
pub use self::onboarding_revert::{OnboardingRevert, RevertReport};
pub use self::principal::{OnboardedPrincipal, OnboardingRequired, Principal};
pub use self::profile::Profile;
pub use self::trace_id::{RequestContext, TraceId};
pub use self::user::{ExternalId, IdentitySnapshot, User, UserId, UserValidationError, Username};
pub use self::user_onboarding::{OnboardingService, WriteBackPolicy};
pub use self::users_query::UsersQueryService;
pub use self::webhook_event::{WebhookEvent, WebhookEventType, WebhookParseError};
pub use self::webhook_signature::{
    DEFAULT_TOLERANCE, InvalidSigningSecret, SignatureFailure, SignatureInvalid,
    SignatureVerifier, WebhookDelivery, WebhookSigningSecret,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use echo_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
