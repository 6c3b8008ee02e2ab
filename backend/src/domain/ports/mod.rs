//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod identity_provider;
mod identity_sync;
mod user_onboarding;
mod user_repository;
mod users_query;

#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{IdentityProvider, IdentityProviderError, IdpUser, IdpUserPage};
#[cfg(test)]
pub use identity_sync::MockIdentitySync;
pub use identity_sync::{IdentitySync, IdentitySyncError, SkipReason, SyncOutcome};
#[cfg(test)]
pub use user_onboarding::MockUserOnboarding;
pub use user_onboarding::{OnboardingError, UserOnboarding};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserListing, UserPersistenceError, UserRepository};
#[cfg(test)]
pub use users_query::MockUsersQuery;
pub use users_query::UsersQuery;
