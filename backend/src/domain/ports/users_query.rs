//! Driving port for user-facing queries.
//!
//! Inbound adapters use this port to list users without importing outbound
//! persistence concerns.

use async_trait::async_trait;
use pagination::PageParams;

use crate::domain::Error;

use super::UserListing;

/// Domain use-case port for listing users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersQuery: Send + Sync {
    /// Return one window of users ordered by username, plus the total count.
    async fn list_users(&self, params: PageParams) -> Result<UserListing, Error>;
}
