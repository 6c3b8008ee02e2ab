//! Paged listing of local users.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::PageParams;

use crate::domain::Error;
use crate::domain::ports::{UserListing, UserPersistenceError, UserRepository, UsersQuery};

/// [`UsersQuery`] backed by a [`UserRepository`].
#[derive(Clone)]
pub struct UsersQueryService<R> {
    repo: Arc<R>,
}

impl<R> UsersQueryService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

fn map_persistence_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        other => Error::internal(format!("user repository error: {other}")),
    }
}

#[async_trait]
impl<R> UsersQuery for UsersQueryService<R>
where
    R: UserRepository,
{
    async fn list_users(&self, params: PageParams) -> Result<UserListing, Error> {
        self.repo
            .list(params.offset(), params.limit())
            .await
            .map_err(map_persistence_error)
    }
}
