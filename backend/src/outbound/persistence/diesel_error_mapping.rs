//! Diesel and pool failures translated into [`UserPersistenceError`].

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::UserPersistenceError;

use super::pool::PoolError;

pub(crate) const EXTERNAL_ID_CONSTRAINT: &str = "users_external_id_key";
pub(crate) const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Values a write attempted to store, reported back on unique violations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteKeys<'a> {
    pub external_id: &'a str,
    pub username: &'a str,
}

pub(crate) fn map_pool_error(error: PoolError) -> UserPersistenceError {
    UserPersistenceError::connection(error.into_message())
}

/// Map a failure from a statement that writes no unique columns.
pub(crate) fn map_diesel_error(error: DieselError) -> UserPersistenceError {
    log_diesel_error(&error);
    match error {
        DieselError::NotFound => UserPersistenceError::query("record not found"),
        DieselError::QueryBuilderError(_) => UserPersistenceError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UserPersistenceError::connection("database connection error")
        }
        _ => UserPersistenceError::query("database error"),
    }
}

/// Map a failure from an insert or update of `users`, recognising the two
/// unique constraints.
pub(crate) fn map_write_error(error: DieselError, keys: WriteKeys<'_>) -> UserPersistenceError {
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &error {
        match violated_constraint(info.as_ref()) {
            Some(EXTERNAL_ID_CONSTRAINT) => {
                return UserPersistenceError::duplicate_external_id(keys.external_id);
            }
            Some(USERNAME_CONSTRAINT) => {
                return UserPersistenceError::duplicate_username(keys.username);
            }
            _ => {}
        }
    }
    map_diesel_error(error)
}

/// Name of the violated constraint, from the driver metadata or, failing
/// that, the server message.
fn violated_constraint(info: &(dyn DatabaseErrorInformation + Send + Sync)) -> Option<&'static str> {
    let named = info.constraint_name();
    [EXTERNAL_ID_CONSTRAINT, USERNAME_CONSTRAINT]
        .into_iter()
        .find(|candidate| match named {
            Some(name) => name == *candidate,
            None => info.message().contains(candidate),
        })
}

fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => debug!(
            ?kind,
            message = info.message(),
            constraint = info.constraint_name(),
            "diesel operation failed"
        ),
        other => debug!(error = %other, "diesel operation failed"),
    }
}
