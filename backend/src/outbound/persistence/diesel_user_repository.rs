//! PostgreSQL-backed [`UserRepository`].

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::warn;
use url::Url;

use crate::domain::ports::{UserListing, UserPersistenceError, UserRepository};
use crate::domain::{ExternalId, IdentitySnapshot, Profile, User, UserId, Username};

use super::diesel_error_mapping::{WriteKeys, map_diesel_error, map_pool_error, map_write_error};
use super::models::{MirroredFieldsUpdate, NewProfileRow, NewUserRow, UserRow};
use super::pool::DbPool;
use super::schema::{profiles, users};

/// Diesel adapter storing users and their profiles.
///
/// The unique constraints on `users.external_id` and `users.username` are
/// what serialise concurrent creates for the same identity.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let external_id = ExternalId::new(row.external_id)
        .map_err(|err| UserPersistenceError::query(format!("stored external id: {err}")))?;
    let username = Username::new(row.username)
        .map_err(|err| UserPersistenceError::query(format!("stored username: {err}")))?;
    // A bad image url is dropped rather than hiding the whole account.
    let image_url = row.image_url.and_then(|raw| match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!(user_id = %row.id, error = %err, "ignoring unparsable stored image url");
            None
        }
    });
    Ok(User::new(
        UserId::from_uuid(row.id),
        external_id,
        username,
        image_url,
    ))
}

fn to_db_window(offset: u64, limit: u32) -> (i64, i64) {
    (
        i64::try_from(offset).unwrap_or(i64::MAX),
        i64::from(limit),
    )
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::external_id.eq(external_id.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }

    async fn create_with_profile(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<(), UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_user = NewUserRow {
            id: *user.id().as_uuid(),
            external_id: user.external_id().as_str(),
            username: user.username().as_str(),
            image_url: user.image_url().map(Url::as_str),
        };
        let new_profile = NewProfileRow {
            user_id: *profile.user_id.as_uuid(),
            display_name: &profile.display_name,
            bio: profile.bio.as_deref(),
            location: profile.location.as_deref(),
            avatar_url: profile.avatar_url.as_ref().map(Url::as_str),
        };

        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                diesel::insert_into(users::table)
                    .values(&new_user)
                    .execute(conn)
                    .await?;
                diesel::insert_into(profiles::table)
                    .values(&new_profile)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| {
            map_write_error(
                err,
                WriteKeys {
                    external_id: user.external_id().as_str(),
                    username: user.username().as_str(),
                },
            )
        })
    }

    async fn update_mirrored_fields(
        &self,
        snapshot: &IdentitySnapshot,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = MirroredFieldsUpdate {
            username: snapshot.username.as_str(),
            image_url: snapshot.image_url.as_ref().map(Url::as_str),
        };
        let row: Option<UserRow> =
            diesel::update(users::table.filter(users::external_id.eq(snapshot.external_id.as_str())))
                .set(&changes)
                .returning(UserRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(|err| {
                    map_write_error(
                        err,
                        WriteKeys {
                            external_id: snapshot.external_id.as_str(),
                            username: snapshot.username.as_str(),
                        },
                    )
                })?;
        row.map(row_to_user).transpose()
    }

    async fn delete_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(users::table.filter(users::external_id.eq(external_id.as_str())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }

    async fn list(&self, offset: u64, limit: u32) -> Result<UserListing, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (db_offset, db_limit) = to_db_window(offset, limit);

        // Repeatable read pins one snapshot for both statements, so `total`
        // matches the window.
        let (total, rows) = conn
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run(|conn| {
                async move {
                    let total: i64 = users::table.count().get_result(conn).await?;
                    let rows: Vec<UserRow> = users::table
                        .select(UserRow::as_select())
                        .order_by((users::username.asc(), users::id.asc()))
                        .offset(db_offset)
                        .limit(db_limit)
                        .load(conn)
                        .await?;
                    Ok::<_, DieselError>((total, rows))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let users = rows
            .into_iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UserListing {
            users,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}
