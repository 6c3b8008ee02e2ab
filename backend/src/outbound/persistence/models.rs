//! Diesel row structs. These never leave the persistence adapter.

use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{profiles, users};

/// Mirrored identity columns of a `users` row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub external_id: String,
    pub username: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub external_id: &'a str,
    pub username: &'a str,
    pub image_url: Option<&'a str>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = profiles)]
pub(crate) struct NewProfileRow<'a> {
    pub user_id: Uuid,
    pub display_name: &'a str,
    pub bio: Option<&'a str>,
    pub location: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

/// Changeset for the fields refreshed by `user.updated` events.
///
/// `image_url` is written even when `None` so a removed provider image
/// clears the stored one.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MirroredFieldsUpdate<'a> {
    pub username: &'a str,
    pub image_url: Option<&'a str>,
}
