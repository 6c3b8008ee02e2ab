//! Diesel table definitions.
//!
//! Keep in step with `backend/migrations`; `diesel print-schema` against a
//! migrated database regenerates them.

diesel::table! {
    /// Local accounts, one per identity provider account.
    ///
    /// `external_id` and `username` each carry a unique constraint
    /// (`users_external_id_key`, `users_username_key`).
    users (id) {
        id -> Uuid,
        /// Identity provider account id, immutable after insert.
        external_id -> Text,
        username -> Text,
        image_url -> Nullable<Text>,
        created_at -> Timestamptz,
        /// Maintained by the `users_touch_updated_at` trigger.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Public profile, deleted with its user via `ON DELETE CASCADE`.
    profiles (user_id) {
        user_id -> Uuid,
        display_name -> Text,
        bio -> Nullable<Text>,
        location -> Nullable<Text>,
        avatar_url -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(profiles -> users (user_id));
diesel::allow_tables_to_appear_in_same_query!(profiles, users);
