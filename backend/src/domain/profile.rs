//! Public profile owned by exactly one local user.

use url::Url;

use super::{User, UserId};

/// Profile created alongside its [`User`] and removed with it.
///
/// Identity provider events never touch profile fields after creation; they
/// belong to profile management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<Url>,
}

impl Profile {
    /// Initial profile for a freshly synced user.
    ///
    /// The display name starts as the username and the avatar as the
    /// identity provider image.
    pub fn initial_for(user: &User) -> Self {
        Self {
            user_id: *user.id(),
            display_name: user.username().as_str().to_owned(),
            bio: None,
            location: None,
            avatar_url: user.image_url().cloned(),
        }
    }
}
