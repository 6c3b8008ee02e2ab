//! Local user identity anchored to an identity provider account.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Maximum accepted length for an external identifier.
pub const EXTERNAL_ID_MAX: usize = 255;
/// Maximum accepted length for a username.
pub const USERNAME_MAX: usize = 64;

/// Validation errors returned by the identity newtypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    InvalidId,
    EmptyExternalId,
    ExternalIdTooLong { max: usize },
    ExternalIdWhitespace,
    EmptyUsername,
    UsernameTooLong { max: usize },
    UsernameWhitespace,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyExternalId => write!(f, "external id must not be empty"),
            Self::ExternalIdTooLong { max } => {
                write!(f, "external id must be at most {max} characters")
            }
            Self::ExternalIdWhitespace => {
                write!(f, "external id must not contain whitespace")
            }
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::UsernameWhitespace => {
                write!(f, "username must not have surrounding whitespace")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable local user identifier, generated once on first sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from its string form.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        let parsed = Uuid::parse_str(raw).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identifier assigned by the identity provider. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalId(String);

impl ExternalId {
    /// Validate and construct an [`ExternalId`].
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let raw = id.into();
        if raw.is_empty() {
            return Err(UserValidationError::EmptyExternalId);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(UserValidationError::ExternalIdWhitespace);
        }
        if raw.chars().count() > EXTERNAL_ID_MAX {
            return Err(UserValidationError::ExternalIdTooLong {
                max: EXTERNAL_ID_MAX,
            });
        }
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ExternalId> for String {
    fn from(value: ExternalId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ExternalId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Public handle mirrored from the identity provider at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(username: impl Into<String>) -> Result<Self, UserValidationError> {
        let raw = username.into();
        if raw.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if raw.trim() != raw {
            return Err(UserValidationError::UsernameWhitespace);
        }
        if raw.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        Ok(Self(raw))
    }

    /// Borrow the username as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identity fields mirrored from the identity provider.
///
/// Carried by onboarding requests and by created/updated webhook events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySnapshot {
    pub external_id: ExternalId,
    pub username: Username,
    pub image_url: Option<Url>,
}

/// Local account linked one-to-one with an identity provider account.
///
/// ## Invariants
/// - Exactly one [`User`] exists per [`ExternalId`].
/// - `external_id` never changes after creation; only `username` and
///   `image_url` are refreshed from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    external_id: ExternalId,
    username: Username,
    image_url: Option<Url>,
}

impl User {
    /// Assemble a user from already validated parts.
    pub fn new(
        id: UserId,
        external_id: ExternalId,
        username: Username,
        image_url: Option<Url>,
    ) -> Self {
        Self {
            id,
            external_id,
            username,
            image_url,
        }
    }

    /// Build a brand new local user for an identity snapshot.
    ///
    /// # Examples
    /// ```
    /// use echo_backend::domain::{ExternalId, IdentitySnapshot, User, Username};
    ///
    /// let snapshot = IdentitySnapshot {
    ///     external_id: ExternalId::new("user_2abc").expect("valid id"),
    ///     username: Username::new("ada").expect("valid username"),
    ///     image_url: None,
    /// };
    /// let user = User::from_snapshot(&snapshot);
    /// assert_eq!(user.external_id().as_str(), "user_2abc");
    /// ```
    pub fn from_snapshot(snapshot: &IdentitySnapshot) -> Self {
        Self::new(
            UserId::random(),
            snapshot.external_id.clone(),
            snapshot.username.clone(),
            snapshot.image_url.clone(),
        )
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn external_id(&self) -> &ExternalId {
        &self.external_id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn image_url(&self) -> Option<&Url> {
        self.image_url.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", UserValidationError::EmptyExternalId)]
    #[case("user 2abc", UserValidationError::ExternalIdWhitespace)]
    fn external_id_rejects_invalid_values(
        #[case] raw: &str,
        #[case] expected: UserValidationError,
    ) {
        assert_eq!(ExternalId::new(raw), Err(expected));
    }

    #[rstest]
    fn external_id_rejects_overlong_values() {
        let raw = "x".repeat(EXTERNAL_ID_MAX + 1);
        assert_eq!(
            ExternalId::new(raw),
            Err(UserValidationError::ExternalIdTooLong {
                max: EXTERNAL_ID_MAX
            })
        );
    }

    #[rstest]
    #[case("   ", UserValidationError::EmptyUsername)]
    #[case(" ada", UserValidationError::UsernameWhitespace)]
    fn username_rejects_invalid_values(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(Username::new(raw), Err(expected));
    }

    #[rstest]
    fn user_id_round_trips_through_string() {
        let id = UserId::random();
        let parsed = UserId::new(id.to_string()).expect("generated id parses");
        assert_eq!(parsed, id);
    }

    #[rstest]
    fn user_id_rejects_non_uuid() {
        assert_eq!(UserId::new("not-a-uuid"), Err(UserValidationError::InvalidId));
    }

    #[rstest]
    fn from_snapshot_copies_mirrored_fields() {
        let snapshot = IdentitySnapshot {
            external_id: ExternalId::new("user_123").expect("valid id"),
            username: Username::new("grace").expect("valid username"),
            image_url: Some(Url::parse("https://img.example.test/g.png").expect("valid url")),
        };

        let user = User::from_snapshot(&snapshot);
        assert_eq!(user.external_id(), &snapshot.external_id);
        assert_eq!(user.username(), &snapshot.username);
        assert_eq!(user.image_url(), snapshot.image_url.as_ref());
    }
}
