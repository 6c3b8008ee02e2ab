//! Tests for the identity sync service.

use std::sync::Arc;

use rstest::{fixture, rstest};
use url::Url;

use super::*;
use crate::domain::ports::MockUserRepository;
use crate::domain::{ErrorCode, UserId, Username};

#[fixture]
fn snapshot() -> IdentitySnapshot {
    IdentitySnapshot {
        external_id: ExternalId::new("user_ada").expect("valid id"),
        username: Username::new("ada").expect("valid username"),
        image_url: Some(Url::parse("https://img.example.test/ada.png").expect("valid url")),
    }
}

fn stored(snapshot: &IdentitySnapshot) -> User {
    User::new(
        UserId::random(),
        snapshot.external_id.clone(),
        snapshot.username.clone(),
        snapshot.image_url.clone(),
    )
}

fn make_service(repo: MockUserRepository) -> IdentitySyncService<MockUserRepository> {
    IdentitySyncService::new(Arc::new(repo))
}

fn duplicate(snapshot: &IdentitySnapshot) -> UserPersistenceError {
    UserPersistenceError::duplicate_external_id(snapshot.external_id.as_str())
}

#[rstest]
#[tokio::test]
async fn created_event_inserts_user_and_profile(snapshot: IdentitySnapshot) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_external_id()
        .times(1)
        .return_once(|_| Ok(None));
    repo.expect_create_with_profile()
        .times(1)
        .withf(|user, profile| {
            profile.user_id == *user.id()
                && profile.display_name == "ada"
                && profile.avatar_url.as_ref() == user.image_url()
        })
        .return_once(|_, _| Ok(()));

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserCreated(snapshot.clone()))
        .await
        .expect("create succeeds");

    let SyncOutcome::Created(user) = outcome else {
        panic!("expected Created, got {outcome:?}");
    };
    assert_eq!(user.external_id(), &snapshot.external_id);
    assert_eq!(user.username(), &snapshot.username);
}

#[rstest]
#[tokio::test]
async fn created_event_for_existing_user_is_a_no_op(snapshot: IdentitySnapshot) {
    let existing = stored(&snapshot);
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_external_id()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    repo.expect_create_with_profile().times(0);

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserCreated(snapshot))
        .await
        .expect("duplicate create succeeds");

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::AlreadyExists));
}

#[rstest]
#[tokio::test]
async fn created_event_losing_a_race_is_a_no_op(snapshot: IdentitySnapshot) {
    let winner = stored(&snapshot);
    let conflict = duplicate(&snapshot);
    let mut finds = 0;
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_external_id()
        .times(2)
        .returning(move |_| {
            finds += 1;
            Ok((finds > 1).then(|| winner.clone()))
        });
    repo.expect_create_with_profile()
        .times(1)
        .return_once(move |_, _| Err(conflict));

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserCreated(snapshot))
        .await
        .expect("race resolves");

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::AlreadyExists));
}

#[rstest]
#[tokio::test]
async fn updated_event_refreshes_mirrored_fields(snapshot: IdentitySnapshot) {
    let updated = stored(&snapshot);
    let expected = updated.clone();
    let mut repo = MockUserRepository::new();
    repo.expect_update_mirrored_fields()
        .times(1)
        .return_once(move |_| Ok(Some(updated)));
    repo.expect_create_with_profile().times(0);

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserUpdated(snapshot))
        .await
        .expect("update succeeds");

    assert_eq!(outcome, SyncOutcome::Updated(expected));
}

#[rstest]
#[tokio::test]
async fn updated_event_for_unknown_user_creates_it(snapshot: IdentitySnapshot) {
    let mut repo = MockUserRepository::new();
    repo.expect_update_mirrored_fields()
        .times(1)
        .return_once(|_| Ok(None));
    repo.expect_find_by_external_id()
        .times(1)
        .return_once(|_| Ok(None));
    repo.expect_create_with_profile()
        .times(1)
        .return_once(|_, _| Ok(()));

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserUpdated(snapshot.clone()))
        .await
        .expect("out-of-order update succeeds");

    let SyncOutcome::Created(user) = outcome else {
        panic!("expected Created, got {outcome:?}");
    };
    assert_eq!(user.username(), &snapshot.username);
    assert_eq!(user.image_url(), snapshot.image_url.as_ref());
}

#[rstest]
#[tokio::test]
async fn updated_event_racing_a_create_updates_the_winner(snapshot: IdentitySnapshot) {
    let winner = stored(&snapshot);
    let after_update = winner.clone();
    let conflict = duplicate(&snapshot);
    let mut updates = 0;
    let mut finds = 0;
    let mut repo = MockUserRepository::new();
    repo.expect_update_mirrored_fields()
        .times(2)
        .returning(move |_| {
            updates += 1;
            Ok((updates > 1).then(|| after_update.clone()))
        });
    repo.expect_find_by_external_id()
        .times(2)
        .returning(move |_| {
            finds += 1;
            Ok((finds > 1).then(|| winner.clone()))
        });
    repo.expect_create_with_profile()
        .times(1)
        .return_once(move |_, _| Err(conflict));

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserUpdated(snapshot))
        .await
        .expect("race resolves as update");

    assert!(matches!(outcome, SyncOutcome::Updated(_)));
}

#[rstest]
#[case::removed(true, SyncOutcome::Deleted)]
#[case::absent(false, SyncOutcome::Skipped(SkipReason::NotFound))]
#[tokio::test]
async fn deleted_event_is_idempotent(#[case] removed: bool, #[case] expected: SyncOutcome) {
    let mut repo = MockUserRepository::new();
    repo.expect_delete_by_external_id()
        .times(1)
        .return_once(move |_| Ok(removed));

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserDeleted {
            external_id: ExternalId::new("user_ada").expect("valid id"),
            deleted: true,
        })
        .await
        .expect("delete succeeds");

    assert_eq!(outcome, expected);
}

#[rstest]
#[tokio::test]
async fn deleted_event_without_flag_leaves_storage_untouched() {
    let mut repo = MockUserRepository::new();
    repo.expect_delete_by_external_id().times(0);

    let outcome = make_service(repo)
        .apply_event(WebhookEvent::UserDeleted {
            external_id: ExternalId::new("user_ada").expect("valid id"),
            deleted: false,
        })
        .await
        .expect("skip succeeds");

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::NotMarkedDeleted));
}

#[rstest]
#[tokio::test]
async fn onboarding_sync_creates_new_user(snapshot: IdentitySnapshot) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_external_id()
        .times(1)
        .return_once(|_| Ok(None));
    repo.expect_create_with_profile()
        .times(1)
        .return_once(|_, _| Ok(()));

    let user = make_service(repo)
        .sync_from_onboarding(&snapshot)
        .await
        .expect("onboarding sync succeeds");

    assert_eq!(user.external_id(), &snapshot.external_id);
}

#[rstest]
#[tokio::test]
async fn onboarding_sync_reports_already_linked(snapshot: IdentitySnapshot) {
    let existing = stored(&snapshot);
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_external_id()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    repo.expect_create_with_profile().times(0);

    let error = make_service(repo)
        .sync_from_onboarding(&snapshot)
        .await
        .expect_err("already linked");

    assert_eq!(
        error,
        IdentitySyncError::AlreadyLinked {
            external_id: snapshot.external_id
        }
    );
}

#[rstest]
#[tokio::test]
async fn onboarding_sync_losing_a_race_reports_already_linked(snapshot: IdentitySnapshot) {
    let winner = stored(&snapshot);
    let conflict = duplicate(&snapshot);
    let mut finds = 0;
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_external_id()
        .times(2)
        .returning(move |_| {
            finds += 1;
            Ok((finds > 1).then(|| winner.clone()))
        });
    repo.expect_create_with_profile()
        .times(1)
        .return_once(move |_, _| Err(conflict));

    let error = make_service(repo)
        .sync_from_onboarding(&snapshot)
        .await
        .expect_err("already linked");

    assert!(matches!(error, IdentitySyncError::AlreadyLinked { .. }));
}

#[rstest]
#[case::connection(
    UserPersistenceError::connection("pool exhausted"),
    "identity storage failed: user repository connection failed: pool exhausted"
)]
#[case::query(
    UserPersistenceError::query("syntax error"),
    "identity storage failed: user repository query failed: syntax error"
)]
#[tokio::test]
async fn storage_failures_propagate(
    snapshot: IdentitySnapshot,
    #[case] failure: UserPersistenceError,
    #[case] expected: &str,
) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_external_id()
        .times(1)
        .return_once(move |_| Err(failure));

    let error = make_service(repo)
        .apply_event(WebhookEvent::UserCreated(snapshot))
        .await
        .expect_err("storage failure");

    assert_eq!(error.to_string(), expected);
}

#[rstest]
#[tokio::test]
async fn username_collision_is_reported(snapshot: IdentitySnapshot) {
    let mut repo = MockUserRepository::new();
    repo.expect_update_mirrored_fields()
        .times(1)
        .return_once(|_| Err(UserPersistenceError::duplicate_username("ada")));

    let error = make_service(repo)
        .apply_event(WebhookEvent::UserUpdated(snapshot))
        .await
        .expect_err("collision");

    assert_eq!(
        error,
        IdentitySyncError::UsernameTaken {
            username: "ada".to_owned()
        }
    );
}

#[rstest]
#[case::already_linked(
    IdentitySyncError::AlreadyLinked { external_id: ExternalId::new("user_ada").expect("valid id") },
    ErrorCode::Conflict
)]
#[case::username_taken(
    IdentitySyncError::UsernameTaken { username: "ada".to_owned() },
    ErrorCode::Conflict
)]
#[case::storage(
    IdentitySyncError::Storage { message: "down".to_owned() },
    ErrorCode::InternalError
)]
fn sync_errors_map_to_api_codes(#[case] error: IdentitySyncError, #[case] expected: ErrorCode) {
    let api_error: Error = error.into();
    assert_eq!(api_error.code(), expected);
}
