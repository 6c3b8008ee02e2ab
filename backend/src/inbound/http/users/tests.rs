//! Tests for users API handlers.

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use rstest::rstest;
use serde_json::Value;

use super::*;
use crate::domain::ports::{MockIdentitySync, MockUserOnboarding, MockUsersQuery, UserListing};
use crate::domain::{ExternalId, UserId, Username};
use crate::inbound::http::test_utils::{bearer_header, bearer_verifier, state_with};

fn user(n: usize) -> User {
    User::new(
        UserId::random(),
        ExternalId::new(format!("user_{n}")).expect("valid id"),
        Username::new(format!("member{n:02}")).expect("valid username"),
        None,
    )
}

/// Who calls the listing: nobody, a caller mid-onboarding or an onboarded one.
#[derive(Debug, Clone, Copy)]
enum Caller {
    Anonymous,
    Pending,
    LinkedButNotOnboarded,
    OnboardedWithoutLocalId,
    Onboarded,
}

async fn get(users: MockUsersQuery, uri: &str, caller: Caller) -> (StatusCode, Value) {
    let state = state_with(MockIdentitySync::new(), MockUserOnboarding::new(), users);
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::Data::new(bearer_verifier()))
            .service(web::scope("/api/v1").service(list_users)),
    )
    .await;
    let mut req = actix_test::TestRequest::get().uri(uri);
    let header = match caller {
        Caller::Anonymous => None,
        Caller::Pending => Some(bearer_header("user_caller", false, None)),
        Caller::LinkedButNotOnboarded => {
            Some(bearer_header("user_caller", false, Some(UserId::random())))
        }
        Caller::OnboardedWithoutLocalId => Some(bearer_header("user_caller", true, None)),
        Caller::Onboarded => Some(bearer_header("user_caller", true, Some(UserId::random()))),
    };
    if let Some(header) = header {
        req = req.insert_header(header);
    }
    let res = actix_test::call_service(&app, req.to_request()).await;
    let status = res.status();
    let body = actix_test::read_body(res).await;
    (status, serde_json::from_slice(&body).expect("json body"))
}

#[rstest]
#[actix_web::test]
async fn first_page_links_forward_only() {
    let mut users = MockUsersQuery::new();
    users
        .expect_list_users()
        .times(1)
        .withf(|params| params.offset() == 0 && params.limit() == 10)
        .return_once(|_| {
            Ok(UserListing {
                users: (0..10).map(user).collect(),
                total: 25,
            })
        });

    let (status, body) = get(users, "/api/v1/users?offset=0&limit=10", Caller::Onboarded).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["previous"], Value::Null);
    let next = body["next"].as_str().expect("next link");
    assert!(next.ends_with("/api/v1/users?offset=10&limit=10"), "next was {next}");
    assert_eq!(body["total"], 25);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(10));
    assert_eq!(body["items"][0]["externalId"], "user_0");
    assert_eq!(body["items"][0]["username"], "member00");
}

#[rstest]
#[actix_web::test]
async fn last_page_links_backward_only() {
    let mut users = MockUsersQuery::new();
    users.expect_list_users().times(1).return_once(|_| {
        Ok(UserListing {
            users: (20..25).map(user).collect(),
            total: 25,
        })
    });

    let (status, body) = get(users, "/api/v1/users?offset=20&limit=10", Caller::Onboarded).await;

    assert_eq!(status, StatusCode::OK);
    let previous = body["previous"].as_str().expect("previous link");
    assert!(previous.ends_with("offset=10&limit=10"), "previous was {previous}");
    assert_eq!(body["next"], Value::Null);
}

#[rstest]
#[actix_web::test]
async fn defaults_apply_without_query() {
    let mut users = MockUsersQuery::new();
    users
        .expect_list_users()
        .times(1)
        .withf(|params| *params == PageParams::default())
        .return_once(|_| Ok(UserListing::default()));

    let (status, body) = get(users, "/api/v1/users", Caller::Onboarded).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["offset"], 0);
}

#[rstest]
#[case::negative_offset("/api/v1/users?offset=-1&limit=10", "offset")]
#[case::limit_too_large("/api/v1/users?offset=0&limit=51", "limit")]
#[case::limit_zero("/api/v1/users?limit=0", "limit")]
#[case::not_a_number("/api/v1/users?offset=ten", "offset")]
#[actix_web::test]
async fn invalid_window_is_a_bad_request(#[case] uri: &str, #[case] parameter: &str) {
    let mut users = MockUsersQuery::new();
    users.expect_list_users().times(0);

    let (status, body) = get(users, uri, Caller::Onboarded).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["parameter"], parameter);
}

#[rstest]
#[actix_web::test]
async fn listing_requires_authentication() {
    let mut users = MockUsersQuery::new();
    users.expect_list_users().times(0);

    let (status, body) = get(users, "/api/v1/users", Caller::Anonymous).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[rstest]
#[case::pending(Caller::Pending)]
#[case::linked_but_not_onboarded(Caller::LinkedButNotOnboarded)]
#[case::onboarded_without_local_id(Caller::OnboardedWithoutLocalId)]
#[actix_web::test]
async fn listing_requires_completed_onboarding(#[case] caller: Caller) {
    let mut users = MockUsersQuery::new();
    users.expect_list_users().times(0);

    let (status, body) = get(users, "/api/v1/users", caller).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[rstest]
fn user_response_uses_string_fields() {
    let image = Url::parse("https://img.example.test/a.png").expect("valid url");
    let user = User::new(
        UserId::random(),
        ExternalId::new("user_a").expect("valid id"),
        Username::new("a").expect("valid username"),
        Some(image),
    );

    let response = UserResponse::from(&user);
    assert_eq!(response.id, user.id().to_string());
    assert_eq!(response.image_url.as_deref(), Some("https://img.example.test/a.png"));
}
