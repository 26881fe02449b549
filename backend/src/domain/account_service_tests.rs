//! Tests for account registration, login and profile updates.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    CredentialError, DocumentStore, MockCredentialService, MockDocumentStore,
};
use crate::domain::{BearerToken, ErrorCode, TokenClaims};
use crate::test_support::{FaultyStore, MutableClock, PlainHasher, StoreOp, fixture_timestamp};

const PASSWORD: &str = "correct horse";

struct Harness {
    store: Arc<FaultyStore>,
    clock: Arc<MutableClock>,
    service: AccountService,
}

fn echo_credentials() -> MockCredentialService {
    let mut credentials = MockCredentialService::new();
    credentials
        .expect_issue()
        .returning(|subject, _, _| {
            BearerToken::new(format!("token-for-{subject}"))
                .ok_or_else(|| CredentialError::issue("blank token"))
        });
    credentials.expect_validate().returning(|token, _| {
        let subject = token
            .as_str()
            .strip_prefix("token-for-")
            .and_then(|raw| UserId::new(raw).ok())
            .ok_or_else(|| CredentialError::invalid("unknown token"))?;
        Ok(TokenClaims {
            subject,
            expires_at: fixture_timestamp(),
        })
    });
    credentials
}

#[fixture]
fn harness() -> Harness {
    let store = FaultyStore::new();
    let clock = Arc::new(MutableClock::new(fixture_timestamp()));
    let service = AccountService::new(
        store.clone(),
        Arc::new(PlainHasher),
        Arc::new(echo_credentials()),
        clock.clone(),
    );
    Harness {
        store,
        clock,
        service,
    }
}

fn registration(email: &str) -> Registration {
    Registration::try_from_parts("Ada", email, PASSWORD).expect("valid registration")
}

#[rstest]
#[tokio::test]
async fn register_then_login_round_trip(harness: Harness) {
    let user = harness
        .service
        .register(registration("ada@example.com"))
        .await
        .expect("registration succeeds");
    assert_eq!(user.created_at(), fixture_timestamp());

    let issued = harness
        .service
        .login(LoginCredentials::try_from_parts("ADA@example.com", PASSWORD).expect("valid"))
        .await
        .expect("login succeeds");

    assert_eq!(issued.token.as_str(), format!("token-for-{}", user.id()));
    assert_eq!(issued.expires_at, fixture_timestamp() + token_lifetime());
}

#[rstest]
#[tokio::test]
async fn duplicate_email_is_a_conflict_and_writes_nothing(harness: Harness) {
    harness
        .service
        .register(registration("ada@example.com"))
        .await
        .expect("first registration succeeds");

    let error = harness
        .service
        .register(registration("Ada@Example.com"))
        .await
        .expect_err("duplicate rejected");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.message(), "user with email already exists");
    assert_eq!(harness.store.count(USERS).await, 1);
}

#[rstest]
#[tokio::test]
async fn unique_index_violation_maps_to_conflict() {
    let mut store = MockDocumentStore::new();
    store.expect_find_one().returning(|_, _, _| Ok(None));
    store
        .expect_insert_one()
        .times(1)
        .returning(|collection, _| Err(DocumentStoreError::duplicate_key(collection, "email")));
    let service = AccountService::new(
        Arc::new(store),
        Arc::new(PlainHasher),
        Arc::new(echo_credentials()),
        Arc::new(MutableClock::new(fixture_timestamp())),
    );

    let error = service
        .register(registration("ada@example.com"))
        .await
        .expect_err("race lost");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn wrong_password_is_unauthorized(harness: Harness) {
    harness
        .service
        .register(registration("ada@example.com"))
        .await
        .expect("registration succeeds");

    let error = harness
        .service
        .login(LoginCredentials::try_from_parts("ada@example.com", "nope").expect("valid"))
        .await
        .expect_err("login rejected");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(error.message(), "invalid credentials");
}

#[rstest]
#[tokio::test]
async fn unknown_email_is_not_found(harness: Harness) {
    let error = harness
        .service
        .login(LoginCredentials::try_from_parts("ghost@example.com", PASSWORD).expect("valid"))
        .await
        .expect_err("login rejected");

    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(error.message(), "user not found");
}

#[rstest]
#[tokio::test]
async fn stored_documents_keep_the_hash_but_users_do_not(harness: Harness) {
    let user = harness
        .service
        .register(registration("ada@example.com"))
        .await
        .expect("registration succeeds");

    let document = harness
        .store
        .find_one(USERS, &Filter::by_id(user.id()), &Projection::full())
        .await
        .expect("lookup succeeds")
        .expect("user stored");

    assert_eq!(
        document.get(fields::PASSWORD).and_then(|value| value.as_str()),
        Some("plain$correct horse")
    );
    let outward = serde_json::to_value(&user).expect("serialises");
    assert!(outward.get("password").is_none());
}

#[rstest]
#[tokio::test]
async fn update_profile_renames_and_refreshes_timestamp(harness: Harness) {
    let user = harness
        .service
        .register(registration("ada@example.com"))
        .await
        .expect("registration succeeds");
    harness.clock.advance_seconds(60);

    let updated = harness
        .service
        .update_profile(&user, UserName::new("Countess").expect("valid name"))
        .await
        .expect("update succeeds");

    assert_eq!(updated.name().as_ref(), "Countess");
    assert_eq!(updated.email(), user.email());
    assert!(updated.updated_at() > user.updated_at());
}

#[rstest]
#[tokio::test]
async fn update_profile_of_missing_user_is_internal(harness: Harness) {
    let ghost = User::new(
        UserId::random(),
        UserName::new("Ghost").expect("valid name"),
        crate::domain::EmailAddress::new("ghost@example.com").expect("valid email"),
        fixture_timestamp(),
        fixture_timestamp(),
    );

    let error = harness
        .service
        .update_profile(&ghost, UserName::new("Boo").expect("valid name"))
        .await
        .expect_err("nothing matched");

    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(error.message(), "failed to update user");
}

#[rstest]
#[tokio::test]
async fn store_outage_during_registration_is_reported(harness: Harness) {
    harness.store.fail(StoreOp::Insert, USERS);

    let error = harness
        .service
        .register(registration("ada@example.com"))
        .await
        .expect_err("insert fails");

    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(harness.store.count(USERS).await, 0);
}
