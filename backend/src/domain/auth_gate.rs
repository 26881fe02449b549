//! Resolves bearer tokens to the users they were issued to.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, warn};

use super::ports::{Authenticator, CredentialService, DocumentStore, Filter, Projection};
use super::records::{self, UserRecord, USERS};
use super::{BearerToken, Error, User};

const NOT_AUTHORIZED: &str = "not authorized";

/// Token validation followed by a password-free user lookup.
#[derive(Clone)]
pub struct AuthGateService {
    store: Arc<dyn DocumentStore>,
    credentials: Arc<dyn CredentialService>,
    clock: Arc<dyn Clock>,
}

impl AuthGateService {
    /// Build the gate over its collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        credentials: Arc<dyn CredentialService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            credentials,
            clock,
        }
    }
}

#[async_trait]
impl Authenticator for AuthGateService {
    async fn authenticate(&self, token: &BearerToken) -> Result<User, Error> {
        let claims = self
            .credentials
            .validate(token, self.clock.utc())
            .map_err(|err| {
                debug!(error = %err, "bearer token rejected");
                Error::unauthorized(err.to_string())
            })?;

        let projection = Projection::excluding(&[records::fields::PASSWORD]);
        let document = self
            .store
            .find_one(USERS, &Filter::by_id(claims.subject), &projection)
            .await
            .map_err(|err| {
                warn!(error = %err, subject = %claims.subject, "user lookup failed during authentication");
                Error::unauthorized(NOT_AUTHORIZED)
            })?
            .ok_or_else(|| {
                debug!(subject = %claims.subject, "token subject no longer exists");
                Error::unauthorized(NOT_AUTHORIZED)
            })?;

        records::decode::<UserRecord, User>(document)
            .map_err(|_| Error::unauthorized(NOT_AUTHORIZED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        CredentialError, Document, DocumentStoreError, MockCredentialService, MockDocumentStore,
    };
    use crate::domain::records::encode;
    use crate::domain::{EmailAddress, ErrorCode, PasswordHash, TokenClaims, UserId, UserName};
    use crate::test_support::{MutableClock, fixture_timestamp};
    use rstest::rstest;
    use rstest_bdd_macros::{given, then, when};

    fn stored_user(id: UserId) -> User {
        User::new(
            id,
            UserName::new("Ada").expect("valid name"),
            EmailAddress::new("ada@example.com").expect("valid email"),
            fixture_timestamp(),
            fixture_timestamp(),
        )
    }

    fn token() -> BearerToken {
        BearerToken::new("header.claims.signature").expect("non-blank token")
    }

    fn credentials_for(subject: UserId) -> MockCredentialService {
        let mut credentials = MockCredentialService::new();
        credentials.expect_validate().returning(move |_, _| {
            Ok(TokenClaims {
                subject,
                expires_at: fixture_timestamp(),
            })
        });
        credentials
    }

    fn gate(store: MockDocumentStore, credentials: MockCredentialService) -> AuthGateService {
        AuthGateService::new(
            Arc::new(store),
            Arc::new(credentials),
            Arc::new(MutableClock::new(fixture_timestamp())),
        )
    }

    #[given("a token for a stored user")]
    fn a_token_for_a_stored_user() -> (AuthGateService, User) {
        let user = stored_user(UserId::random());
        let document =
            encode(&UserRecord::new(&user, &PasswordHash::new("h"))).expect("encodes");
        let mut store = MockDocumentStore::new();
        store
            .expect_find_one()
            .withf(|collection, _, projection| {
                collection == USERS
                    && *projection == Projection::excluding(&[records::fields::PASSWORD])
            })
            .returning(move |_, _, projection| Ok(Some(projection.apply(document.clone()))));
        (gate(store, credentials_for(*user.id())), user)
    }

    #[when("the gate authenticates the token")]
    fn the_gate_authenticates_the_token(gate: AuthGateService) -> Result<User, Error> {
        futures::executor::block_on(gate.authenticate(&token()))
    }

    #[then("the stored user is bound")]
    fn the_stored_user_is_bound(result: Result<User, Error>, expected: User) {
        assert_eq!(result.expect("authenticated"), expected);
    }

    #[rstest]
    fn valid_token_resolves_the_user() {
        let (gate, user) = a_token_for_a_stored_user();
        let result = the_gate_authenticates_the_token(gate);
        the_stored_user_is_bound(result, user);
    }

    #[rstest]
    #[case(CredentialError::expired(), "token has expired")]
    #[case(CredentialError::invalid("bad signature"), "token is invalid: bad signature")]
    #[tokio::test]
    async fn rejected_tokens_surface_the_validator_message(
        #[case] failure: CredentialError,
        #[case] message: &str,
    ) {
        let mut credentials = MockCredentialService::new();
        credentials
            .expect_validate()
            .returning(move |_, _| Err(failure.clone()));
        let mut store = MockDocumentStore::new();
        store.expect_find_one().never();

        let error = gate(store, credentials)
            .authenticate(&token())
            .await
            .expect_err("token rejected");

        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert_eq!(error.message(), message);
    }

    #[rstest]
    #[case(Ok(None))]
    #[case(Err(DocumentStoreError::connection("refused")))]
    #[tokio::test]
    async fn unknown_or_unreachable_users_are_not_authorized(
        #[case] lookup: Result<Option<Document>, DocumentStoreError>,
    ) {
        let mut store = MockDocumentStore::new();
        store
            .expect_find_one()
            .return_once(move |_, _, _| lookup);

        let error = gate(store, credentials_for(UserId::random()))
            .authenticate(&token())
            .await
            .expect_err("lookup fails");

        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert_eq!(error.message(), NOT_AUTHORIZED);
    }
}
